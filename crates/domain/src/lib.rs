//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod profile;
mod role;
mod route;
mod security;

pub use profile::{UNKNOWN_USER_NAME, UserProfile};
pub use role::{DEFAULT_ROLE_DESCRIPTION, RoleDefinition, RoleId};
pub use route::{ProtectedRoute, RouteCatalog, RouteMatch, RouteRequirement, SIGN_IN_PATH};
pub use security::{Permission, PermissionSet};
