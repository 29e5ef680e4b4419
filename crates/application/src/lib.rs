//! Application services and ports.

#![forbid(unsafe_code)]

mod access_context;
mod access_gate;
mod auth_ports;
mod permission_resolver;
mod record_ports;
mod role_admin_service;
mod session_store;

pub use access_context::{AccessContext, PermissionInvalidation, ResolutionTicket};
pub use access_gate::{
    AccessGate, AccessGrant, AccessSnapshot, GateEffect, GateState, PathOutcome, PermissionState,
};
pub use auth_ports::{AccessTokenSource, AuthProvider, OAuthCallback, OAuthProvider, OAuthRedirect};
pub use permission_resolver::PermissionResolver;
pub use record_ports::{ProfileRepository, RoleRepository};
pub use role_admin_service::{AdminEntry, AdminError, AdminNotice, EditStatus, RoleAdminService};
pub use session_store::{
    SessionEvent, SessionGeneration, SessionStore, SessionSubscription, SessionTransition,
};
