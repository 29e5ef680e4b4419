use serde::{Deserialize, Serialize};

use crate::Permission;

/// Path of the sign-in view unauthenticated navigation is redirected to.
pub const SIGN_IN_PATH: &str = "/login";

/// What a route asks of the current session before it renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteRequirement {
    /// Any signed-in identity.
    Authenticated,
    /// A signed-in identity holding the permission.
    Permission(Permission),
}

impl RouteRequirement {
    /// Returns the permission key, if one is required.
    #[must_use]
    pub fn permission(&self) -> Option<Permission> {
        match self {
            Self::Authenticated => None,
            Self::Permission(permission) => Some(*permission),
        }
    }
}

/// One protected route and its nested children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedRoute {
    segment: String,
    requirement: RouteRequirement,
    children: Vec<ProtectedRoute>,
}

impl ProtectedRoute {
    /// Creates a route for one path segment.
    #[must_use]
    pub fn new(segment: impl Into<String>, requirement: RouteRequirement) -> Self {
        Self {
            segment: segment.into(),
            requirement,
            children: Vec::new(),
        }
    }

    /// Adds a nested route.
    #[must_use]
    pub fn with_child(mut self, child: ProtectedRoute) -> Self {
        self.children.push(child);
        self
    }

    /// Returns the path segment.
    #[must_use]
    pub fn segment(&self) -> &str {
        self.segment.as_str()
    }

    /// Returns the route's own requirement.
    #[must_use]
    pub fn requirement(&self) -> RouteRequirement {
        self.requirement
    }
}

/// Result of matching a path against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMatch {
    /// The view renders without consulting the session.
    Public,
    /// The view is guarded; requirements are ordered outermost first.
    Protected {
        /// Normalized path that matched.
        path: String,
        /// One requirement per nesting level.
        requirements: Vec<RouteRequirement>,
    },
    /// No route matches.
    NotFound,
}

/// Routing table the access gate consults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteCatalog {
    public_paths: Vec<String>,
    roots: Vec<ProtectedRoute>,
}

impl RouteCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self {
            public_paths: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// Adds a path that is never gated.
    #[must_use]
    pub fn with_public(mut self, path: impl Into<String>) -> Self {
        self.public_paths.push(normalize_path(path.into().as_str()));
        self
    }

    /// Adds a protected route tree.
    #[must_use]
    pub fn with_protected(mut self, route: ProtectedRoute) -> Self {
        self.roots.push(route);
        self
    }

    /// Returns the console routing table: marketing pages are public and the
    /// `/app` shell guards every dashboard view.
    #[must_use]
    pub fn standard() -> Self {
        let view = |segment: &str, permission| {
            ProtectedRoute::new(segment, RouteRequirement::Permission(permission))
        };

        Self::new()
            .with_public("/")
            .with_public(SIGN_IN_PATH)
            .with_public("/signup")
            .with_public("/onboarding")
            .with_protected(
                ProtectedRoute::new("app", RouteRequirement::Authenticated)
                    .with_child(view("dashboard", Permission::ViewDashboard))
                    .with_child(view("contacts", Permission::ViewContacts))
                    .with_child(view("analytics", Permission::ViewAnalytics))
                    .with_child(view("roles", Permission::ViewRoles))
                    .with_child(view("builder", Permission::ViewBuilder))
                    .with_child(view("settings", Permission::ViewSettings))
                    .with_child(ProtectedRoute::new(
                        "alerts",
                        RouteRequirement::Authenticated,
                    )),
            )
    }

    /// Matches a path, collecting the requirement of every nesting level.
    #[must_use]
    pub fn resolve(&self, path: &str) -> RouteMatch {
        let path = normalize_path(path);
        if self.public_paths.iter().any(|public| public == &path) {
            return RouteMatch::Public;
        }

        let mut requirements = Vec::new();
        let mut level = self.roots.as_slice();
        for segment in path.split('/').filter(|segment| !segment.is_empty()) {
            let Some(route) = level.iter().find(|route| route.segment == segment) else {
                return RouteMatch::NotFound;
            };
            requirements.push(route.requirement);
            level = route.children.as_slice();
        }

        if requirements.is_empty() {
            return RouteMatch::NotFound;
        }

        RouteMatch::Protected { path, requirements }
    }
}

impl Default for RouteCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_owned();
    }

    if trimmed.starts_with('/') {
        trimmed.to_owned()
    } else {
        format!("/{trimmed}")
    }
}
