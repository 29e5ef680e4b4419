use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strollup_core::AppError;

/// Closed catalog of grantable capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Allows opening the dashboard overview.
    ViewDashboard,
    /// Allows using the chat-driven website builder.
    ViewBuilder,
    /// Allows browsing contacts.
    ViewContacts,
    /// Allows opening analytics.
    ViewAnalytics,
    /// Allows managing roles and permissions.
    ViewRoles,
    /// Allows opening settings.
    ViewSettings,
}

impl Permission {
    /// Returns a stable storage value for this permission.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewDashboard => "view_dashboard",
            Self::ViewBuilder => "view_builder",
            Self::ViewContacts => "view_contacts",
            Self::ViewAnalytics => "view_analytics",
            Self::ViewRoles => "view_roles",
            Self::ViewSettings => "view_settings",
        }
    }

    /// Returns the label shown to operators.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::ViewDashboard => "View Dashboard",
            Self::ViewBuilder => "Access AI Builder",
            Self::ViewContacts => "View Contacts",
            Self::ViewAnalytics => "View Analytics",
            Self::ViewRoles => "Manage Roles & Permissions",
            Self::ViewSettings => "Access Settings",
        }
    }

    /// Returns all known permissions in catalog order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Permission] = &[
            Permission::ViewDashboard,
            Permission::ViewBuilder,
            Permission::ViewContacts,
            Permission::ViewAnalytics,
            Permission::ViewRoles,
            Permission::ViewSettings,
        ];

        ALL
    }

    /// Parses a transport value into a permission.
    pub fn from_transport(value: &str) -> Result<Self, AppError> {
        Self::from_str(value)
    }
}

impl FromStr for Permission {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|permission| permission.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown permission value '{value}'")))
    }
}

/// Permissions available to one identity, derived from its roles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    /// Creates an empty set.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns whether the permission is present.
    #[must_use]
    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    /// Adds a permission.
    pub fn insert(&mut self, permission: Permission) {
        self.0.insert(permission);
    }

    /// Adds every permission from `other`.
    pub fn extend_from(&mut self, other: &Self) {
        self.0.extend(other.0.iter().copied());
    }

    /// Returns the union of both sets.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self(self.0.union(&other.0).copied().collect())
    }

    /// Returns whether no permission is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of permissions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates permissions in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }

    /// Returns the storage keys of all permissions.
    #[must_use]
    pub fn keys(&self) -> Vec<&'static str> {
        self.0.iter().map(Permission::as_str).collect()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
