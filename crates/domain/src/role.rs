use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use strollup_core::{AppResult, NonEmptyString};

use crate::{Permission, PermissionSet};

/// Description given to roles created from the administration surface.
pub const DEFAULT_ROLE_DESCRIPTION: &str = "New custom role";

/// Stable role identifier derived from the role name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoleId(String);

impl RoleId {
    /// Derives an identifier: lower-cased, whitespace runs collapsed to `-`.
    pub fn from_name(name: &str) -> AppResult<Self> {
        let name = NonEmptyString::new(name)?;
        let derived = name
            .as_str()
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join("-");

        Ok(Self(derived))
    }

    /// Wraps an identifier read back from storage.
    pub fn from_stored(value: impl Into<String>) -> AppResult<Self> {
        let value = NonEmptyString::new(value)?;
        Ok(Self(value.into()))
    }

    /// Returns the identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for RoleId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Named bundle of permission flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    id: RoleId,
    name: String,
    description: String,
    permissions: BTreeMap<Permission, bool>,
}

impl RoleDefinition {
    /// Creates a role with every catalog permission switched off.
    pub fn new(name: &str) -> AppResult<Self> {
        let id = RoleId::from_name(name)?;
        Ok(Self {
            id,
            name: name.trim().to_owned(),
            description: DEFAULT_ROLE_DESCRIPTION.to_owned(),
            permissions: Permission::all()
                .iter()
                .map(|permission| (*permission, false))
                .collect(),
        })
    }

    /// Replaces the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Grants every listed permission.
    #[must_use]
    pub fn with_grants(mut self, permissions: &[Permission]) -> Self {
        for permission in permissions {
            self.permissions.insert(*permission, true);
        }
        self
    }

    /// Returns the stable identifier.
    #[must_use]
    pub fn id(&self) -> &RoleId {
        &self.id
    }

    /// Returns the human-chosen name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Returns the flag for one permission; absent flags are off.
    #[must_use]
    pub fn is_granted(&self, permission: Permission) -> bool {
        self.permissions.get(&permission).copied().unwrap_or(false)
    }

    /// Returns every catalog permission with its flag.
    #[must_use]
    pub fn flags(&self) -> Vec<(Permission, bool)> {
        Permission::all()
            .iter()
            .map(|permission| (*permission, self.is_granted(*permission)))
            .collect()
    }

    /// Returns the permissions switched on.
    #[must_use]
    pub fn granted(&self) -> PermissionSet {
        self.permissions
            .iter()
            .filter_map(|(permission, granted)| granted.then_some(*permission))
            .collect()
    }

    /// Sets one permission flag.
    pub fn set_permission(&mut self, permission: Permission, granted: bool) {
        self.permissions.insert(permission, granted);
    }

    /// Renames the role; the identifier stays stable.
    pub fn rename(&mut self, name: &str) -> AppResult<()> {
        let name = NonEmptyString::new(name.trim())?;
        self.name = name.into();
        Ok(())
    }

    /// Builds a role from a loosely shaped storage record.
    ///
    /// Returns `None` when the record has no usable name. A missing or
    /// malformed `permissions` field yields a role with no grants, and only
    /// a literal `true` grants a catalog permission.
    #[must_use]
    pub fn from_record(record: &Value) -> Option<Self> {
        let name = record
            .get("name")
            .and_then(Value::as_str)
            .filter(|value| !value.trim().is_empty())?;

        let id = match record.get("id").and_then(Value::as_str) {
            Some(stored) => RoleId::from_stored(stored).ok()?,
            None => RoleId::from_name(name).ok()?,
        };

        let description = record
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();

        let permissions = Permission::all()
            .iter()
            .map(|permission| {
                let granted = record
                    .get("permissions")
                    .and_then(Value::as_object)
                    .and_then(|flags| flags.get(permission.as_str()))
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                (*permission, granted)
            })
            .collect();

        Some(Self {
            id,
            name: name.trim().to_owned(),
            description,
            permissions,
        })
    }

    /// Returns the permission flags as a storage object.
    #[must_use]
    pub fn permissions_record(&self) -> Value {
        let flags: Map<String, Value> = self
            .flags()
            .into_iter()
            .map(|(permission, granted)| (permission.as_str().to_owned(), Value::Bool(granted)))
            .collect();

        Value::Object(flags)
    }

    /// Returns the full storage record.
    #[must_use]
    pub fn to_record(&self) -> Value {
        json!({
            "id": self.id.as_str(),
            "name": self.name,
            "description": self.description,
            "permissions": self.permissions_record(),
        })
    }
}
