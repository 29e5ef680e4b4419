use serde::{Deserialize, Serialize};
use serde_json::Value;
use strollup_core::UserIdentity;

/// Display name used when a profile carries none.
pub const UNKNOWN_USER_NAME: &str = "Unknown User";

/// Profile record keyed by identity id, holding the granted role names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    id: String,
    display_name: String,
    email: Option<String>,
    avatar_url: Option<String>,
    roles: Vec<String>,
    status: String,
    active: bool,
}

impl UserProfile {
    /// Creates an active profile with no roles.
    #[must_use]
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            email: None,
            avatar_url: None,
            roles: Vec::new(),
            status: "Active".to_owned(),
            active: true,
        }
    }

    /// Builds a profile for the signed-in identity when storage has none.
    #[must_use]
    pub fn from_identity(identity: &UserIdentity) -> Self {
        let mut profile = Self::new(
            identity.id(),
            identity.display_name().unwrap_or(UNKNOWN_USER_NAME),
        );
        profile.email = identity.email().map(str::to_owned);
        profile.avatar_url = identity.avatar_url().map(str::to_owned);
        profile
    }

    /// Sets the email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the granted role names.
    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = normalize_role_names(roles.into_iter().map(Into::into));
        self
    }

    /// Returns the identity id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the email, if known.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the avatar URL, if known.
    #[must_use]
    pub fn avatar_url(&self) -> Option<&str> {
        self.avatar_url.as_deref()
    }

    /// Returns the granted role names.
    #[must_use]
    pub fn roles(&self) -> &[String] {
        self.roles.as_slice()
    }

    /// Returns whether the role name is granted.
    #[must_use]
    pub fn holds_role(&self, role_name: &str) -> bool {
        self.roles.iter().any(|role| role == role_name)
    }

    /// Returns the free-form status label.
    #[must_use]
    pub fn status(&self) -> &str {
        self.status.as_str()
    }

    /// Returns whether the account is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Replaces the granted role names.
    pub fn set_roles(&mut self, roles: Vec<String>) {
        self.roles = normalize_role_names(roles.into_iter());
    }

    /// Sets the active flag.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Builds a profile from a loosely shaped storage record.
    ///
    /// Returns `None` without an `id`. Role names come from a `roles` array
    /// or a single `role` string; anything else means no roles.
    #[must_use]
    pub fn from_record(record: &Value) -> Option<Self> {
        let id = record
            .get("id")
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())?;

        let display_name = ["full_name", "username", "name"]
            .iter()
            .find_map(|key| non_empty_str(record, key))
            .unwrap_or(UNKNOWN_USER_NAME);

        let avatar_url = ["avatar_url", "avatar"]
            .iter()
            .find_map(|key| non_empty_str(record, key))
            .map(str::to_owned);

        let roles = match (record.get("roles"), record.get("role")) {
            (Some(Value::Array(values)), _) => values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect(),
            (_, Some(Value::String(role))) => vec![role.clone()],
            _ => Vec::new(),
        };

        Some(Self {
            id: id.to_owned(),
            display_name: display_name.to_owned(),
            email: non_empty_str(record, "email").map(str::to_owned),
            avatar_url,
            roles: normalize_role_names(roles.into_iter()),
            status: non_empty_str(record, "status")
                .unwrap_or("Active")
                .to_owned(),
            active: record.get("active").and_then(Value::as_bool) != Some(false),
        })
    }
}

fn non_empty_str<'a>(record: &'a Value, key: &str) -> Option<&'a str> {
    record
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
}

fn normalize_role_names(roles: impl Iterator<Item = String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    for role in roles {
        let role = role.trim();
        if !role.is_empty() && !normalized.iter().any(|existing| existing == role) {
            normalized.push(role.to_owned());
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use strollup_core::UserIdentity;

    use super::{UNKNOWN_USER_NAME, UserProfile};

    #[test]
    fn record_prefers_full_name_then_username_then_name() {
        let profile = UserProfile::from_record(&json!({
            "id": "u1",
            "username": "ada",
            "name": "Ada L."
        }));
        assert!(matches!(profile, Some(ref value) if value.display_name() == "ada"));

        let profile = UserProfile::from_record(&json!({ "id": "u2" }));
        assert!(matches!(profile, Some(ref value) if value.display_name() == UNKNOWN_USER_NAME));
    }

    #[test]
    fn record_accepts_single_role_string() {
        let profile = UserProfile::from_record(&json!({ "id": "u1", "role": "Sales" }));
        assert!(matches!(profile, Some(ref value) if value.roles() == ["Sales".to_owned()]));
    }

    #[test]
    fn record_with_malformed_roles_has_none() {
        let profile = UserProfile::from_record(&json!({ "id": "u1", "roles": "Sales" }));
        assert!(matches!(profile, Some(ref value) if value.roles().is_empty()));

        let profile = UserProfile::from_record(&json!({ "id": "u1", "roles": [1, null] }));
        assert!(matches!(profile, Some(ref value) if value.roles().is_empty()));
    }

    #[test]
    fn record_is_active_unless_explicitly_false() {
        let active = UserProfile::from_record(&json!({ "id": "u1", "active": null }));
        let inactive = UserProfile::from_record(&json!({ "id": "u2", "active": false }));

        assert!(matches!(active, Some(ref value) if value.is_active()));
        assert!(matches!(inactive, Some(ref value) if !value.is_active()));
    }

    #[test]
    fn record_without_id_is_skipped() {
        assert!(UserProfile::from_record(&json!({ "full_name": "Nobody" })).is_none());
    }

    #[test]
    fn role_names_are_deduplicated() {
        let profile = UserProfile::new("u1", "Ada").with_roles(["Sales", " Sales ", "Admin", ""]);
        assert_eq!(profile.roles(), ["Sales".to_owned(), "Admin".to_owned()]);
    }

    #[test]
    fn identity_fallback_copies_metadata() {
        let identity = UserIdentity::new("u1", Some("ada@example.com".to_owned()))
            .with_metadata(Some("Ada".to_owned()), None);
        let profile = UserProfile::from_identity(&identity);

        assert_eq!(profile.display_name(), "Ada");
        assert_eq!(profile.email(), Some("ada@example.com"));
        assert!(profile.roles().is_empty());
    }
}
