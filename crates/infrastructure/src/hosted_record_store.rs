use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Value, json};
use strollup_application::{AccessTokenSource, ProfileRepository, RoleRepository};
use strollup_core::StoreError;
use strollup_domain::{RoleDefinition, RoleId, UserProfile};
use tracing::warn;
use url::Url;

use crate::HostedClient;

const PROFILES_TABLE: &str = "rest/v1/profiles";
const ROLES_TABLE: &str = "rest/v1/roles_definitions";

/// Profile and role records stored behind a PostgREST-style endpoint.
///
/// Calls carry the signed-in user's token so row-level policies apply.
pub struct HostedRecordStore {
    client: HostedClient,
    tokens: Arc<dyn AccessTokenSource>,
}

fn network(error: reqwest::Error) -> StoreError {
    StoreError::Network(error.to_string())
}

/// Quotes role names for an `in.(...)` filter.
fn in_filter(names: &[String]) -> String {
    let quoted: Vec<String> = names
        .iter()
        .map(|name| format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

fn decode_records<T>(records: Vec<Value>, table: &str, decode: impl Fn(&Value) -> Option<T>) -> Vec<T> {
    let total = records.len();
    let decoded: Vec<T> = records.iter().filter_map(decode).collect();
    if decoded.len() < total {
        warn!(
            table,
            skipped = total - decoded.len(),
            "skipping malformed records"
        );
    }
    decoded
}

impl HostedRecordStore {
    /// Creates a store that authenticates as whoever `tokens` reports.
    #[must_use]
    pub fn new(client: HostedClient, tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self { client, tokens }
    }

    fn url(&self, table: &str, query: &[(&str, &str)]) -> Result<Url, StoreError> {
        self.client
            .endpoint(table, query)
            .map_err(|error| StoreError::Rejected(error.to_string()))
    }

    async fn read(&self, url: Url) -> Result<Vec<Value>, StoreError> {
        let token = self.tokens.access_token().await;
        let request = self.client.request(Method::GET, url, token.as_deref());

        let response = HostedClient::send(request)
            .await
            .map_err(network)?
            .map_err(|failure| StoreError::Rejected(failure.describe()))?;
        response
            .json::<Vec<Value>>()
            .await
            .map_err(|error| StoreError::Rejected(format!("unexpected record payload: {error}")))
    }

    async fn write(&self, method: Method, url: Url, body: Option<Value>) -> Result<(), StoreError> {
        let token = self.tokens.access_token().await;
        let mut request = self
            .client
            .request(method, url, token.as_deref())
            .header("Prefer", "return=minimal");
        if let Some(body) = body {
            request = request.json(&body);
        }

        HostedClient::send(request)
            .await
            .map_err(network)?
            .map_err(|failure| StoreError::Rejected(failure.describe()))?;
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for HostedRecordStore {
    async fn find_profile(&self, identity_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let filter = format!("eq.{identity_id}");
        let url = self.url(PROFILES_TABLE, &[("select", "*"), ("id", filter.as_str())])?;
        let records = self.read(url).await?;

        Ok(decode_records(records, PROFILES_TABLE, UserProfile::from_record)
            .into_iter()
            .next())
    }

    async fn list_profiles(&self) -> Result<Vec<UserProfile>, StoreError> {
        let url = self.url(PROFILES_TABLE, &[("select", "*")])?;
        let records = self.read(url).await?;

        Ok(decode_records(records, PROFILES_TABLE, UserProfile::from_record))
    }

    async fn save_profile_roles(
        &self,
        identity_id: &str,
        roles: &[String],
    ) -> Result<(), StoreError> {
        let filter = format!("eq.{identity_id}");
        let url = self.url(PROFILES_TABLE, &[("id", filter.as_str())])?;
        self.write(Method::PATCH, url, Some(json!({ "roles": roles })))
            .await
    }

    async fn save_profile_active(&self, identity_id: &str, active: bool) -> Result<(), StoreError> {
        let filter = format!("eq.{identity_id}");
        let url = self.url(PROFILES_TABLE, &[("id", filter.as_str())])?;
        self.write(Method::PATCH, url, Some(json!({ "active": active })))
            .await
    }
}

#[async_trait]
impl RoleRepository for HostedRecordStore {
    async fn list_roles(&self) -> Result<Vec<RoleDefinition>, StoreError> {
        let url = self.url(ROLES_TABLE, &[("select", "*"), ("order", "name.asc")])?;
        let records = self.read(url).await?;

        Ok(decode_records(records, ROLES_TABLE, RoleDefinition::from_record))
    }

    async fn find_roles_by_names(
        &self,
        names: &[String],
    ) -> Result<Vec<RoleDefinition>, StoreError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let filter = in_filter(names);
        let url = self.url(ROLES_TABLE, &[("select", "*"), ("name", filter.as_str())])?;
        let records = self.read(url).await?;

        Ok(decode_records(records, ROLES_TABLE, RoleDefinition::from_record))
    }

    async fn insert_role(&self, role: &RoleDefinition) -> Result<(), StoreError> {
        let url = self.url(ROLES_TABLE, &[])?;
        self.write(Method::POST, url, Some(json!([role.to_record()])))
            .await
    }

    async fn save_role_permissions(&self, role: &RoleDefinition) -> Result<(), StoreError> {
        let filter = format!("eq.{}", role.id());
        let url = self.url(ROLES_TABLE, &[("id", filter.as_str())])?;
        self.write(
            Method::PATCH,
            url,
            Some(json!({ "permissions": role.permissions_record() })),
        )
        .await
    }

    async fn save_role_name(&self, role_id: &RoleId, name: &str) -> Result<(), StoreError> {
        let filter = format!("eq.{role_id}");
        let url = self.url(ROLES_TABLE, &[("id", filter.as_str())])?;
        self.write(Method::PATCH, url, Some(json!({ "name": name })))
            .await
    }

    async fn delete_role(&self, role_id: &RoleId) -> Result<(), StoreError> {
        let filter = format!("eq.{role_id}");
        let url = self.url(ROLES_TABLE, &[("id", filter.as_str())])?;
        self.write(Method::DELETE, url, None).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use strollup_domain::{RoleDefinition, UserProfile};

    use super::{decode_records, in_filter};

    #[test]
    fn in_filter_quotes_every_name() {
        let names = vec!["Sales".to_owned(), "Field \"Ops\"".to_owned()];
        assert_eq!(in_filter(&names), r#"in.("Sales","Field \"Ops\"")"#);
    }

    #[test]
    fn malformed_role_records_are_skipped() {
        let records = vec![
            json!({ "id": "sales", "name": "Sales", "permissions": { "view_dashboard": true } }),
            json!({ "id": "broken" }),
            json!({ "name": "Support", "permissions": "not-an-object" }),
        ];

        let roles = decode_records(records, "roles", RoleDefinition::from_record);

        assert_eq!(roles.len(), 2);
        assert!(roles[0].granted().len() == 1);
        assert!(roles[1].granted().is_empty());
        assert_eq!(roles[1].id().as_str(), "support");
    }

    #[test]
    fn profile_records_accept_a_single_role_field() {
        let records = vec![json!({ "id": "ada", "full_name": "Ada", "role": "Admin" })];

        let profiles = decode_records(records, "profiles", UserProfile::from_record);

        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].roles(), &["Admin".to_owned()]);
    }
}
