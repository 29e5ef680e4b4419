use reqwest::{Method, RequestBuilder, Response, StatusCode};
use strollup_core::{AppError, AppResult};
use url::Url;

/// Connection settings shared by the hosted auth and record adapters.
#[derive(Clone)]
pub struct HostedClient {
    http_client: reqwest::Client,
    base_url: Url,
    anon_key: String,
}

/// Non-success response from the hosted service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HostedFailure {
    pub(crate) status: StatusCode,
    pub(crate) body: String,
}

impl HostedFailure {
    pub(crate) fn describe(&self) -> String {
        let message = serde_json::from_str::<serde_json::Value>(&self.body)
            .ok()
            .and_then(|body| {
                ["error_description", "msg", "message", "error"]
                    .iter()
                    .find_map(|key| body.get(key).and_then(|value| value.as_str()).map(str::to_owned))
            })
            .unwrap_or_else(|| self.body.clone());

        format!("status {}: {message}", self.status)
    }
}

impl HostedClient {
    /// Creates a client for a hosted project URL and its public key.
    pub fn new(http_client: reqwest::Client, base_url: &str, anon_key: impl Into<String>) -> AppResult<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|error| AppError::Validation(format!("invalid hosted URL '{base_url}': {error}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let anon_key = anon_key.into();
        if anon_key.trim().is_empty() {
            return Err(AppError::Validation("hosted anon key must not be empty".to_owned()));
        }

        Ok(Self {
            http_client,
            base_url,
            anon_key,
        })
    }

    /// Builds an endpoint URL from a relative path and query pairs.
    pub(crate) fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> AppResult<Url> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|error| AppError::Internal(format!("invalid endpoint path '{path}': {error}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url)
    }

    /// Starts a request carrying the project key and a bearer token.
    ///
    /// Without a user token the project key doubles as the bearer.
    pub(crate) fn request(&self, method: Method, url: Url, bearer: Option<&str>) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .header("apikey", self.anon_key.as_str())
            .bearer_auth(bearer.unwrap_or(self.anon_key.as_str()))
    }

    /// Sends a request, splitting transport errors from non-success statuses.
    pub(crate) async fn send(
        request: RequestBuilder,
    ) -> Result<Result<Response, HostedFailure>, reqwest::Error> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(Ok(response));
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<response body unavailable>".to_owned());
        Ok(Err(HostedFailure { status, body }))
    }
}
