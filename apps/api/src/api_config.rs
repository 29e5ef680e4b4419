use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use strollup_core::AppError;
use tracing_subscriber::EnvFilter;

const MIN_DEV_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone)]
pub struct HostedRuntimeConfig {
    pub url: String,
    pub anon_key: String,
    pub oauth_redirect_url: String,
    pub session_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct MemoryRuntimeConfig {
    pub admin_email: String,
    pub admin_password: String,
    pub oauth_redirect_url: String,
}

#[derive(Debug, Clone)]
pub enum BackendConfig {
    Memory(MemoryRuntimeConfig),
    Hosted(HostedRuntimeConfig),
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub frontend_url: String,
    pub api_host: String,
    pub api_port: u16,
    pub backend: BackendConfig,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let optional = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &str| {
            optional(name).ok_or_else(|| AppError::Validation(format!("{name} is required")))
        };

        let frontend_url =
            optional("FRONTEND_URL").unwrap_or_else(|| "http://localhost:5173".to_owned());
        let api_host = optional("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = match optional("API_PORT") {
            Some(value) => value
                .parse::<u16>()
                .map_err(|error| AppError::Validation(format!("invalid API_PORT: {error}")))?,
            None => 3001,
        };
        let oauth_redirect_url =
            optional("OAUTH_REDIRECT_URL").unwrap_or_else(|| frontend_url.clone());

        let backend = match optional("BACKEND_PROVIDER")
            .unwrap_or_else(|| "memory".to_owned())
            .as_str()
        {
            "memory" => {
                let admin_password = required("DEV_ADMIN_PASSWORD")?;
                if admin_password.len() < MIN_DEV_PASSWORD_LENGTH {
                    return Err(AppError::Validation(format!(
                        "DEV_ADMIN_PASSWORD must be at least {MIN_DEV_PASSWORD_LENGTH} characters"
                    )));
                }
                BackendConfig::Memory(MemoryRuntimeConfig {
                    admin_email: optional("DEV_ADMIN_EMAIL")
                        .unwrap_or_else(|| "admin@strollup.local".to_owned()),
                    admin_password,
                    oauth_redirect_url,
                })
            }
            "hosted" => BackendConfig::Hosted(HostedRuntimeConfig {
                url: required("HOSTED_URL")?,
                anon_key: required("HOSTED_ANON_KEY")?,
                oauth_redirect_url,
                session_file: optional("SESSION_FILE").map(PathBuf::from),
            }),
            other => {
                return Err(AppError::Validation(format!(
                    "BACKEND_PROVIDER must be either 'memory' or 'hosted', got '{other}'"
                )));
            }
        };

        Ok(Self {
            frontend_url,
            api_host,
            api_port,
            backend,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Validation(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
