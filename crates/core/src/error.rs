use thiserror::Error;

use crate::AppError;

/// Failures reported by the auth provider collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The provider rejected the email or password.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The provider could not be reached.
    #[error("auth provider unreachable: {0}")]
    Network(String),

    /// Any other provider-side failure.
    #[error("auth provider error: {0}")]
    Provider(String),
}

/// Failures reported by the profile/role storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("store unreachable: {0}")]
    Network(String),

    /// The backing store answered but refused the operation.
    #[error("store rejected request: {0}")]
    Rejected(String),
}

/// Failures while resolving an effective permission set.
///
/// A missing profile or role is never an error; it resolves to fewer
/// permissions. Either variant means the permissions are unknown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Transport-level failure reaching the backing store.
    #[error("permission lookup unreachable: {0}")]
    Network(String),

    /// The backing store refused a lookup.
    #[error("permission lookup failed: {0}")]
    Store(String),
}

impl From<StoreError> for ResolveError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Network(message) => Self::Network(message),
            StoreError::Rejected(message) => Self::Store(message),
        }
    }
}

/// Failure of an administration write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistError {
    /// The write never reached the backing store.
    #[error("save failed, store unreachable: {0}")]
    Network(String),

    /// The backing store refused the write.
    #[error("save rejected: {0}")]
    Rejected(String),
}

impl From<StoreError> for PersistError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Network(message) => Self::Network(message),
            StoreError::Rejected(message) => Self::Rejected(message),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::InvalidCredentials => Self::Unauthorized(value.to_string()),
            AuthError::Network(_) => Self::Unavailable(value.to_string()),
            AuthError::Provider(_) => Self::Internal(value.to_string()),
        }
    }
}

impl From<ResolveError> for AppError {
    fn from(value: ResolveError) -> Self {
        Self::Unavailable(value.to_string())
    }
}

impl From<PersistError> for AppError {
    fn from(value: PersistError) -> Self {
        match value {
            PersistError::Network(_) => Self::Unavailable(value.to_string()),
            PersistError::Rejected(_) => Self::Conflict(value.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Network(_) => Self::Unavailable(value.to_string()),
            StoreError::Rejected(_) => Self::Internal(value.to_string()),
        }
    }
}
