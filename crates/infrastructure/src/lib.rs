//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod argon2_password_digest;
mod hosted_auth_provider;
mod hosted_client;
mod hosted_record_store;
mod in_memory_auth_provider;
mod in_memory_profile_repository;
mod in_memory_role_repository;

pub use argon2_password_digest::Argon2PasswordDigest;
pub use hosted_auth_provider::HostedAuthProvider;
pub use hosted_client::HostedClient;
pub use hosted_record_store::HostedRecordStore;
pub use in_memory_auth_provider::InMemoryAuthProvider;
pub use in_memory_profile_repository::InMemoryProfileRepository;
pub use in_memory_role_repository::InMemoryRoleRepository;
