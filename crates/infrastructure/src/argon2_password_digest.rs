//! Argon2id password digests for locally held accounts.
//!
//! Parameters follow the OWASP recommendation: m=19456 (19 MiB), t=2, p=1.

use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use strollup_core::AuthError;

/// Hashes and verifies account passwords with Argon2id.
#[derive(Clone)]
pub struct Argon2PasswordDigest {
    argon2: Argon2<'static>,
}

impl Argon2PasswordDigest {
    /// Creates a digest with the recommended parameters.
    #[must_use]
    pub fn new() -> Self {
        let params = Params::new(19456, 2, 1, None).unwrap_or_else(|_| Params::default());
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Returns a PHC-formatted hash of `password`.
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|error| AuthError::Provider(format!("failed to hash password: {error}")))
    }

    /// Checks `password` against a stored hash.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|error| AuthError::Provider(format!("stored password hash unreadable: {error}")))?;

        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(error) => Err(AuthError::Provider(format!(
                "password verification failed: {error}"
            ))),
        }
    }
}

impl Default for Argon2PasswordDigest {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Argon2PasswordDigest;

    #[test]
    fn matching_password_verifies() {
        let digest = Argon2PasswordDigest::new();
        let Ok(hash) = digest.hash("correct horse") else {
            panic!("hashing should succeed");
        };

        assert_eq!(digest.verify("correct horse", &hash), Ok(true));
        assert_eq!(digest.verify("battery staple", &hash), Ok(false));
    }

    #[test]
    fn garbage_hash_is_a_provider_error() {
        let digest = Argon2PasswordDigest::new();
        assert!(digest.verify("anything", "not-a-phc-string").is_err());
    }
}
