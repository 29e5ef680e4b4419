use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use strollup_application::ProfileRepository;
use strollup_core::StoreError;
use strollup_domain::UserProfile;
use tokio::sync::RwLock;

/// In-memory profile repository implementation.
#[derive(Debug, Default)]
pub struct InMemoryProfileRepository {
    profiles: RwLock<BTreeMap<String, UserProfile>>,
    offline: AtomicBool,
}

impl InMemoryProfileRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a profile.
    pub async fn upsert(&self, profile: UserProfile) {
        self.profiles
            .write()
            .await
            .insert(profile.id().to_owned(), profile);
    }

    /// Makes every call fail as unreachable until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn reachable(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Network("profile store offline".to_owned()));
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn find_profile(&self, identity_id: &str) -> Result<Option<UserProfile>, StoreError> {
        self.reachable()?;
        Ok(self.profiles.read().await.get(identity_id).cloned())
    }

    async fn list_profiles(&self) -> Result<Vec<UserProfile>, StoreError> {
        self.reachable()?;
        Ok(self.profiles.read().await.values().cloned().collect())
    }

    async fn save_profile_roles(
        &self,
        identity_id: &str,
        roles: &[String],
    ) -> Result<(), StoreError> {
        self.reachable()?;
        let mut profiles = self.profiles.write().await;
        let Some(profile) = profiles.get_mut(identity_id) else {
            return Err(StoreError::Rejected(format!(
                "profile '{identity_id}' does not exist"
            )));
        };

        profile.set_roles(roles.to_vec());
        Ok(())
    }

    async fn save_profile_active(&self, identity_id: &str, active: bool) -> Result<(), StoreError> {
        self.reachable()?;
        let mut profiles = self.profiles.write().await;
        let Some(profile) = profiles.get_mut(identity_id) else {
            return Err(StoreError::Rejected(format!(
                "profile '{identity_id}' does not exist"
            )));
        };

        profile.set_active(active);
        Ok(())
    }
}
