use crate::domain::{
    AddProfileInput, DirectoryService, DomainError, DomainResult, UpdateProfileInput, UserProfile,
};
use crate::memory::CallRecorder;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::RwLock;

/// Methods that change directory state.
pub const DIRECTORY_MUTATIONS: &[&str] = &["add_user", "remove_user", "update_user"];

/// In-memory implementation of `DirectoryService`, ordered by email.
pub struct InMemoryDirectoryService {
    profiles: RwLock<BTreeMap<(String, String), UserProfile>>,
    recorder: CallRecorder,
}

impl InMemoryDirectoryService {
    pub fn new() -> Self {
        Self::with_latency(None)
    }

    pub fn with_latency(latency: Option<Duration>) -> Self {
        Self {
            profiles: RwLock::new(BTreeMap::new()),
            recorder: CallRecorder::new(latency),
        }
    }

    pub fn recorder(&self) -> &CallRecorder {
        &self.recorder
    }
}

impl Default for InMemoryDirectoryService {
    fn default() -> Self {
        Self::new()
    }
}

fn profile_key(organization_id: &str, email: &str) -> (String, String) {
    (organization_id.to_string(), email.to_string())
}

#[async_trait]
impl DirectoryService for InMemoryDirectoryService {
    async fn add_user(&self, input: AddProfileInput) -> DomainResult<UserProfile> {
        self.recorder.record("add_user").await?;
        let mut profiles = self.profiles.write().await;
        let key = profile_key(&input.organization_id, &input.email);
        if profiles.contains_key(&key) {
            return Err(DomainError::UserAlreadyExists(input.email));
        }

        let profile = UserProfile {
            organization_id: input.organization_id,
            email: input.email,
            name: input.name,
            last_name: input.last_name,
            title: input.title,
            phone: input.phone,
            location: input.location,
            photo_base64: input.photo_base64,
            member_since: Some(chrono::Utc::now()),
        };
        profiles.insert(key, profile.clone());
        Ok(profile)
    }

    async fn remove_user(&self, organization_id: &str, email: &str) -> DomainResult<()> {
        self.recorder.record("remove_user").await?;
        let mut profiles = self.profiles.write().await;
        profiles
            .remove(&profile_key(organization_id, email))
            .map(|_| ())
            .ok_or_else(|| DomainError::UserNotFound(email.to_string()))
    }

    async fn get_user(&self, organization_id: &str, email: &str) -> DomainResult<UserProfile> {
        self.recorder.record("get_user").await?;
        let profiles = self.profiles.read().await;
        profiles
            .get(&profile_key(organization_id, email))
            .cloned()
            .ok_or_else(|| DomainError::UserNotFound(email.to_string()))
    }

    async fn get_users(&self, organization_id: &str) -> DomainResult<Vec<UserProfile>> {
        self.recorder.record("get_users").await?;
        let profiles = self.profiles.read().await;
        Ok(profiles
            .iter()
            .filter(|((organization, _), _)| organization == organization_id)
            .map(|(_, profile)| profile.clone())
            .collect())
    }

    async fn update_user(&self, input: UpdateProfileInput) -> DomainResult<()> {
        self.recorder.record("update_user").await?;
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(&profile_key(&input.organization_id, &input.email))
            .ok_or_else(|| DomainError::UserNotFound(input.email.clone()))?;

        if let Some(name) = input.name {
            profile.name = name;
        }
        if let Some(last_name) = input.last_name {
            profile.last_name = last_name;
        }
        if let Some(title) = input.title {
            profile.title = title;
        }
        if let Some(phone) = input.phone {
            profile.phone = phone;
        }
        if let Some(location) = input.location {
            profile.location = location;
        }
        if let Some(photo_base64) = input.photo_base64 {
            profile.photo_base64 = photo_base64;
        }
        Ok(())
    }
}
