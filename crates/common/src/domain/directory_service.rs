use crate::domain::result::DomainResult;
use crate::domain::{AddProfileInput, UpdateProfileInput, UserProfile};
use async_trait::async_trait;

/// Remote store of user profile records.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Create a user profile
    async fn add_user(&self, input: AddProfileInput) -> DomainResult<UserProfile>;

    /// Delete a user profile
    async fn remove_user(&self, organization_id: &str, email: &str) -> DomainResult<()>;

    /// Get a user profile
    async fn get_user(&self, organization_id: &str, email: &str) -> DomainResult<UserProfile>;

    /// List every user profile of an organization
    async fn get_users(&self, organization_id: &str) -> DomainResult<Vec<UserProfile>>;

    /// Update the provided profile fields
    async fn update_user(&self, input: UpdateProfileInput) -> DomainResult<()>;
}
