use crate::domain::RoleRecord;
use crate::domain::result::DomainResult;
use async_trait::async_trait;

/// Input for registering a role; the registry assigns the role id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterRoleInput {
    pub organization_id: String,
    pub name: String,
    pub description: String,
    pub internal: bool,
}

/// Remote registry of role names and descriptions.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RoleRegistry: Send + Sync {
    /// Register a new role and assign its id
    async fn add_role(&self, input: RegisterRoleInput) -> DomainResult<RoleRecord>;

    /// Get a role by id
    async fn get_role(&self, organization_id: &str, role_id: &str) -> DomainResult<RoleRecord>;

    /// Delete a role
    async fn remove_role(&self, organization_id: &str, role_id: &str) -> DomainResult<()>;
}
