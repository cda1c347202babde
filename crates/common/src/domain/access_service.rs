use crate::domain::result::DomainResult;
use crate::domain::{Role, UserAuthxInfo};
use async_trait::async_trait;

/// Input for registering basic (email + password) credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddBasicCredentialInput {
    pub organization_id: String,
    pub email: String,
    pub password: String,
    pub role_id: String,
}

/// Input for moving a user to a different role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditUserRoleInput {
    pub organization_id: String,
    pub email: String,
    pub new_role_id: String,
}

/// Input for changing a user's password
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangePasswordInput {
    pub organization_id: String,
    pub email: String,
    pub password: String,
    pub new_password: String,
}

/// Remote store of credentials, role definitions and user→role assignment.
///
/// Every call is a remote round-trip that can fail; errors are propagated
/// unchanged by callers.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AccessService: Send + Sync {
    /// List every role defined in an organization, with its primitives
    async fn list_roles(&self, organization_id: &str) -> DomainResult<Vec<Role>>;

    /// Get the id of the role currently assigned to a user
    async fn get_user_role(&self, organization_id: &str, email: &str) -> DomainResult<String>;

    /// Create credentials for a user and assign the initial role
    async fn add_basic_credential(&self, input: AddBasicCredentialInput) -> DomainResult<()>;

    /// Delete every credential of a user
    async fn delete_credentials(&self, organization_id: &str, email: &str) -> DomainResult<()>;

    /// Reassign a user to another role
    async fn edit_user_role(&self, input: EditUserRoleInput) -> DomainResult<()>;

    /// Define a role (id already assigned by the role registry)
    async fn add_role(&self, role: Role) -> DomainResult<Role>;

    /// Delete a role definition
    async fn remove_role(&self, organization_id: &str, role_id: &str) -> DomainResult<()>;

    /// Get role assignment and login metadata for a user
    async fn get_user_authx_info(
        &self,
        organization_id: &str,
        email: &str,
    ) -> DomainResult<UserAuthxInfo>;

    /// Change a user's password after verifying the current one
    async fn change_password(&self, input: ChangePasswordInput) -> DomainResult<()>;
}
