use crate::domain::{
    AccessService, AddBasicCredentialInput, ChangePasswordInput, DomainError, DomainResult,
    EditUserRoleInput, Role, UserAuthxInfo,
};
use crate::memory::CallRecorder;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Credential {
    password: String,
    role_id: String,
    last_login: Option<DateTime<Utc>>,
}

/// Methods that change access state, for asserting no mutation happened.
pub const ACCESS_MUTATIONS: &[&str] = &[
    "add_basic_credential",
    "delete_credentials",
    "edit_user_role",
    "add_role",
    "remove_role",
    "change_password",
];

/// In-memory implementation of `AccessService`.
pub struct InMemoryAccessService {
    roles: RwLock<HashMap<String, Vec<Role>>>,
    credentials: RwLock<HashMap<(String, String), Credential>>,
    recorder: CallRecorder,
}

impl InMemoryAccessService {
    pub fn new() -> Self {
        Self::with_latency(None)
    }

    pub fn with_latency(latency: Option<Duration>) -> Self {
        Self {
            roles: RwLock::new(HashMap::new()),
            credentials: RwLock::new(HashMap::new()),
            recorder: CallRecorder::new(latency),
        }
    }

    pub fn recorder(&self) -> &CallRecorder {
        &self.recorder
    }

    async fn require_role(&self, organization_id: &str, role_id: &str) -> DomainResult<Role> {
        let roles = self.roles.read().await;
        roles
            .get(organization_id)
            .and_then(|roles| roles.iter().find(|role| role.role_id == role_id))
            .cloned()
            .ok_or_else(|| DomainError::RoleNotFound(role_id.to_string()))
    }
}

impl Default for InMemoryAccessService {
    fn default() -> Self {
        Self::new()
    }
}

fn credential_key(organization_id: &str, email: &str) -> (String, String) {
    (organization_id.to_string(), email.to_string())
}

#[async_trait]
impl AccessService for InMemoryAccessService {
    async fn list_roles(&self, organization_id: &str) -> DomainResult<Vec<Role>> {
        self.recorder.record("list_roles").await?;
        let roles = self.roles.read().await;
        Ok(roles.get(organization_id).cloned().unwrap_or_default())
    }

    async fn get_user_role(&self, organization_id: &str, email: &str) -> DomainResult<String> {
        self.recorder.record("get_user_role").await?;
        let credentials = self.credentials.read().await;
        credentials
            .get(&credential_key(organization_id, email))
            .map(|credential| credential.role_id.clone())
            .ok_or_else(|| DomainError::UserNotFound(email.to_string()))
    }

    async fn add_basic_credential(&self, input: AddBasicCredentialInput) -> DomainResult<()> {
        self.recorder.record("add_basic_credential").await?;
        self.require_role(&input.organization_id, &input.role_id)
            .await?;

        let mut credentials = self.credentials.write().await;
        let key = credential_key(&input.organization_id, &input.email);
        if credentials.contains_key(&key) {
            return Err(DomainError::UserAlreadyExists(input.email));
        }
        credentials.insert(
            key,
            Credential {
                password: input.password,
                role_id: input.role_id,
                last_login: None,
            },
        );
        Ok(())
    }

    async fn delete_credentials(&self, organization_id: &str, email: &str) -> DomainResult<()> {
        self.recorder.record("delete_credentials").await?;
        let mut credentials = self.credentials.write().await;
        credentials
            .remove(&credential_key(organization_id, email))
            .map(|_| ())
            .ok_or_else(|| DomainError::UserNotFound(email.to_string()))
    }

    async fn edit_user_role(&self, input: EditUserRoleInput) -> DomainResult<()> {
        self.recorder.record("edit_user_role").await?;
        self.require_role(&input.organization_id, &input.new_role_id)
            .await?;

        let mut credentials = self.credentials.write().await;
        let credential = credentials
            .get_mut(&credential_key(&input.organization_id, &input.email))
            .ok_or_else(|| DomainError::UserNotFound(input.email.clone()))?;
        credential.role_id = input.new_role_id;
        Ok(())
    }

    async fn add_role(&self, role: Role) -> DomainResult<Role> {
        self.recorder.record("add_role").await?;
        let mut roles = self.roles.write().await;
        let organization_roles = roles.entry(role.organization_id.clone()).or_default();
        organization_roles.retain(|existing| existing.role_id != role.role_id);
        organization_roles.push(role.clone());
        Ok(role)
    }

    async fn remove_role(&self, organization_id: &str, role_id: &str) -> DomainResult<()> {
        self.recorder.record("remove_role").await?;
        let mut roles = self.roles.write().await;
        let organization_roles = roles
            .get_mut(organization_id)
            .ok_or_else(|| DomainError::RoleNotFound(role_id.to_string()))?;
        let before = organization_roles.len();
        organization_roles.retain(|role| role.role_id != role_id);
        if organization_roles.len() == before {
            return Err(DomainError::RoleNotFound(role_id.to_string()));
        }
        Ok(())
    }

    async fn get_user_authx_info(
        &self,
        organization_id: &str,
        email: &str,
    ) -> DomainResult<UserAuthxInfo> {
        self.recorder.record("get_user_authx_info").await?;
        let credential = {
            let credentials = self.credentials.read().await;
            credentials
                .get(&credential_key(organization_id, email))
                .cloned()
                .ok_or_else(|| DomainError::UserNotFound(email.to_string()))?
        };
        let role = self.require_role(organization_id, &credential.role_id).await?;

        Ok(UserAuthxInfo {
            organization_id: organization_id.to_string(),
            email: email.to_string(),
            role_id: credential.role_id,
            internal_role: role.internal,
            last_login: credential.last_login,
        })
    }

    async fn change_password(&self, input: ChangePasswordInput) -> DomainResult<()> {
        self.recorder.record("change_password").await?;
        let mut credentials = self.credentials.write().await;
        let credential = credentials
            .get_mut(&credential_key(&input.organization_id, &input.email))
            .ok_or(DomainError::InvalidCredentials)?;
        if credential.password != input.password {
            return Err(DomainError::InvalidCredentials);
        }
        credential.password = input.new_password;
        Ok(())
    }
}
