use crate::domain::{InvariantGuard, OrganizationLocks, OwnershipCache, with_deadline};
use common::domain::{
    AccessPrimitive, AccessService, AddBasicCredentialInput, AddProfileInput, ChangePasswordInput,
    DirectoryService, DomainError, DomainResult, EditUserRoleInput, RegisterRoleInput, Role,
    RoleRegistry, UpdateProfileInput, UserDetails, UserProfile,
};
use futures::{StreamExt, TryStreamExt, stream};
use garde::Validate;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

// ============================================================================
// Service Request Types
// ============================================================================

/// Request to add a user to an organization
#[derive(Debug, Clone, Validate)]
pub struct AddUserRequest {
    #[garde(length(min = 1))]
    pub organization_id: String,
    #[garde(email, length(max = 254))]
    pub email: String,
    #[garde(length(min = 1))]
    pub password: String,
    #[garde(length(min = 1))]
    pub name: String,
    #[garde(length(min = 1))]
    pub last_name: String,
    #[garde(length(min = 1))]
    pub title: String,
    #[garde(skip)]
    pub phone: String,
    #[garde(skip)]
    pub location: String,
    #[garde(skip)]
    pub photo_base64: String,
    #[garde(length(min = 1))]
    pub role_id: String,
}

/// Request to get a user
#[derive(Debug, Clone, Validate)]
pub struct GetUserRequest {
    #[garde(length(min = 1))]
    pub organization_id: String,
    #[garde(length(min = 1))]
    pub email: String,
}

/// Request to remove a user
#[derive(Debug, Clone, Validate)]
pub struct RemoveUserRequest {
    #[garde(length(min = 1))]
    pub organization_id: String,
    #[garde(length(min = 1))]
    pub email: String,
}

/// Request to list the users of an organization
#[derive(Debug, Clone, Validate)]
pub struct ListUsersRequest {
    #[garde(length(min = 1))]
    pub organization_id: String,
}

/// Request to change a user's password
#[derive(Debug, Clone, Validate)]
pub struct ChangePasswordRequest {
    #[garde(length(min = 1))]
    pub organization_id: String,
    #[garde(length(min = 1))]
    pub email: String,
    #[garde(length(min = 1))]
    pub password: String,
    #[garde(length(min = 1))]
    pub new_password: String,
}

/// Request to create a role
#[derive(Debug, Clone, Validate)]
pub struct AddRoleRequest {
    #[garde(length(min = 1))]
    pub organization_id: String,
    #[garde(length(min = 1))]
    pub name: String,
    #[garde(skip)]
    pub description: String,
    #[garde(skip)]
    pub internal: bool,
    #[garde(length(min = 1))]
    pub primitives: Vec<AccessPrimitive>,
}

/// Request to delete a role
#[derive(Debug, Clone, Validate)]
pub struct RemoveRoleRequest {
    #[garde(length(min = 1))]
    pub organization_id: String,
    #[garde(length(min = 1))]
    pub role_id: String,
}

/// Request to move a user onto another role
#[derive(Debug, Clone, Validate)]
pub struct AssignRoleRequest {
    #[garde(length(min = 1))]
    pub organization_id: String,
    #[garde(length(min = 1))]
    pub email: String,
    #[garde(length(min = 1))]
    pub role_id: String,
}

/// Request to list the roles of an organization
#[derive(Debug, Clone, Validate)]
pub struct ListRolesRequest {
    #[garde(length(min = 1))]
    pub organization_id: String,
}

/// Request to update profile fields; a provided field must be non-empty
#[derive(Debug, Clone, Default, Validate)]
pub struct UpdateUserRequest {
    #[garde(length(min = 1))]
    pub organization_id: String,
    #[garde(length(min = 1))]
    pub email: String,
    #[garde(length(min = 1))]
    pub name: Option<String>,
    #[garde(length(min = 1))]
    pub last_name: Option<String>,
    #[garde(length(min = 1))]
    pub title: Option<String>,
    #[garde(length(min = 1))]
    pub phone: Option<String>,
    #[garde(length(min = 1))]
    pub location: Option<String>,
    #[garde(length(min = 1))]
    pub photo_base64: Option<String>,
}

/// Domain-level settings for [`UserManagerService`]
#[derive(Debug, Clone)]
pub struct UserManagerServiceConfig {
    /// Deadline applied to each collaborator call
    pub upstream_timeout: Duration,
    /// Bound on concurrent per-user calls when fanning out
    pub population_concurrency: usize,
}

impl Default for UserManagerServiceConfig {
    fn default() -> Self {
        Self {
            upstream_timeout: Duration::from_secs(5),
            population_concurrency: 8,
        }
    }
}

/// Manages users and roles across the access and directory services while
/// keeping at least one owner in every organization.
///
/// Mutations for one organization run one at a time: each holds the
/// organization's lock across the ownership check, the collaborator calls
/// and the cache invalidation.
pub struct UserManagerService {
    access_service: Arc<dyn AccessService>,
    directory_service: Arc<dyn DirectoryService>,
    role_registry: Arc<dyn RoleRegistry>,
    ownership_cache: Arc<OwnershipCache>,
    invariant_guard: InvariantGuard,
    organization_locks: OrganizationLocks,
    config: UserManagerServiceConfig,
}

impl UserManagerService {
    pub fn new(
        access_service: Arc<dyn AccessService>,
        directory_service: Arc<dyn DirectoryService>,
        role_registry: Arc<dyn RoleRegistry>,
        config: UserManagerServiceConfig,
    ) -> Self {
        let ownership_cache = Arc::new(OwnershipCache::new(
            access_service.clone(),
            directory_service.clone(),
            &config,
        ));
        let invariant_guard = InvariantGuard::new(ownership_cache.clone());

        Self {
            access_service,
            directory_service,
            role_registry,
            ownership_cache,
            invariant_guard,
            organization_locks: OrganizationLocks::new(),
            config,
        }
    }

    pub fn ownership_cache(&self) -> &Arc<OwnershipCache> {
        &self.ownership_cache
    }

    pub fn invariant_guard(&self) -> &InvariantGuard {
        &self.invariant_guard
    }

    /// Create the profile, then the credential with its role assignment
    #[instrument(skip(self, request), fields(organization_id = %request.organization_id, email = %request.email, role_id = %request.role_id))]
    pub async fn add_user(&self, request: AddUserRequest) -> DomainResult<UserDetails> {
        // Validate request using garde
        common::garde::validate(&request)?;

        debug!("adding user");

        let organization_id = request.organization_id.clone();
        let email = request.email.clone();
        {
            let _lock = self.organization_locks.lock(&organization_id).await;
            let _mutation = self.ownership_cache.begin_mutation(&organization_id);
            self.ownership_cache.invalidate(&organization_id).await;

            let outcome = async {
                let profile_input = AddProfileInput {
                    organization_id: request.organization_id.clone(),
                    email: request.email.clone(),
                    name: request.name,
                    last_name: request.last_name,
                    title: request.title,
                    phone: request.phone,
                    location: request.location,
                    photo_base64: request.photo_base64,
                };
                self.call("directory.add_user", self.directory_service.add_user(profile_input))
                    .await?;

                let credential_input = AddBasicCredentialInput {
                    organization_id: request.organization_id,
                    email: request.email,
                    password: request.password,
                    role_id: request.role_id,
                };
                self.call(
                    "access.add_basic_credential",
                    self.access_service.add_basic_credential(credential_input),
                )
                .await
                .map_err(|source| partial_mutation("add_user", "directory.add_user", source))
            }
            .await;

            self.ownership_cache.invalidate(&organization_id).await;
            outcome?;
        }

        debug!("user added successfully");
        self.user_details(&organization_id, &email).await
    }

    /// Remove a user unless they are the organization's last owner
    #[instrument(skip(self, request), fields(organization_id = %request.organization_id, email = %request.email))]
    pub async fn remove_user(&self, request: RemoveUserRequest) -> DomainResult<()> {
        // Validate request using garde
        common::garde::validate(&request)?;

        debug!("removing user");

        let organization_id = request.organization_id.as_str();
        let email = request.email.as_str();
        let _lock = self.organization_locks.lock(organization_id).await;

        if !self
            .invariant_guard
            .can_remove_user(organization_id, email)
            .await?
        {
            warn!("rejected removal of last owner");
            return Err(DomainError::OwnerInvariantViolation(
                organization_id.to_string(),
                format!("{} is the last owner", email),
            ));
        }

        let _mutation = self.ownership_cache.begin_mutation(organization_id);
        self.ownership_cache.invalidate(organization_id).await;

        let outcome = async {
            self.call(
                "access.delete_credentials",
                self.access_service.delete_credentials(organization_id, email),
            )
            .await?;

            self.call(
                "directory.remove_user",
                self.directory_service.remove_user(organization_id, email),
            )
            .await
            .map_err(|source| partial_mutation("remove_user", "access.delete_credentials", source))
        }
        .await;

        self.ownership_cache.invalidate(organization_id).await;
        outcome?;

        debug!("user removed successfully");
        Ok(())
    }

    /// Move a user onto another role unless that demotes the last owner
    #[instrument(skip(self, request), fields(organization_id = %request.organization_id, email = %request.email, role_id = %request.role_id))]
    pub async fn assign_role(&self, request: AssignRoleRequest) -> DomainResult<UserDetails> {
        // Validate request using garde
        common::garde::validate(&request)?;

        debug!("assigning role");

        let organization_id = request.organization_id.clone();
        let email = request.email.clone();
        {
            let _lock = self.organization_locks.lock(&organization_id).await;

            if !self
                .invariant_guard
                .can_assign_role(&organization_id, &email, &request.role_id)
                .await?
            {
                warn!("rejected demotion of last owner");
                return Err(DomainError::OwnerInvariantViolation(
                    organization_id,
                    format!("{} is the last owner", email),
                ));
            }

            let _mutation = self.ownership_cache.begin_mutation(&organization_id);
            self.ownership_cache.invalidate(&organization_id).await;

            let input = EditUserRoleInput {
                organization_id: request.organization_id,
                email: request.email,
                new_role_id: request.role_id,
            };
            let outcome = self
                .call("access.edit_user_role", self.access_service.edit_user_role(input))
                .await;

            self.ownership_cache.invalidate(&organization_id).await;
            outcome?;
        }

        debug!("role assigned successfully");
        self.user_details(&organization_id, &email).await
    }

    /// Register a role, then define its primitives in the access service
    #[instrument(skip(self, request), fields(organization_id = %request.organization_id, name = %request.name))]
    pub async fn add_role(&self, request: AddRoleRequest) -> DomainResult<Role> {
        // Validate request using garde
        common::garde::validate(&request)?;

        debug!("adding role");

        let organization_id = request.organization_id.as_str();
        let _lock = self.organization_locks.lock(organization_id).await;
        let _mutation = self.ownership_cache.begin_mutation(organization_id);
        self.ownership_cache.invalidate(organization_id).await;

        let outcome = async {
            let registration = RegisterRoleInput {
                organization_id: request.organization_id.clone(),
                name: request.name.clone(),
                description: request.description.clone(),
                internal: request.internal,
            };
            let record = self
                .call("role_registry.add_role", self.role_registry.add_role(registration))
                .await?;

            let role = Role {
                organization_id: record.organization_id,
                role_id: record.role_id,
                name: record.name,
                internal: record.internal,
                primitives: request.primitives.clone(),
            };
            self.call("access.add_role", self.access_service.add_role(role))
                .await
                .map_err(|source| partial_mutation("add_role", "role_registry.add_role", source))
        }
        .await;

        self.ownership_cache.invalidate(organization_id).await;
        let role = outcome?;

        debug!(role_id = %role.role_id, "role added successfully");
        Ok(role)
    }

    /// Delete a role unless it is the only owner role held by anyone
    #[instrument(skip(self, request), fields(organization_id = %request.organization_id, role_id = %request.role_id))]
    pub async fn remove_role(&self, request: RemoveRoleRequest) -> DomainResult<()> {
        // Validate request using garde
        common::garde::validate(&request)?;

        debug!("removing role");

        let organization_id = request.organization_id.as_str();
        let role_id = request.role_id.as_str();
        let _lock = self.organization_locks.lock(organization_id).await;

        if !self
            .invariant_guard
            .can_remove_role(organization_id, role_id)
            .await?
        {
            warn!("rejected removal of the only held owner role");
            return Err(DomainError::OwnerInvariantViolation(
                organization_id.to_string(),
                format!("role {} is held by every remaining owner", role_id),
            ));
        }

        let _mutation = self.ownership_cache.begin_mutation(organization_id);
        self.ownership_cache.invalidate(organization_id).await;

        let outcome = async {
            self.call(
                "access.remove_role",
                self.access_service.remove_role(organization_id, role_id),
            )
            .await?;

            self.call(
                "role_registry.remove_role",
                self.role_registry.remove_role(organization_id, role_id),
            )
            .await
            .map_err(|source| partial_mutation("remove_role", "access.remove_role", source))
        }
        .await;

        self.ownership_cache.invalidate(organization_id).await;
        outcome?;

        debug!("role removed successfully");
        Ok(())
    }

    /// Get a user's profile together with their role assignment
    #[instrument(skip(self, request), fields(organization_id = %request.organization_id, email = %request.email))]
    pub async fn get_user(&self, request: GetUserRequest) -> DomainResult<UserDetails> {
        // Validate request using garde
        common::garde::validate(&request)?;

        debug!("getting user");
        self.user_details(&request.organization_id, &request.email)
            .await
    }

    /// List every user of an organization, in directory order
    #[instrument(skip(self, request), fields(organization_id = %request.organization_id))]
    pub async fn list_users(&self, request: ListUsersRequest) -> DomainResult<Vec<UserDetails>> {
        // Validate request using garde
        common::garde::validate(&request)?;

        let organization_id = request.organization_id.as_str();
        let profiles = self
            .call(
                "directory.get_users",
                self.directory_service.get_users(organization_id),
            )
            .await?;

        let users: Vec<UserDetails> = stream::iter(profiles)
            .map(|profile| self.details_for_profile(profile))
            .buffered(self.config.population_concurrency.max(1))
            .try_collect()
            .await?;

        debug!(count = users.len(), "listed users");
        Ok(users)
    }

    #[instrument(skip(self, request), fields(organization_id = %request.organization_id, email = %request.email))]
    pub async fn change_password(&self, request: ChangePasswordRequest) -> DomainResult<()> {
        // Validate request using garde
        common::garde::validate(&request)?;

        let input = ChangePasswordInput {
            organization_id: request.organization_id,
            email: request.email,
            password: request.password,
            new_password: request.new_password,
        };
        self.call("access.change_password", self.access_service.change_password(input))
            .await?;

        debug!("password changed successfully");
        Ok(())
    }

    #[instrument(skip(self, request), fields(organization_id = %request.organization_id))]
    pub async fn list_roles(&self, request: ListRolesRequest) -> DomainResult<Vec<Role>> {
        // Validate request using garde
        common::garde::validate(&request)?;

        let roles = self
            .call(
                "access.list_roles",
                self.access_service.list_roles(&request.organization_id),
            )
            .await?;

        debug!(count = roles.len(), "listed roles");
        Ok(roles)
    }

    #[instrument(skip(self, request), fields(organization_id = %request.organization_id, email = %request.email))]
    pub async fn update_user(&self, request: UpdateUserRequest) -> DomainResult<()> {
        // Validate request using garde
        common::garde::validate(&request)?;

        let input = UpdateProfileInput {
            organization_id: request.organization_id,
            email: request.email,
            name: request.name,
            last_name: request.last_name,
            title: request.title,
            phone: request.phone,
            location: request.location,
            photo_base64: request.photo_base64,
        };
        self.call("directory.update_user", self.directory_service.update_user(input))
            .await?;

        debug!("user updated successfully");
        Ok(())
    }

    async fn call<T>(
        &self,
        call: &'static str,
        future: impl Future<Output = DomainResult<T>>,
    ) -> DomainResult<T> {
        with_deadline(self.config.upstream_timeout, call, future).await
    }

    async fn user_details(&self, organization_id: &str, email: &str) -> DomainResult<UserDetails> {
        let profile = self
            .call(
                "directory.get_user",
                self.directory_service.get_user(organization_id, email),
            )
            .await?;
        self.details_for_profile(profile).await
    }

    async fn details_for_profile(&self, profile: UserProfile) -> DomainResult<UserDetails> {
        let authx = self
            .call(
                "access.get_user_authx_info",
                self.access_service
                    .get_user_authx_info(&profile.organization_id, &profile.email),
            )
            .await?;
        let role = self
            .call(
                "role_registry.get_role",
                self.role_registry
                    .get_role(&profile.organization_id, &authx.role_id),
            )
            .await?;

        Ok(UserDetails::from_parts(profile, authx, role.name))
    }
}

fn partial_mutation(operation: &str, completed: &str, source: DomainError) -> DomainError {
    error!(operation, completed, error = %source, "mutation partially applied");
    DomainError::PartialMutation {
        operation: operation.to_string(),
        completed: completed.to_string(),
        source: Box::new(source),
    }
}
