use crate::domain::OwnershipCache;
use common::domain::DomainResult;
use std::sync::Arc;

/// Decides whether a removal or reassignment keeps an owner in the
/// organization.
///
/// Every answer is read from the current [`OwnershipCache`] snapshot, so a
/// decision is only sound while the caller holds the organization's lock
/// across the check and the mutation that follows. Organizations without
/// owner roles or owner users fail with `NoOwnerRolesFound` or
/// `NoOwnerUsersFound` instead of answering.
pub struct InvariantGuard {
    cache: Arc<OwnershipCache>,
}

impl InvariantGuard {
    pub fn new(cache: Arc<OwnershipCache>) -> Self {
        Self { cache }
    }

    pub async fn role_is_owner(&self, organization_id: &str, role_id: &str) -> DomainResult<bool> {
        let owner_roles = self.cache.get_owner_role_ids(organization_id).await?;
        Ok(owner_roles.contains(role_id))
    }

    pub async fn user_is_owner(&self, organization_id: &str, email: &str) -> DomainResult<bool> {
        let owners = self.cache.get_owner_users(organization_id).await?;
        Ok(owners.contains(email))
    }

    /// True if an owner other than `excluding_email` exists
    pub async fn has_another_owner(
        &self,
        organization_id: &str,
        excluding_email: &str,
    ) -> DomainResult<bool> {
        let owners = self.cache.get_owner_users(organization_id).await?;
        Ok(owners.iter().any(|owner| owner != excluding_email))
    }

    pub async fn can_remove_user(&self, organization_id: &str, email: &str) -> DomainResult<bool> {
        let owners = self.cache.get_owner_users(organization_id).await?;
        if !owners.contains(email) {
            return Ok(true);
        }
        Ok(owners.iter().any(|owner| owner != email))
    }

    /// Moving a user onto an owner role is always allowed; moving the last
    /// owner off one is not.
    pub async fn can_assign_role(
        &self,
        organization_id: &str,
        email: &str,
        new_role_id: &str,
    ) -> DomainResult<bool> {
        if self.role_is_owner(organization_id, new_role_id).await? {
            return Ok(true);
        }
        self.can_remove_user(organization_id, email).await
    }

    /// A non-owner role can always go. An owner role can go only if some
    /// owner holds a different owner role.
    pub async fn can_remove_role(&self, organization_id: &str, role_id: &str) -> DomainResult<bool> {
        if !self.role_is_owner(organization_id, role_id).await? {
            return Ok(true);
        }
        let assignments = self.cache.get_owner_assignments(organization_id).await?;
        Ok(assignments.values().any(|held| held != role_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserManagerServiceConfig;
    use common::domain::{
        AccessPrimitive, DomainError, MockAccessService, MockDirectoryService, Role, UserProfile,
    };
    use std::collections::HashMap;

    fn role(role_id: &str, primitives: Vec<AccessPrimitive>) -> Role {
        Role {
            organization_id: "org-1".to_string(),
            role_id: role_id.to_string(),
            name: role_id.to_string(),
            internal: false,
            primitives,
        }
    }

    fn profile(email: &str) -> UserProfile {
        UserProfile {
            organization_id: "org-1".to_string(),
            email: email.to_string(),
            name: "Test".to_string(),
            last_name: "User".to_string(),
            title: "Engineer".to_string(),
            phone: String::new(),
            location: String::new(),
            photo_base64: String::new(),
            member_since: None,
        }
    }

    /// Guard over an organization with the given roles and user assignments
    fn guard(roles: Vec<Role>, assignments: &[(&str, &str)]) -> InvariantGuard {
        let assignments: HashMap<String, String> = assignments
            .iter()
            .map(|(email, role_id)| (email.to_string(), role_id.to_string()))
            .collect();
        let profiles: Vec<UserProfile> = assignments.keys().map(|email| profile(email)).collect();

        let mut access = MockAccessService::new();
        access
            .expect_list_roles()
            .returning(move |_| Ok(roles.clone()));
        access.expect_get_user_role().returning(move |_, email| {
            assignments
                .get(email)
                .cloned()
                .ok_or_else(|| DomainError::UserNotFound(email.to_string()))
        });

        let mut directory = MockDirectoryService::new();
        directory
            .expect_get_users()
            .returning(move |_| Ok(profiles.clone()));

        let cache = OwnershipCache::new(
            Arc::new(access),
            Arc::new(directory),
            &UserManagerServiceConfig::default(),
        );
        InvariantGuard::new(Arc::new(cache))
    }

    fn standard_roles() -> Vec<Role> {
        vec![
            role("r1", vec![AccessPrimitive::Org]),
            role("r2", vec![]),
        ]
    }

    #[tokio::test]
    async fn test_sole_owner_cannot_be_removed() {
        let guard = guard(standard_roles(), &[("u1", "r1")]);
        assert!(!guard.can_remove_user("org-1", "u1").await.unwrap());
    }

    #[tokio::test]
    async fn test_two_owners_can_each_be_removed() {
        let guard = guard(standard_roles(), &[("u1", "r1"), ("u2", "r1")]);
        assert!(guard.can_remove_user("org-1", "u1").await.unwrap());
        assert!(guard.can_remove_user("org-1", "u2").await.unwrap());
        assert!(guard.has_another_owner("org-1", "u1").await.unwrap());
    }

    #[tokio::test]
    async fn test_non_owner_can_be_removed() {
        let guard = guard(standard_roles(), &[("u1", "r1"), ("u3", "r2")]);
        assert!(guard.can_remove_user("org-1", "u3").await.unwrap());
        assert!(!guard.user_is_owner("org-1", "u3").await.unwrap());
    }

    #[tokio::test]
    async fn test_sole_owner_cannot_be_demoted() {
        let guard = guard(standard_roles(), &[("u1", "r1")]);
        assert!(!guard.can_assign_role("org-1", "u1", "r2").await.unwrap());
        assert!(guard.can_assign_role("org-1", "u1", "r1").await.unwrap());
    }

    #[tokio::test]
    async fn test_assigning_owner_role_is_always_allowed() {
        let guard = guard(standard_roles(), &[("u1", "r1"), ("u3", "r2")]);
        assert!(guard.can_assign_role("org-1", "u3", "r1").await.unwrap());
        assert!(guard.can_assign_role("org-1", "u3", "r2").await.unwrap());
    }

    #[tokio::test]
    async fn test_owner_role_can_be_assigned_when_nobody_holds_one() {
        let guard = guard(standard_roles(), &[("u1", "r2")]);

        let owners = guard.user_is_owner("org-1", "u1").await;
        assert!(matches!(owners, Err(DomainError::NoOwnerUsersFound(_))));

        assert!(guard.can_assign_role("org-1", "u1", "r1").await.unwrap());
        assert!(matches!(
            guard.can_assign_role("org-1", "u1", "r2").await,
            Err(DomainError::NoOwnerUsersFound(_))
        ));
    }

    #[tokio::test]
    async fn test_no_owner_roles_fails_closed() {
        let guard = guard(vec![role("r2", vec![AccessPrimitive::Apps])], &[("u1", "r2")]);

        let role_result = guard.role_is_owner("org-1", "r2").await;
        let user_result = guard.user_is_owner("org-1", "u1").await;
        let removal = guard.can_remove_user("org-1", "u1").await;

        assert!(matches!(role_result, Err(DomainError::NoOwnerRolesFound(_))));
        assert!(matches!(user_result, Err(DomainError::NoOwnerUsersFound(_))));
        assert!(matches!(removal, Err(DomainError::NoOwnerUsersFound(_))));
    }

    #[tokio::test]
    async fn test_owner_role_removal_requires_another_owner_role_holder() {
        let roles = vec![
            role("r1", vec![AccessPrimitive::Org]),
            role("r3", vec![AccessPrimitive::Org, AccessPrimitive::Apps]),
            role("r2", vec![]),
        ];

        let guard_single = guard(roles.clone(), &[("u1", "r1"), ("u2", "r1")]);
        assert!(!guard_single.can_remove_role("org-1", "r1").await.unwrap());
        assert!(guard_single.can_remove_role("org-1", "r3").await.unwrap());
        assert!(guard_single.can_remove_role("org-1", "r2").await.unwrap());

        let guard_split = guard(roles, &[("u1", "r1"), ("u2", "r3")]);
        assert!(guard_split.can_remove_role("org-1", "r1").await.unwrap());
        assert!(guard_split.can_remove_role("org-1", "r3").await.unwrap());
    }
}
