use crate::domain::{DomainError, DomainResult, RegisterRoleInput, RoleRecord, RoleRegistry};
use crate::memory::CallRecorder;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

/// In-memory implementation of `RoleRegistry`.
pub struct InMemoryRoleRegistry {
    records: RwLock<HashMap<(String, String), RoleRecord>>,
    recorder: CallRecorder,
}

impl InMemoryRoleRegistry {
    pub fn new() -> Self {
        Self::with_latency(None)
    }

    pub fn with_latency(latency: Option<Duration>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            recorder: CallRecorder::new(latency),
        }
    }

    pub fn recorder(&self) -> &CallRecorder {
        &self.recorder
    }

    /// Insert a record with a caller-chosen id
    pub async fn insert(&self, record: RoleRecord) {
        let mut records = self.records.write().await;
        records.insert(
            (record.organization_id.clone(), record.role_id.clone()),
            record,
        );
    }
}

impl Default for InMemoryRoleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoleRegistry for InMemoryRoleRegistry {
    async fn add_role(&self, input: RegisterRoleInput) -> DomainResult<RoleRecord> {
        self.recorder.record("add_role").await?;
        let record = RoleRecord {
            organization_id: input.organization_id,
            role_id: xid::new().to_string(),
            name: input.name,
            description: input.description,
            internal: input.internal,
            created_at: Some(chrono::Utc::now()),
        };
        self.insert(record.clone()).await;
        Ok(record)
    }

    async fn get_role(&self, organization_id: &str, role_id: &str) -> DomainResult<RoleRecord> {
        self.recorder.record("get_role").await?;
        let records = self.records.read().await;
        records
            .get(&(organization_id.to_string(), role_id.to_string()))
            .cloned()
            .ok_or_else(|| DomainError::RoleNotFound(role_id.to_string()))
    }

    async fn remove_role(&self, organization_id: &str, role_id: &str) -> DomainResult<()> {
        self.recorder.record("remove_role").await?;
        let mut records = self.records.write().await;
        records
            .remove(&(organization_id.to_string(), role_id.to_string()))
            .map(|_| ())
            .ok_or_else(|| DomainError::RoleNotFound(role_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_role_assigns_unique_ids() {
        let registry = InMemoryRoleRegistry::new();
        let input = RegisterRoleInput {
            organization_id: "org-1".to_string(),
            name: "Operator".to_string(),
            description: "Runs things".to_string(),
            internal: false,
        };

        let first = registry.add_role(input.clone()).await.unwrap();
        let second = registry.add_role(input).await.unwrap();
        assert_ne!(first.role_id, second.role_id);

        let fetched = registry.get_role("org-1", &first.role_id).await.unwrap();
        assert_eq!(fetched.name, "Operator");
    }

    #[tokio::test]
    async fn test_remove_missing_role_fails() {
        let registry = InMemoryRoleRegistry::new();
        let result = registry.remove_role("org-1", "missing").await;
        assert!(matches!(result, Err(DomainError::RoleNotFound(_))));
    }
}
