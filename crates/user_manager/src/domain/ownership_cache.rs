use crate::domain::{OrganizationLocks, UserManagerServiceConfig, with_deadline};
use common::domain::{AccessService, DirectoryService, DomainError, DomainResult};
use futures::{StreamExt, TryStreamExt, stream};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Point-in-time view of who owns an organization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnershipSnapshot {
    /// Roles whose primitive set contains `ORG`
    pub owner_role_ids: HashSet<String>,
    /// Owner user email mapped to the owner role it holds
    pub owner_users: HashMap<String, String>,
}

enum CacheSlot {
    /// A population is running; its result is installed only if the token
    /// still matches when it finishes.
    Populating(u64),
    /// Valid only while the organization's mutation epoch equals `epoch`.
    Ready {
        snapshot: Arc<OwnershipSnapshot>,
        epoch: u64,
    },
}

#[derive(Debug, Default)]
struct MutationState {
    active: usize,
    epoch: u64,
}

/// Marks an organization as mid-mutation until dropped.
///
/// While any guard for an organization is alive, populations still run but
/// their results are never cached. Creating and dropping the guard both
/// advance the organization's epoch, which hides every entry built before
/// or during the mutation. Dropping is synchronous, so this holds even when
/// the mutating future is cancelled before it can invalidate.
pub struct MutationGuard<'a> {
    cache: &'a OwnershipCache,
    organization_id: String,
}

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        let mut mutations = self.cache.mutations.lock();
        if let Some(state) = mutations.get_mut(&self.organization_id) {
            state.active = state.active.saturating_sub(1);
            state.epoch += 1;
        }
        debug!(organization_id = %self.organization_id, "ownership mutation window closed");
    }
}

/// Read-through cache of owner roles and owner users per organization.
///
/// Entries are rebuilt whole from the access and directory services and
/// dropped by [`OwnershipCache::invalidate`]. Concurrent misses for the same
/// organization share one population.
pub struct OwnershipCache {
    access_service: Arc<dyn AccessService>,
    directory_service: Arc<dyn DirectoryService>,
    entries: RwLock<HashMap<String, CacheSlot>>,
    mutations: Mutex<HashMap<String, MutationState>>,
    population_locks: OrganizationLocks,
    next_token: AtomicU64,
    upstream_timeout: Duration,
    population_concurrency: usize,
}

impl OwnershipCache {
    pub fn new(
        access_service: Arc<dyn AccessService>,
        directory_service: Arc<dyn DirectoryService>,
        config: &UserManagerServiceConfig,
    ) -> Self {
        Self {
            access_service,
            directory_service,
            entries: RwLock::new(HashMap::new()),
            mutations: Mutex::new(HashMap::new()),
            population_locks: OrganizationLocks::new(),
            next_token: AtomicU64::new(0),
            upstream_timeout: config.upstream_timeout,
            population_concurrency: config.population_concurrency.max(1),
        }
    }

    /// Owner role ids of the organization; fails if it has none
    pub async fn get_owner_role_ids(&self, organization_id: &str) -> DomainResult<HashSet<String>> {
        let snapshot = self.snapshot(organization_id).await?;
        if snapshot.owner_role_ids.is_empty() {
            return Err(DomainError::NoOwnerRolesFound(organization_id.to_string()));
        }
        Ok(snapshot.owner_role_ids.clone())
    }

    /// Emails of users holding an owner role; fails if there are none
    pub async fn get_owner_users(&self, organization_id: &str) -> DomainResult<HashSet<String>> {
        Ok(self
            .get_owner_assignments(organization_id)
            .await?
            .into_keys()
            .collect())
    }

    /// Owner users with the owner role each holds; fails if there are none
    pub async fn get_owner_assignments(
        &self,
        organization_id: &str,
    ) -> DomainResult<HashMap<String, String>> {
        let snapshot = self.snapshot(organization_id).await?;
        if snapshot.owner_users.is_empty() {
            return Err(DomainError::NoOwnerUsersFound(organization_id.to_string()));
        }
        Ok(snapshot.owner_users.clone())
    }

    /// Drop the organization's entry. No-op if absent.
    pub async fn invalidate(&self, organization_id: &str) {
        let removed = self.entries.write().await.remove(organization_id);
        if removed.is_some() {
            debug!(organization_id = %organization_id, "ownership cache entry invalidated");
        }
    }

    /// Open a mutation window for the organization; see [`MutationGuard`]
    pub fn begin_mutation(&self, organization_id: &str) -> MutationGuard<'_> {
        let mut mutations = self.mutations.lock();
        let state = mutations.entry(organization_id.to_string()).or_default();
        state.active += 1;
        state.epoch += 1;

        MutationGuard {
            cache: self,
            organization_id: organization_id.to_string(),
        }
    }

    /// Current epoch, or `None` while a mutation is in progress
    fn settled_epoch(&self, organization_id: &str) -> Option<u64> {
        match self.mutations.lock().get(organization_id) {
            Some(state) if state.active > 0 => None,
            Some(state) => Some(state.epoch),
            None => Some(0),
        }
    }

    /// Whether a populated entry is present
    pub async fn is_cached(&self, organization_id: &str) -> bool {
        self.ready(organization_id).await.is_some()
    }

    /// The cached snapshot, populating it on a miss
    pub async fn snapshot(&self, organization_id: &str) -> DomainResult<Arc<OwnershipSnapshot>> {
        if let Some(snapshot) = self.ready(organization_id).await {
            return Ok(snapshot);
        }

        let _population = self.population_locks.lock(organization_id).await;

        // Another task may have finished populating while we waited
        if let Some(snapshot) = self.ready(organization_id).await {
            return Ok(snapshot);
        }

        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let started_at = {
            let mut entries = self.entries.write().await;
            entries.insert(organization_id.to_string(), CacheSlot::Populating(token));
            self.settled_epoch(organization_id)
        };

        let populated = self.populate(organization_id).await;

        let mut entries = self.entries.write().await;
        let current = matches!(
            entries.get(organization_id),
            Some(CacheSlot::Populating(pending)) if *pending == token
        );

        match populated {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                let settled = started_at
                    .filter(|epoch| self.settled_epoch(organization_id) == Some(*epoch));

                match settled {
                    Some(epoch) if current => {
                        entries.insert(
                            organization_id.to_string(),
                            CacheSlot::Ready {
                                snapshot: snapshot.clone(),
                                epoch,
                            },
                        );
                    }
                    _ => {
                        if current {
                            entries.remove(organization_id);
                        }
                        debug!(organization_id = %organization_id, "discarding population overlapping a mutation");
                    }
                }
                Ok(snapshot)
            }
            Err(error) => {
                if current {
                    entries.remove(organization_id);
                }
                Err(error)
            }
        }
    }

    async fn ready(&self, organization_id: &str) -> Option<Arc<OwnershipSnapshot>> {
        match self.entries.read().await.get(organization_id) {
            Some(CacheSlot::Ready { snapshot, epoch })
                if self.settled_epoch(organization_id) == Some(*epoch) =>
            {
                Some(snapshot.clone())
            }
            _ => None,
        }
    }

    #[instrument(skip(self))]
    async fn populate(&self, organization_id: &str) -> DomainResult<OwnershipSnapshot> {
        let roles = with_deadline(
            self.upstream_timeout,
            "access.list_roles",
            self.access_service.list_roles(organization_id),
        )
        .await?;

        let owner_role_ids: HashSet<String> = roles
            .into_iter()
            .filter(|role| role.is_owner())
            .map(|role| role.role_id)
            .collect();

        if owner_role_ids.is_empty() {
            debug!("organization has no owner roles");
            return Ok(OwnershipSnapshot::default());
        }

        let users = with_deadline(
            self.upstream_timeout,
            "directory.get_users",
            self.directory_service.get_users(organization_id),
        )
        .await?;
        let user_count = users.len();

        let access_service = &self.access_service;
        let upstream_timeout = self.upstream_timeout;
        let assignments: Vec<(String, String)> = stream::iter(users)
            .map(|user| async move {
                let role_id = with_deadline(
                    upstream_timeout,
                    "access.get_user_role",
                    access_service.get_user_role(organization_id, &user.email),
                )
                .await?;
                Ok::<_, DomainError>((user.email, role_id))
            })
            .buffer_unordered(self.population_concurrency)
            .try_collect()
            .await?;

        let owner_users: HashMap<String, String> = assignments
            .into_iter()
            .filter(|(_, role_id)| owner_role_ids.contains(role_id))
            .collect();

        debug!(
            owner_roles = owner_role_ids.len(),
            owner_users = owner_users.len(),
            users = user_count,
            "ownership cache populated"
        );

        Ok(OwnershipSnapshot {
            owner_role_ids,
            owner_users,
        })
    }
}
