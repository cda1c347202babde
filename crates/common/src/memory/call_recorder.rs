use crate::domain::{DomainError, DomainResult};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::Mutex;

/// Per-method call bookkeeping shared by the in-memory collaborators.
#[derive(Debug, Default)]
pub struct CallRecorder {
    latency: Option<Duration>,
    counts: Mutex<HashMap<&'static str, usize>>,
    failures: Mutex<HashSet<&'static str>>,
}

impl CallRecorder {
    pub fn new(latency: Option<Duration>) -> Self {
        Self {
            latency,
            ..Default::default()
        }
    }

    /// Count the call, apply latency, and fail if a failure was injected
    pub async fn record(&self, method: &'static str) -> DomainResult<()> {
        *self.counts.lock().await.entry(method).or_default() += 1;

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.failures.lock().await.contains(method) {
            return Err(DomainError::UpstreamError(anyhow::anyhow!(
                "injected failure in {}",
                method
            )));
        }
        Ok(())
    }

    pub async fn calls(&self, method: &str) -> usize {
        self.counts.lock().await.get(method).copied().unwrap_or(0)
    }

    /// Total calls across the given methods
    pub async fn calls_to(&self, methods: &[&str]) -> usize {
        let counts = self.counts.lock().await;
        methods
            .iter()
            .map(|method| counts.get(method).copied().unwrap_or(0))
            .sum()
    }

    /// Make every subsequent call to `method` fail until cleared
    pub async fn fail(&self, method: &'static str) {
        self.failures.lock().await.insert(method);
    }

    pub async fn clear_failures(&self) {
        self.failures.lock().await.clear();
    }
}
