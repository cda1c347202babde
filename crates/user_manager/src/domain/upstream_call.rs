use common::domain::{DomainError, DomainResult};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Await a collaborator call, failing with `DeadlineExceeded` once `timeout`
/// elapses. Errors returned by the call itself pass through unchanged.
pub async fn with_deadline<T, F>(timeout: Duration, call: &'static str, future: F) -> DomainResult<T>
where
    F: Future<Output = DomainResult<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => {
            warn!(call, timeout_ms = timeout.as_millis() as u64, "upstream call exceeded deadline");
            Err(DomainError::DeadlineExceeded(call.to_string()))
        }
    }
}
