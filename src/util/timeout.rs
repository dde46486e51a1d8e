//! Deadline helper for tool invocations.

use std::future::Future;
use std::time::Duration;

use crate::error::TetherError;

/// Await `future`, failing with [`TetherError::Timeout`] once `limit` elapses.
/// `None` waits indefinitely.
pub async fn bounded<T>(
    limit: Option<Duration>,
    future: impl Future<Output = Result<T, TetherError>>,
) -> Result<T, TetherError> {
    let Some(limit) = limit else {
        return future.await;
    };
    tokio::time::timeout(limit, future)
        .await
        .unwrap_or_else(|_| Err(TetherError::Timeout(limit.as_millis() as u64)))
}
