use std::future::Future;
use std::time::Duration;

use crate::app_error::{AppError, AppResult};

/// Run an outbound call (datastore or processor) under a hard deadline.
/// Expiry surfaces as the transient `AppError::Timeout`.
pub async fn bounded<T, F>(limit: Duration, what: &'static str, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                call = what,
                timeout_ms = limit.as_millis() as u64,
                "Outbound call timed out"
            );
            Err(AppError::Timeout(what))
        }
    }
}
