//! Deadline wrapper for provider attempts.
//!
//! On expiry the wrapped future is dropped, not detached: any in-flight
//! request it owns is cancelled and its connection released.

use std::future::Future;
use std::time::Duration;

use crate::data_source::SourceError;

/// Runs `call` under `budget`. `None` runs it to completion.
///
/// # Errors
///
/// Returns the call's own error, or a [`SourceError`] of kind
/// [`Timeout`](crate::SourceErrorKind::Timeout) when the budget elapses first.
pub async fn with_timeout<T, F>(budget: Option<Duration>, call: F) -> Result<T, SourceError>
where
    F: Future<Output = Result<T, SourceError>>,
{
    let Some(budget) = budget else {
        return call.await;
    };

    match tokio::time::timeout(budget, call).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::timeout(format!(
            "no response within {} ms",
            budget.as_millis()
        ))),
    }
}
