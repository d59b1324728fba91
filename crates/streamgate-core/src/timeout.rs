//! Bounded remote calls.

use std::future::Future;
use std::time::Duration;

use crate::error::RemoteError;

/// Await a collaborator call, failing with [`RemoteError::Timeout`] when it
/// does not finish within `limit`.
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, RemoteError>
where
    F: Future<Output = Result<T, RemoteError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(RemoteError::Timeout {
            ms: limit.as_millis() as u64,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn slow_call_times_out() {
        let result: Result<(), _> = bounded(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert_eq!(result, Err(RemoteError::Timeout { ms: 10 }));
    }

    #[tokio::test]
    async fn fast_call_passes_through() {
        let result = bounded(Duration::from_secs(1), async { Ok::<_, RemoteError>(7) }).await;
        assert_eq!(result, Ok(7));
    }
}
