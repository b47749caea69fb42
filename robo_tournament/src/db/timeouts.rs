//! Database query timeout helpers
//!
//! Bounds every PostgreSQL round-trip so a stalled connection surfaces as
//! [`TournamentError::Timeout`] instead of hanging the caller.

use std::time::Duration;
use tokio::time::timeout;

use crate::tournament::{TournamentError, TournamentResult};

/// Default timeout for single queries (5 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for multi-statement transactions (10 seconds)
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Execute a database future with a timeout
///
/// # Arguments
///
/// * `duration` - Timeout duration
/// * `future` - Async operation to execute
///
/// # Returns
///
/// * `TournamentResult<T>` - Result, database error, or timeout error
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> TournamentResult<T>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(duration, future).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(TournamentError::Database(e)),
        Err(_) => Err(TournamentError::Timeout(duration)),
    }
}

/// Execute a single query with the default timeout (5 seconds)
pub async fn with_default_timeout<F, T>(future: F) -> TournamentResult<T>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    with_timeout(DEFAULT_QUERY_TIMEOUT, future).await
}

/// Run a whole transaction body under the transaction timeout.
///
/// Unlike [`with_timeout`] the body already yields tournament errors, since
/// precondition checks happen inside the transaction.
pub async fn with_transaction_timeout<F, T>(future: F) -> TournamentResult<T>
where
    F: std::future::Future<Output = TournamentResult<T>>,
{
    match timeout(DEFAULT_TRANSACTION_TIMEOUT, future).await {
        Ok(result) => result,
        Err(_) => Err(TournamentError::Timeout(DEFAULT_TRANSACTION_TIMEOUT)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_timeout_constants() {
        assert_eq!(DEFAULT_QUERY_TIMEOUT.as_secs(), 5);
        assert_eq!(DEFAULT_TRANSACTION_TIMEOUT.as_secs(), 10);
    }

    #[tokio::test]
    async fn test_with_timeout_passes_through_errors() {
        let result: TournamentResult<()> =
            with_default_timeout(async { Err(sqlx::Error::RowNotFound) }).await;
        assert!(matches!(result, Err(TournamentError::Database(_))));
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result: TournamentResult<()> = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(TournamentError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_transaction_timeout_keeps_domain_errors() {
        let result: TournamentResult<()> = with_transaction_timeout(async {
            Err(TournamentError::InvalidGroupSize(1))
        })
        .await;
        assert!(matches!(result, Err(TournamentError::InvalidGroupSize(1))));
    }
}
