use std::future::Future;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use tracing::warn;

use crate::{config::AppConfig, error::AppResult};

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("connect to database")
}

/// Runs a whole transaction body, re-running it when it fails with a
/// transient store error. `attempts` is the total number of tries.
///
/// The body must open and commit its own transaction so a failed attempt
/// leaves nothing behind.
pub async fn with_retry<T, F, Fut>(attempts: u32, mut body: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match body().await {
            Err(e) if e.is_retryable() && attempt < attempts => {
                warn!(error = %e, attempt, "transient store error, retrying transaction");
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Opens a read-only transaction that sees a single snapshot of the store.
pub async fn begin_snapshot(db: &PgPool) -> AppResult<Transaction<'static, Postgres>> {
    let mut tx = db.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(&mut *tx)
        .await?;
    Ok(tx)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::error::AppError;

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let out = with_retry(3, move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(AppError::from(sqlx::Error::PoolTimedOut))
            } else {
                Ok(n)
            }
        })
        .await
        .unwrap();
        assert_eq!(out, 2);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_the_last_attempt() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let err = with_retry(2, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(AppError::from(sqlx::Error::PoolTimedOut))
        })
        .await
        .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn input_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let err = with_retry(5, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(AppError::conflict("already in cart"))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
