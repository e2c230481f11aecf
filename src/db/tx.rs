use std::time::Duration;

use rusqlite::{Connection, ErrorCode, Transaction, TransactionBehavior};

use crate::errors::AppError;

const MAX_TX_RETRIES: u32 = 5;
const RETRY_BACKOFF_MS: u64 = 20;

/// Runs `f` inside a `BEGIN IMMEDIATE` transaction and commits on success.
///
/// Any error returned by `f` drops the transaction, which rolls back every
/// write it made. When SQLite reports the database as busy or locked, the
/// whole closure is re-run from scratch, so `f` must derive everything it
/// writes from what it reads inside the transaction.
///
/// The backoff sleeps the calling thread. Handlers call this while holding the
/// connection mutex on a tokio worker, so under contention from another
/// process one worker stalls for up to the sum of the backoffs (300 ms) plus
/// the connection's busy timeout on each attempt.
pub fn with_transaction<T, F>(conn: &mut Connection, mut f: F) -> Result<T, AppError>
where
    F: FnMut(&Transaction<'_>) -> Result<T, AppError>,
{
    let mut attempt = 0;
    loop {
        match run_once(conn, &mut f) {
            Err(AppError::Database(e)) if is_transient(&e) => {
                if attempt >= MAX_TX_RETRIES {
                    return Err(AppError::TransientConflict(e.to_string()));
                }
                attempt += 1;
                tracing::debug!(attempt, error = %e, "transaction conflicted, retrying");
                std::thread::sleep(Duration::from_millis(RETRY_BACKOFF_MS * attempt as u64));
            }
            other => return other,
        }
    }
}

fn run_once<T, F>(conn: &mut Connection, f: &mut F) -> Result<T, AppError>
where
    F: FnMut(&Transaction<'_>) -> Result<T, AppError>,
{
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

fn is_transient(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if matches!(err.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}
