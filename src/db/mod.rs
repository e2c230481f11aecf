pub mod migrations;
pub mod queries;
pub mod tx;

use std::time::Duration;

use anyhow::Context;
use chrono::{NaiveDateTime, SubsecRound};
use rusqlite::Connection;

pub use tx::with_transaction;

pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Timestamp layout used for every stored datetime (UTC).
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    init_db_with_timeout(path, DEFAULT_BUSY_TIMEOUT_MS)
}

pub fn init_db_with_timeout(path: &str, busy_timeout_ms: u64) -> anyhow::Result<Connection> {
    let conn = Connection::open(path).context("failed to open database")?;

    conn.busy_timeout(Duration::from_millis(busy_timeout_ms))
        .context("failed to set busy timeout")?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        .context("failed to set database pragmas")?;

    migrations::run_migrations(&conn)?;

    Ok(conn)
}

pub fn fmt_ts(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

pub fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc().trunc_subsecs(0)
}
