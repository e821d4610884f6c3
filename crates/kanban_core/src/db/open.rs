//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas required by the ordering engine.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON` (cascading deletes depend on it).
//! - Returned connections have migrations fully applied.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{error, info, warn};
use rusqlite::Connection;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a SQLite database file and applies all pending migrations.
///
/// # Side effects
/// - Creates the file when it does not exist.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_with("file", || Connection::open(path.as_ref()))
}

/// Opens an in-memory SQLite database and applies all pending migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with("memory", Connection::open_in_memory)
}

/// Opens a database file, retrying with a fixed backoff.
///
/// Startup-only helper: at most `attempts` tries are made (a value of zero is
/// treated as one). Schema version mismatches are not retried.
///
/// # Errors
/// - `DbError::UnsupportedSchemaVersion` immediately.
/// - `DbError::ConnectExhausted` wrapping the last failure once attempts run out.
pub fn open_db_with_retry(
    path: impl AsRef<Path>,
    attempts: u32,
    backoff: Duration,
) -> DbResult<Connection> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match open_db(path.as_ref()) {
            Ok(conn) => return Ok(conn),
            Err(err @ DbError::UnsupportedSchemaVersion { .. }) => return Err(err),
            Err(err) if attempt >= attempts => {
                return Err(DbError::ConnectExhausted {
                    attempts,
                    last: Box::new(err),
                });
            }
            Err(err) => {
                warn!(
                    "event=db_connect_retry module=db status=retry attempt={} max_attempts={} backoff_ms={} error={}",
                    attempt,
                    attempts,
                    backoff.as_millis(),
                    err
                );
                thread::sleep(backoff);
                attempt += 1;
            }
        }
    }
}

fn open_with(
    mode: &'static str,
    opener: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let mut conn = match opener() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_migrations(conn)?;
    Ok(())
}
