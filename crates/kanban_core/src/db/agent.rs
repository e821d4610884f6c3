//! Uniform statement handle over a plain connection or an open transaction.
//!
//! # Responsibility
//! - Route `prepare`/`exec`/`query_row` to whichever handle is bound.
//! - Own begin/commit/rollback for multi-statement board writes.
//!
//! # Invariants
//! - Write transactions are opened `IMMEDIATE`, so the writer lock is held
//!   from the first sibling-order read until commit.
//! - Multi-query reads run in one `DEFERRED` transaction and observe a single
//!   committed snapshot.
//! - Statements borrow the agent; they cannot outlive or cross transactions.
//! - Dropping an uncommitted transaction agent rolls it back.

use super::{DbError, DbResult};
use log::{debug, error, info, warn};
use rusqlite::{Connection, Params, Row, Statement, Transaction, TransactionBehavior};
use std::fmt::Display;
use std::time::Instant;

/// Statement executor bound to a connection or to one open transaction.
pub enum Agent<'conn> {
    /// Autocommit access; each statement is its own transaction.
    Connection(&'conn Connection),
    /// All statements join the same transaction.
    Transaction(Transaction<'conn>),
}

impl<'conn> Agent<'conn> {
    /// Binds an autocommit agent to `conn`.
    pub fn connection(conn: &'conn Connection) -> Self {
        Self::Connection(conn)
    }

    /// Opens an immediate transaction on `conn` and binds an agent to it.
    pub fn begin(conn: &'conn Connection) -> DbResult<Self> {
        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
        Ok(Self::Transaction(tx))
    }

    /// Opens a deferred transaction for a group of reads.
    pub fn begin_read(conn: &'conn Connection) -> DbResult<Self> {
        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Deferred)?;
        Ok(Self::Transaction(tx))
    }

    pub fn is_transaction(&self) -> bool {
        matches!(self, Self::Transaction(_))
    }

    pub fn prepare(&self, sql: &str) -> rusqlite::Result<Statement<'_>> {
        self.handle().prepare(sql)
    }

    /// Executes one statement and returns the affected row count.
    pub fn exec<P: Params>(&self, sql: &str, params: P) -> rusqlite::Result<usize> {
        self.handle().execute(sql, params)
    }

    pub fn query_row<T, P, F>(&self, sql: &str, params: P, f: F) -> rusqlite::Result<T>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.handle().query_row(sql, params, f)
    }

    /// Commits a transaction agent. No-op for connection agents.
    pub fn commit(self) -> DbResult<()> {
        match self {
            Self::Connection(_) => Ok(()),
            Self::Transaction(tx) => tx.commit().map_err(DbError::from),
        }
    }

    /// Rolls back a transaction agent. No-op for connection agents.
    pub fn rollback(self) -> DbResult<()> {
        match self {
            Self::Connection(_) => Ok(()),
            Self::Transaction(tx) => tx.rollback().map_err(DbError::from),
        }
    }

    fn handle(&self) -> &Connection {
        match self {
            Self::Connection(conn) => *conn,
            Self::Transaction(tx) => &**tx,
        }
    }
}

/// Runs `work` inside one immediate transaction.
///
/// Commits when `work` succeeds. On the first error the transaction is rolled
/// back and that error is returned unchanged.
///
/// # Side effects
/// - Emits `board_tx` logging events with operation name, status and duration.
pub fn run_in_transaction<T, E, F>(conn: &Connection, operation: &'static str, work: F) -> Result<T, E>
where
    F: FnOnce(&Agent<'_>) -> Result<T, E>,
    E: From<DbError> + Display,
{
    let started_at = Instant::now();
    debug!("event=board_tx module=db op={operation} status=start");

    let agent = match Agent::begin(conn) {
        Ok(agent) => agent,
        Err(err) => {
            error!(
                "event=board_tx module=db op={} status=error duration_ms={} error_code=tx_begin_failed error={}",
                operation,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match work(&agent) {
        Ok(value) => {
            if let Err(err) = agent.commit() {
                error!(
                    "event=board_tx module=db op={} status=error duration_ms={} error_code=tx_commit_failed error={}",
                    operation,
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err.into());
            }
            info!(
                "event=board_tx module=db op={} status=ok duration_ms={}",
                operation,
                started_at.elapsed().as_millis()
            );
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = agent.rollback() {
                error!(
                    "event=board_tx module=db op={} status=error error_code=tx_rollback_failed error={}",
                    operation, rollback_err
                );
            }
            warn!(
                "event=board_tx module=db op={} status=rolled_back duration_ms={} error={}",
                operation,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

/// Runs read-only `work` inside one deferred transaction, so every query it
/// issues sees the same committed state.
pub fn read_in_snapshot<T, E, F>(conn: &Connection, work: F) -> Result<T, E>
where
    F: FnOnce(&Agent<'_>) -> Result<T, E>,
    E: From<DbError>,
{
    let agent = Agent::begin_read(conn)?;
    let value = work(&agent)?;
    agent.commit()?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::{read_in_snapshot, run_in_transaction, Agent};
    use crate::db::{open_db_in_memory, DbError};

    fn project_count(conn: &rusqlite::Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM projects;", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn committed_transaction_is_visible() {
        let conn = open_db_in_memory().unwrap();
        let agent = Agent::begin(&conn).unwrap();
        assert!(agent.is_transaction());
        agent
            .exec("INSERT INTO projects (id, name) VALUES ('p1', 'P');", [])
            .unwrap();
        agent.commit().unwrap();
        assert_eq!(project_count(&conn), 1);
    }

    #[test]
    fn dropped_transaction_rolls_back() {
        let conn = open_db_in_memory().unwrap();
        {
            let agent = Agent::begin(&conn).unwrap();
            agent
                .exec("INSERT INTO projects (id, name) VALUES ('p1', 'P');", [])
                .unwrap();
        }
        assert_eq!(project_count(&conn), 0);
    }

    #[test]
    fn run_in_transaction_rolls_back_on_error() {
        let conn = open_db_in_memory().unwrap();
        let result: Result<(), DbError> = run_in_transaction(&conn, "test", |agent| {
            agent.exec("INSERT INTO projects (id, name) VALUES ('p1', 'P');", [])?;
            agent.exec("INSERT INTO projects (id, name) VALUES ('p1', 'again');", [])?;
            Ok(())
        });
        assert!(matches!(result, Err(DbError::Sqlite(_))));
        assert_eq!(project_count(&conn), 0);
    }

    #[test]
    fn connection_agent_autocommits() {
        let conn = open_db_in_memory().unwrap();
        let agent = Agent::connection(&conn);
        assert!(!agent.is_transaction());
        let changed = agent
            .exec("INSERT INTO projects (id, name) VALUES ('p1', 'P');", [])
            .unwrap();
        assert_eq!(changed, 1);
        agent.rollback().unwrap();
        assert_eq!(project_count(&conn), 1);
    }

    #[test]
    fn snapshot_read_sees_committed_rows_and_releases_lock() {
        let conn = open_db_in_memory().unwrap();
        conn.execute("INSERT INTO projects (id, name) VALUES ('p1', 'P');", [])
            .unwrap();

        let count: Result<i64, DbError> = read_in_snapshot(&conn, |agent| {
            assert!(agent.is_transaction());
            Ok(agent.query_row("SELECT COUNT(*) FROM projects;", [], |row| row.get(0))?)
        });
        assert_eq!(count.unwrap(), 1);
        assert!(conn.is_autocommit());
    }
}
