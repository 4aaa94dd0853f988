//! Storage gateway
//!
//! Hands out SQLite connections to the catalog database and runs units of
//! work inside transactions. The gateway holds no connection itself: every
//! caller opens its own, so concurrent callers never contend on an
//! in-process lock, only on the database.
//!
//! ## Locking
//!
//! SQLite locks the whole database rather than rows. A read-write
//! transaction begins `IMMEDIATE`, taking the write lock before its first
//! read; rows it reads are therefore held exclusively until commit. Other
//! writers wait up to the configured busy timeout. Read-only transactions
//! begin `DEFERRED` and see a stable WAL snapshot.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::CatalogResult;
use crate::schema::{Dialect, LockMode};

/// How a transaction intends to use the rows it reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMode {
    ReadOnly,
    ReadWrite,
}

/// Connection factory for the catalog database
#[derive(Debug, Clone)]
pub struct Gateway {
    path: PathBuf,
    busy_timeout: Duration,
    dialect: Dialect,
}

impl Gateway {
    /// Open the database file named by the configuration
    ///
    /// Switches the database to WAL journaling so readers and the single
    /// writer do not block each other.
    pub fn open(config: &Config) -> CatalogResult<Self> {
        let gateway = Self {
            path: config.database_path(),
            busy_timeout: config.busy_timeout(),
            dialect: Dialect::Sqlite,
        };

        let conn = gateway.connect()?;
        let journal: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        debug!("Opened catalog database {:?} (journal={})", gateway.path, journal);

        Ok(gateway)
    }

    /// Open a new connection with foreign keys enforced
    pub fn connect(&self) -> CatalogResult<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    /// Run `work` in one transaction on a fresh connection
    ///
    /// Commits when `work` succeeds. On any error the transaction is rolled
    /// back before the error is returned; a failed rollback is only logged.
    pub fn transaction<T, F>(&self, mode: TxMode, op: &str, work: F) -> CatalogResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> CatalogResult<T>,
    {
        let mut conn = self.connect()?;
        run_transaction(&mut conn, mode, op, work)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Row-lock hint to append to a `SELECT`
    pub fn lock_hint(&self, mode: LockMode) -> &'static str {
        self.dialect.lock_hint(mode)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Run `work` in one transaction on an existing connection
pub fn run_transaction<T, F>(
    conn: &mut Connection,
    mode: TxMode,
    op: &str,
    work: F,
) -> CatalogResult<T>
where
    F: FnOnce(&Transaction<'_>) -> CatalogResult<T>,
{
    let behavior = match mode {
        TxMode::ReadOnly => TransactionBehavior::Deferred,
        TxMode::ReadWrite => TransactionBehavior::Immediate,
    };
    let tx = conn.transaction_with_behavior(behavior)?;
    debug!("{}: begin ({:?})", op, mode);

    match work(&tx) {
        Ok(value) => {
            tx.commit()?;
            debug!("{}: commit", op);
            Ok(value)
        }
        Err(err) => {
            match tx.rollback() {
                Ok(()) => debug!("{}: rollback after {}", op, err),
                Err(rollback_err) => warn!("{}: rollback failed: {}", op, rollback_err),
            }
            Err(err)
        }
    }
}
