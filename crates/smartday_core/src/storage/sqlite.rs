//! SQLite-backed state storage.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections with required pragmas.
//! - Run schema migrations before handing out a usable storage.
//! - Store blobs in the `app_storage` table keyed by name.
//!
//! # Invariants
//! - Returned storages have migrations fully applied.
//! - `updated_at` holds Unix epoch milliseconds of the last write.

use super::migrations::apply_migrations;
use super::{StateStorage, StorageResult};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::{Duration, Instant};

/// `StateStorage` over a single SQLite connection.
pub struct SqliteStateStorage {
    conn: Connection,
}

impl SqliteStateStorage {
    /// Opens a SQLite database file and applies all pending migrations.
    ///
    /// # Side effects
    /// - Creates the file when missing.
    /// - Emits `storage_open` logging events with duration and status.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::bootstrap("file", || Connection::open(path))
    }

    /// Opens an in-memory SQLite database and applies all pending migrations.
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::bootstrap("memory", Connection::open_in_memory)
    }

    /// Borrows the underlying connection, mainly for diagnostics and tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn bootstrap(
        mode: &'static str,
        connect: impl FnOnce() -> rusqlite::Result<Connection>,
    ) -> StorageResult<Self> {
        let started_at = Instant::now();
        info!("event=storage_open module=storage status=start mode={mode}");

        let mut conn = match connect() {
            Ok(conn) => conn,
            Err(err) => {
                error!(
                    "event=storage_open module=storage status=error mode={} duration_ms={} error_code=storage_open_failed error={}",
                    mode,
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err.into());
            }
        };

        match configure_connection(&mut conn) {
            Ok(()) => {
                info!(
                    "event=storage_open module=storage status=ok mode={} duration_ms={}",
                    mode,
                    started_at.elapsed().as_millis()
                );
                Ok(Self { conn })
            }
            Err(err) => {
                error!(
                    "event=storage_open module=storage status=error mode={} duration_ms={} error_code=storage_bootstrap_failed error={}",
                    mode,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }
}

impl StateStorage for SqliteStateStorage {
    fn get_item(&self, name: &str) -> StorageResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM app_storage WHERE name = ?1;",
                [name],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_item(&mut self, name: &str, value: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO app_storage (name, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(name) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![name, value],
        )?;
        Ok(())
    }
}

fn configure_connection(conn: &mut Connection) -> StorageResult<()> {
    conn.busy_timeout(Duration::from_secs(5))?;
    apply_migrations(conn)?;
    Ok(())
}
