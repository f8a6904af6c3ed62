// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup and WAL mode.
//!
//! All statements run on tokio-rusqlite's single background thread, so writes
//! are serialized without further locking.

use std::path::Path;
use std::time::Duration;

use cloudway_core::CloudwayError;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

use crate::migrations::run_migrations;

/// An open, migrated SQLite database.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path` and applies pending
    /// migrations. Parent directories are created.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, CloudwayError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(CloudwayError::io)?;
        }
        let conn = Connection::open(path).await.map_err(|e| CloudwayError::Storage {
            source: Box::new(e),
        })?;
        let db = Self::setup(conn, true).await?;
        info!(path = %path.display(), "database opened");
        Ok(db)
    }

    /// Opens a private in-memory database, mainly for tests.
    pub async fn open_in_memory() -> Result<Self, CloudwayError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| CloudwayError::Storage {
                source: Box::new(e),
            })?;
        Self::setup(conn, false).await
    }

    async fn setup(conn: Connection, wal: bool) -> Result<Self, CloudwayError> {
        conn.call(move |conn| {
            if wal {
                let mode: String = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                    row.get(0)
                })?;
                debug!(journal_mode = %mode, "journal mode set");
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.busy_timeout(Duration::from_secs(5))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| Ok::<_, rusqlite::Error>(run_migrations(conn)))
            .await
            .map_err(map_tr_err)??;

        Ok(Self { conn })
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoints the WAL and closes the connection.
    pub async fn close(self) -> Result<(), CloudwayError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(|e| CloudwayError::Storage {
            source: Box::new(e),
        })
    }
}

/// Converts a tokio-rusqlite error into `CloudwayError::Storage`.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> CloudwayError {
    CloudwayError::Storage {
        source: Box::new(e),
    }
}
