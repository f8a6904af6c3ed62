// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Application records in the `applications` table.
//!
//! Plugin tags are stored as a JSON array and timestamps as RFC 3339 text.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};

use cloudway_core::{ApplicationRecord, CloudwayError, UserRecordStore};

use crate::database::{Database, map_tr_err};

/// A row as stored, before decoding.
struct Row {
    name: String,
    plugins: String,
    scaling: u32,
    created_at: String,
}

impl Row {
    fn from_sql(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get(0)?,
            plugins: row.get(1)?,
            scaling: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    fn decode(self) -> Result<ApplicationRecord, CloudwayError> {
        let plugins: Vec<String> =
            serde_json::from_str(&self.plugins).map_err(|e| CloudwayError::Storage {
                source: format!("application {}: corrupt plugin list: {e}", self.name).into(),
            })?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| CloudwayError::Storage {
                source: format!("application {}: corrupt timestamp: {e}", self.name).into(),
            })?
            .with_timezone(&Utc);
        Ok(ApplicationRecord {
            name: self.name,
            plugins,
            scaling: self.scaling,
            created_at,
        })
    }
}

/// SQLite-backed [`UserRecordStore`].
pub struct SqliteRecordStore {
    db: Database,
}

impl SqliteRecordStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Releases the database, for example to close it on shutdown.
    pub fn into_database(self) -> Database {
        self.db
    }
}

#[async_trait]
impl UserRecordStore for SqliteRecordStore {
    async fn get_application(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ApplicationRecord>, CloudwayError> {
        let namespace = namespace.to_string();
        let name = name.to_string();
        let row = self
            .db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT name, plugins, scaling, created_at \
                     FROM applications WHERE namespace = ?1 AND name = ?2",
                )?;
                stmt.query_row(params![namespace, name], Row::from_sql)
                    .optional()
            })
            .await
            .map_err(map_tr_err)?;
        row.map(Row::decode).transpose()
    }

    async fn list_applications(
        &self,
        namespace: &str,
    ) -> Result<Vec<ApplicationRecord>, CloudwayError> {
        let namespace = namespace.to_string();
        let rows = self
            .db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT name, plugins, scaling, created_at \
                     FROM applications WHERE namespace = ?1 ORDER BY name",
                )?;
                let rows = stmt.query_map(params![namespace], Row::from_sql)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await
            .map_err(map_tr_err)?;
        rows.into_iter().map(Row::decode).collect()
    }

    async fn put_application(
        &self,
        namespace: &str,
        record: &ApplicationRecord,
    ) -> Result<(), CloudwayError> {
        let plugins = serde_json::to_string(&record.plugins).map_err(|e| {
            CloudwayError::Internal(format!("cannot encode plugin list: {e}"))
        })?;
        let namespace = namespace.to_string();
        let name = record.name.clone();
        let scaling = record.scaling;
        let created_at = record.created_at.to_rfc3339();

        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO applications \
                     (namespace, name, plugins, scaling, created_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![namespace, name, plugins, scaling, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn remove_application(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<bool, CloudwayError> {
        let namespace = namespace.to_string();
        let name = name.to_string();
        let deleted = self
            .db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM applications WHERE namespace = ?1 AND name = ?2",
                    params![namespace, name],
                )
            })
            .await
            .map_err(map_tr_err)?;
        Ok(deleted > 0)
    }
}
