// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded database migrations using refinery.
//!
//! SQL files under `migrations/` are compiled into the binary via
//! `embed_migrations!` and applied every time a database is opened.

use cloudway_core::CloudwayError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Applies all pending migrations. Refinery records applied versions in its
/// own `refinery_schema_history` table.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), CloudwayError> {
    let report = embedded::migrations::runner()
        .run(conn)
        .map_err(|e| CloudwayError::Storage {
            source: format!("migration failed: {e}").into(),
        })?;
    for migration in report.applied_migrations() {
        tracing::debug!(version = migration.version(), name = migration.name(), "applied migration");
    }
    Ok(())
}
