// SPDX-FileCopyrightText: 2026 Cloudway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for Cloudway application records.
//!
//! Provides WAL-mode SQLite storage with embedded migrations and a
//! single-writer connection via `tokio-rusqlite`, plus the
//! [`SqliteRecordStore`] implementation of the broker's record store.

pub mod database;
pub mod migrations;
pub mod records;

pub use database::Database;
pub use records::SqliteRecordStore;
