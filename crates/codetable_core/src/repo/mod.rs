//! Repository layer contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define the Large-Code and Small-Code store contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Write paths call the model `validate()` before SQL mutations.
//! - Point lookups return `Ok(None)` for absent keys; deletes of absent keys
//!   succeed.
//! - Multi-row writes run inside one `IMMEDIATE` transaction and roll back
//!   as a whole on failure.

pub mod error;
pub mod example;
pub mod large_code_repo;
pub mod small_code_repo;

use crate::db::migrations::{current_user_version, latest_version};
use error::{RepoError, RepoResult};
use rusqlite::Connection;
use serde::Deserialize;

/// Which operations propagate from a large code to its children.
///
/// The default cascades both save and delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CascadePolicy {
    /// Persist attached children when the parent is saved.
    pub save: bool,
    /// Remove children when the parent is deleted.
    pub delete: bool,
}

impl CascadePolicy {
    pub const ALL: Self = Self {
        save: true,
        delete: true,
    };

    pub const NONE: Self = Self {
        save: false,
        delete: false,
    };
}

impl Default for CascadePolicy {
    fn default() -> Self {
        Self::ALL
    }
}

const LARGE_CODE_COLUMNS: &[&str] = &[
    "code",
    "name",
    "category_division",
    "sort_sequence",
    "use_flag",
    "registered_at",
];

const SMALL_CODE_COLUMNS: &[&str] = &[
    "large_code",
    "small_code",
    "name",
    "sort_sequence",
    "use_flag",
    "memo",
];

/// Rejects connections that were not opened through `db::open_db*`.
pub(crate) fn ensure_code_tables_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for (table, columns) in [
        ("large_codes", LARGE_CODE_COLUMNS),
        ("small_codes", SMALL_CODE_COLUMNS),
    ] {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
