//! Small-code repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over `small_codes` addressed by `(large_code, small_code)`.
//! - Provide parent-filtered and example-based scans.
//!
//! # Invariants
//! - `save` is an upsert: an existing key is updated in place, never
//!   duplicated.
//! - Listings are ordered `large_code ASC, sort_sequence ASC, small_code ASC`.
//! - Foreign key failures (unknown parent) propagate unchanged.

use crate::model::small_code::{SmallCode, SmallCodeKey};
use crate::model::use_flag::UseFlag;
use crate::repo::ensure_code_tables_ready;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::example::{ExampleFilter, ExampleMatcher, SmallCodeExample};
use log::{debug, info};
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};

const SMALL_CODE_SELECT_SQL: &str = "SELECT
    large_code,
    small_code,
    name,
    sort_sequence,
    use_flag,
    memo
FROM small_codes";

const SMALL_CODE_ORDER_SQL: &str = " ORDER BY large_code ASC, sort_sequence ASC, small_code ASC";

/// Repository interface for the subcategory level.
pub trait SmallCodeRepository {
    /// Inserts or updates one small code and returns the stored record.
    fn save(&self, code: &SmallCode) -> RepoResult<SmallCode>;
    /// Upserts every record in one transaction.
    fn save_all(&self, codes: &[SmallCode]) -> RepoResult<Vec<SmallCode>>;
    fn find_by_id(&self, key: &SmallCodeKey) -> RepoResult<Option<SmallCode>>;
    /// Removes one row. Absent keys are not an error.
    fn delete_by_id(&self, key: &SmallCodeKey) -> RepoResult<()>;
    fn find_all(&self) -> RepoResult<Vec<SmallCode>>;
    /// Lists the children of one large code.
    fn find_all_by_large_code(&self, large_code: &str) -> RepoResult<Vec<SmallCode>>;
    /// Lists rows matching every populated field of `example`.
    fn find_by_example(
        &self,
        example: &SmallCodeExample,
        matcher: &ExampleMatcher,
    ) -> RepoResult<Vec<SmallCode>>;
}

/// SQLite-backed small-code repository.
pub struct SqliteSmallCodeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSmallCodeRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_code_tables_ready(conn)?;
        Ok(Self { conn })
    }
}

impl SmallCodeRepository for SqliteSmallCodeRepository<'_> {
    fn save(&self, code: &SmallCode) -> RepoResult<SmallCode> {
        code.validate()?;
        upsert_small_code(self.conn, code)?;
        let stored = load_required_small_code(self.conn, &code.key())?;
        info!(
            "event=small_code_save module=repo status=ok large_code={} small_code={}",
            stored.large_code, stored.small_code
        );
        Ok(stored)
    }

    fn save_all(&self, codes: &[SmallCode]) -> RepoResult<Vec<SmallCode>> {
        for code in codes {
            code.validate()?;
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut stored = Vec::with_capacity(codes.len());
        for code in codes {
            upsert_small_code(&tx, code)?;
            stored.push(load_required_small_code(&tx, &code.key())?);
        }
        tx.commit()?;

        info!(
            "event=small_code_save module=repo status=ok mode=batch count={}",
            stored.len()
        );
        Ok(stored)
    }

    fn find_by_id(&self, key: &SmallCodeKey) -> RepoResult<Option<SmallCode>> {
        load_small_code(self.conn, key)
    }

    fn delete_by_id(&self, key: &SmallCodeKey) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM small_codes
             WHERE large_code = ?1
               AND small_code = ?2;",
            params![key.large_code.as_str(), key.small_code.as_str()],
        )?;
        info!("event=small_code_delete module=repo status=ok key={key} removed={changed}");
        Ok(())
    }

    fn find_all(&self) -> RepoResult<Vec<SmallCode>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SMALL_CODE_SELECT_SQL}{SMALL_CODE_ORDER_SQL};"))?;
        let mut rows = stmt.query([])?;
        collect_small_codes(&mut rows)
    }

    fn find_all_by_large_code(&self, large_code: &str) -> RepoResult<Vec<SmallCode>> {
        load_children(self.conn, large_code)
    }

    fn find_by_example(
        &self,
        example: &SmallCodeExample,
        matcher: &ExampleMatcher,
    ) -> RepoResult<Vec<SmallCode>> {
        let filter = ExampleFilter::build(example, matcher);
        let sql = format!(
            "{SMALL_CODE_SELECT_SQL}{}{SMALL_CODE_ORDER_SQL};",
            filter.where_clause()
        );
        debug!(
            "event=small_code_find_by_example module=repo predicates={}",
            filter.conditions.len()
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(filter.values))?;
        collect_small_codes(&mut rows)
    }
}

/// Inserts `code` or merges its fields into the existing row with the same key.
pub(crate) fn upsert_small_code(conn: &Connection, code: &SmallCode) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO small_codes (
            large_code,
            small_code,
            name,
            sort_sequence,
            use_flag,
            memo
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT (large_code, small_code) DO UPDATE SET
            name = excluded.name,
            sort_sequence = excluded.sort_sequence,
            use_flag = excluded.use_flag,
            memo = excluded.memo;",
        params![
            code.large_code.as_str(),
            code.small_code.as_str(),
            code.name.as_str(),
            code.sort_sequence,
            code.use_flag.as_str(),
            code.memo.as_deref(),
        ],
    )?;
    Ok(())
}

/// Loads the ordered children of one large code.
pub(crate) fn load_children(conn: &Connection, large_code: &str) -> RepoResult<Vec<SmallCode>> {
    let mut stmt = conn.prepare(&format!(
        "{SMALL_CODE_SELECT_SQL}
         WHERE large_code = ?1
         ORDER BY sort_sequence ASC, small_code ASC;"
    ))?;
    let mut rows = stmt.query([large_code])?;
    collect_small_codes(&mut rows)
}

/// Parses the `use_flag` column, rejecting anything but `Y`/`N`.
pub(crate) fn parse_use_flag(value: &str, column: &str) -> RepoResult<UseFlag> {
    UseFlag::parse(value)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid use flag `{value}` in {column}")))
}

fn load_small_code(conn: &Connection, key: &SmallCodeKey) -> RepoResult<Option<SmallCode>> {
    let mut stmt = conn.prepare(&format!(
        "{SMALL_CODE_SELECT_SQL}
         WHERE large_code = ?1
           AND small_code = ?2;"
    ))?;
    let mut rows = stmt.query(params![key.large_code.as_str(), key.small_code.as_str()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_small_code_row(row)?));
    }
    Ok(None)
}

fn load_required_small_code(conn: &Connection, key: &SmallCodeKey) -> RepoResult<SmallCode> {
    load_small_code(conn, key)?.ok_or_else(|| {
        RepoError::InvalidData(format!("small code `{key}` missing right after save"))
    })
}

fn collect_small_codes(rows: &mut rusqlite::Rows<'_>) -> RepoResult<Vec<SmallCode>> {
    let mut codes = Vec::new();
    while let Some(row) = rows.next()? {
        codes.push(parse_small_code_row(row)?);
    }
    Ok(codes)
}

fn parse_small_code_row(row: &Row<'_>) -> RepoResult<SmallCode> {
    let use_flag_text: String = row.get("use_flag")?;
    let code = SmallCode {
        large_code: row.get("large_code")?,
        small_code: row.get("small_code")?,
        name: row.get("name")?,
        sort_sequence: row.get("sort_sequence")?,
        use_flag: parse_use_flag(&use_flag_text, "small_codes.use_flag")?,
        memo: row.get("memo")?,
    };
    code.validate()?;
    Ok(code)
}
