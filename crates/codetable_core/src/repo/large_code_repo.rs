//! Large-code repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over `large_codes`.
//! - Apply the cascade policy to attached small codes on save and delete.
//! - Offer eager variants that read parents and children in one query.
//!
//! # Invariants
//! - A cascaded save writes the parent row and every child row inside one
//!   transaction; any failure leaves neither behind.
//! - Cascaded saves never remove stored children missing from the
//!   in-memory collection.
//! - `registered_at` is set on insert and left untouched by updates.
//! - Listings are ordered `sort_sequence ASC, code ASC`; children are
//!   ordered `sort_sequence ASC, small_code ASC`.

use crate::model::large_code::LargeCode;
use crate::model::small_code::SmallCode;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::small_code_repo::{load_children, parse_use_flag, upsert_small_code};
use crate::repo::{ensure_code_tables_ready, CascadePolicy};
use log::{debug, info};
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::collections::BTreeSet;

const LARGE_CODE_SELECT_SQL: &str = "SELECT
    code,
    name,
    category_division,
    sort_sequence,
    use_flag,
    registered_at
FROM large_codes";

/// Keys bound per `IN (...)` lookup, well under SQLite's variable limit.
const FIND_BY_ID_BATCH_SIZE: usize = 500;

const LARGE_CODE_ORDER_SQL: &str = " ORDER BY sort_sequence ASC, code ASC";

const LARGE_CODE_GRAPH_SQL: &str = "SELECT
    l.code AS code,
    l.name AS name,
    l.category_division AS category_division,
    l.sort_sequence AS sort_sequence,
    l.use_flag AS use_flag,
    l.registered_at AS registered_at,
    s.small_code AS child_small_code,
    s.name AS child_name,
    s.sort_sequence AS child_sort_sequence,
    s.use_flag AS child_use_flag,
    s.memo AS child_memo
FROM large_codes l
LEFT JOIN small_codes s ON s.large_code = l.code";

const LARGE_CODE_GRAPH_ORDER_SQL: &str =
    " ORDER BY l.sort_sequence ASC, l.code ASC, s.sort_sequence ASC, s.small_code ASC";

/// Repository interface for the category level.
pub trait LargeCodeRepository {
    /// Inserts or updates one large code, cascading to attached children
    /// when the policy allows. Returns the stored graph.
    fn save(&self, code: &LargeCode) -> RepoResult<LargeCode>;
    /// Saves every record in one transaction.
    fn save_all(&self, codes: &[LargeCode]) -> RepoResult<Vec<LargeCode>>;
    /// Point lookup. Children are read with a second query.
    fn find_by_id(&self, code: &str) -> RepoResult<Option<LargeCode>>;
    /// Returns the found subset; unknown codes are skipped.
    fn find_all_by_id(&self, codes: &[&str]) -> RepoResult<Vec<LargeCode>> {
        let unique: Vec<&str> = codes
            .iter()
            .copied()
            .collect::<BTreeSet<&str>>()
            .into_iter()
            .collect();

        let mut found = Vec::new();
        for batch in unique.chunks(FIND_BY_ID_BATCH_SIZE) {
            let placeholders = vec!["?"; batch.len()].join(", ");
            let sql = format!("{LARGE_CODE_SELECT_SQL} WHERE code IN ({placeholders});");
            let mut stmt = self.conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(batch.iter()))?;
            while let Some(row) = rows.next()? {
                found.push(parse_large_code_row(row)?);
            }
        }
        // Batches are unordered relative to each other; BINARY collation on
        // `code` matches byte-wise `String` ordering.
        found.sort_by(|left, right| {
            left.sort_sequence
                .cmp(&right.sort_sequence)
                .then_with(|| left.code.cmp(&right.code))
        });
        attach_children_per_parent(self.conn, found)
    }

    fn find_all(&self) -> RepoResult<Vec<LargeCode>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{LARGE_CODE_SELECT_SQL}{LARGE_CODE_ORDER_SQL};"))?;
        let mut rows = stmt.query([])?;
        let mut found = Vec::new();
        while let Some(row) = rows.next()? {
            found.push(parse_large_code_row(row)?);
        }
        attach_children_per_parent(self.conn, found)
    }

    fn delete_by_id(&self, code: &str) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let removed_children = if self.cascade.delete {
            tx.execute("DELETE FROM small_codes WHERE large_code = ?1;", [code])?
        } else {
            0
        };
        let removed = tx.execute("DELETE FROM large_codes WHERE code = ?1;", [code])?;
        tx.commit()?;

        info!(
            "event=large_code_delete module=repo status=ok code={code} removed={removed} removed_children={removed_children}"
        );
        Ok(())
    }

    fn find_all_with_children(&self) -> RepoResult<Vec<LargeCode>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{LARGE_CODE_GRAPH_SQL}{LARGE_CODE_GRAPH_ORDER_SQL};"))?;
        let mut rows = stmt.query([])?;
        let graph = collect_graph(&mut rows)?;
        debug!(
            "event=large_code_fetch_graph module=repo status=ok parents={}",
            graph.len()
        );
        Ok(graph)
    }

    fn find_with_children_by_code(&self, code: &str) -> RepoResult<Option<LargeCode>> {
        let mut stmt = self.conn.prepare(&format!(
            "{LARGE_CODE_GRAPH_SQL} WHERE l.code = ?1{LARGE_CODE_GRAPH_ORDER_SQL};"
        ))?;
        let mut rows = stmt.query([code])?;
        Ok(collect_graph(&mut rows)?.into_iter().next())
    }
}

fn load_large_code(conn: &Connection, code: &str) -> RepoResult<Option<LargeCode>> {
    let mut stmt = conn.prepare(&format!("{LARGE_CODE_SELECT_SQL} WHERE code = ?1;"))?;
    let mut rows = stmt.query([code])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };
    let mut found = parse_large_code_row(row)?;
    found.children = load_children(conn, &found.code)?;
    Ok(Some(found))
}

fn attach_children_per_parent(
    conn: &Connection,
    mut parents: Vec<LargeCode>,
) -> RepoResult<Vec<LargeCode>> {
    for parent in &mut parents {
        parent.children = load_children(conn, &parent.code)?;
    }
    Ok(parents)
}

/// Folds joined parent/child rows into parents. Rows must arrive grouped by
/// parent, which `LARGE_CODE_GRAPH_ORDER_SQL` guarantees.
fn collect_graph(rows: &mut rusqlite::Rows<'_>) -> RepoResult<Vec<LargeCode>> {
    let mut graph: Vec<LargeCode> = Vec::new();
    while let Some(row) = rows.next()? {
        let code: String = row.get("code")?;
        let is_new_parent = graph.last().map_or(true, |last| last.code != code);
        if is_new_parent {
            graph.push(parse_large_code_row(row)?);
        }

        if let Some(child) = parse_joined_child(row, &code)? {
            if let Some(parent) = graph.last_mut() {
                parent.children.push(child);
            }
        }
    }
    Ok(graph)
}

fn parse_large_code_row(row: &Row<'_>) -> RepoResult<LargeCode> {
    let use_flag_text: String = row.get("use_flag")?;
    let code = LargeCode {
        code: row.get("code")?,
        name: row.get("name")?,
        category_division: row.get("category_division")?,
        sort_sequence: row.get("sort_sequence")?,
        use_flag: parse_use_flag(&use_flag_text, "large_codes.use_flag")?,
        registered_at: row.get("registered_at")?,
        children: Vec::new(),
    };
    code.validate()?;
    Ok(code)
}

/// Reads the `child_*` columns of a joined row; `None` for a parent without
/// children (all child columns NULL).
fn parse_joined_child(row: &Row<'_>, large_code: &str) -> RepoResult<Option<SmallCode>> {
    let Some(small_code) = row.get::<_, Option<String>>("child_small_code")? else {
        return Ok(None);
    };
    let use_flag_text: String = row.get("child_use_flag")?;
    let child = SmallCode {
        large_code: large_code.to_string(),
        small_code,
        name: row.get("child_name")?,
        sort_sequence: row.get("child_sort_sequence")?,
        use_flag: parse_use_flag(&use_flag_text, "small_codes.use_flag")?,
        memo: row.get("child_memo")?,
    };
    child.validate()?;
    Ok(Some(child))
}
