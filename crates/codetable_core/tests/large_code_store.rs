use codetable_core::db::migrations::latest_version;
use codetable_core::db::open_db_in_memory;
use codetable_core::{
    CascadePolicy, LargeCode, LargeCodeRepository, RepoError, SmallCode, SmallCodeKey,
    SmallCodeRepository, SqliteLargeCodeRepository, SqliteSmallCodeRepository, UseFlag,
};
use rusqlite::Connection;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

/// Stores `WWW01` and `WWW02`, each with `_S_01` and `_S_02` children.
fn seed(conn: &Connection) -> Vec<LargeCode> {
    let repo = SqliteLargeCodeRepository::try_new(conn).unwrap();
    let codes: Vec<LargeCode> = ["WWW01", "WWW02"]
        .into_iter()
        .map(|code| {
            let mut large = large_code(code, 1);
            for small in small_codes(code) {
                large.push_child(small);
            }
            large
        })
        .collect();
    repo.save_all(&codes).unwrap()
}

fn large_code(code: &str, sort_sequence: i64) -> LargeCode {
    LargeCode::builder(code)
        .name(format!("{code}_NM"))
        .category_division("SYS")
        .sort_sequence(sort_sequence)
        .use_flag(UseFlag::Yes)
        .build()
        .unwrap()
}

fn small_codes(large_code: &str) -> Vec<SmallCode> {
    ["_S_01", "_S_02"]
        .into_iter()
        .map(|suffix| {
            let small_code = format!("{large_code}{suffix}");
            SmallCode::builder(large_code, small_code.as_str())
                .name(format!("{small_code}_NM"))
                .sort_sequence(1)
                .build()
                .unwrap()
        })
        .collect()
}

fn small_code_count(conn: &Connection, large_code: &str) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM small_codes WHERE large_code = ?1;",
        [large_code],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn cascade_save_persists_children_with_parent() {
    let conn = setup();
    let saved = seed(&conn);

    assert_eq!(saved.len(), 2);
    assert!(saved.iter().all(|code| code.children.len() == 2));

    let repo = SqliteLargeCodeRepository::try_new(&conn).unwrap();
    let loaded = repo.find_by_id("WWW01").unwrap().unwrap();
    assert_eq!(loaded.name, "WWW01_NM");
    assert_eq!(loaded.category_division, "SYS");
    assert_eq!(loaded.sort_sequence, 1);
    assert_eq!(loaded.children.len(), 2);
    assert_eq!(loaded.children, small_codes("WWW01"));
}

#[test]
fn save_sets_registered_at_once_and_updates_in_place() {
    let conn = setup();
    let repo = SqliteLargeCodeRepository::try_new(&conn).unwrap();

    let created = repo.save(&large_code("WWW01", 1)).unwrap();
    let registered_at = created.registered_at.expect("store sets registered_at");
    assert!(registered_at > 0);

    let mut changed = created.clone();
    changed.name = "renamed".to_string();
    changed.use_flag = UseFlag::No;
    changed.registered_at = Some(1);
    let updated = repo.save(&changed).unwrap();

    assert_eq!(updated.name, "renamed");
    assert_eq!(updated.use_flag, UseFlag::No);
    assert_eq!(updated.registered_at, Some(registered_at));

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM large_codes;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn caller_supplied_registered_at_is_kept_on_insert() {
    let conn = setup();
    let repo = SqliteLargeCodeRepository::try_new(&conn).unwrap();

    let mut imported = large_code("IMPORTED", 1);
    imported.registered_at = Some(1_600_000_000_000);
    let stored = repo.save(&imported).unwrap();

    assert_eq!(stored.registered_at, Some(1_600_000_000_000));
}

#[test]
fn resaving_parent_upserts_children_without_removing_missing_ones() {
    let conn = setup();
    seed(&conn);
    let repo = SqliteLargeCodeRepository::try_new(&conn).unwrap();

    let mut parent = repo.find_by_id("WWW01").unwrap().unwrap();
    parent.children.retain(|child| child.small_code == "WWW01_S_01");
    parent.children[0].memo = Some("edited".to_string());
    let stored = repo.save(&parent).unwrap();

    assert_eq!(stored.children.len(), 2);
    let edited = stored.child("WWW01_S_01").unwrap();
    assert_eq!(edited.memo.as_deref(), Some("edited"));
}

#[test]
fn find_all_by_id_returns_found_subset_only() {
    let conn = setup();
    seed(&conn);
    let repo = SqliteLargeCodeRepository::try_new(&conn).unwrap();

    let found = repo
        .find_all_by_id(&["WWW02", "MISSING", "WWW01", "WWW01"])
        .unwrap();
    let codes: Vec<&str> = found.iter().map(|code| code.code.as_str()).collect();
    assert_eq!(codes, vec!["WWW01", "WWW02"]);
    assert!(found.iter().all(|code| code.children.len() == 2));

    assert!(repo.find_all_by_id(&[]).unwrap().is_empty());
    assert!(repo.find_all_by_id(&["NOPE"]).unwrap().is_empty());
}

#[test]
fn find_all_by_id_handles_key_lists_beyond_sqlite_variable_limit() {
    let conn = setup();
    seed(&conn);
    let repo = SqliteLargeCodeRepository::try_new(&conn).unwrap();
    repo.save(&large_code("AAA00", 5)).unwrap();

    let missing: Vec<String> = (0..40_000).map(|n| format!("MISSING{n:05}")).collect();
    let mut keys: Vec<&str> = missing.iter().map(String::as_str).collect();
    keys.push("WWW02");
    keys.push("AAA00");
    keys.push("WWW01");

    let found = repo.find_all_by_id(&keys).unwrap();
    let codes: Vec<&str> = found.iter().map(|code| code.code.as_str()).collect();
    assert_eq!(codes, vec!["WWW01", "WWW02", "AAA00"]);
    assert_eq!(found[0].children.len(), 2);
}

#[test]
fn eager_reads_match_per_parent_reads() {
    let conn = setup();
    seed(&conn);
    let repo = SqliteLargeCodeRepository::try_new(&conn).unwrap();
    repo.save(&large_code("EMPTY", 0)).unwrap();

    let eager = repo.find_all_with_children().unwrap();
    let lazy = repo.find_all().unwrap();
    assert_eq!(eager, lazy);

    let codes: Vec<&str> = eager.iter().map(|code| code.code.as_str()).collect();
    assert_eq!(codes, vec!["EMPTY", "WWW01", "WWW02"]);
    assert!(eager[0].children.is_empty());
    assert_eq!(eager[1].children.len(), 2);
    assert_eq!(eager[2].children.len(), 2);

    let single = repo.find_with_children_by_code("WWW01").unwrap().unwrap();
    assert_eq!(Some(single), repo.find_by_id("WWW01").unwrap());
    assert!(repo.find_with_children_by_code("MISSING").unwrap().is_none());
}

#[test]
fn children_come_back_in_sort_order_regardless_of_insert_order() {
    let conn = setup();
    let repo = SqliteLargeCodeRepository::try_new(&conn).unwrap();

    let mut parent = large_code("ORDERED", 1);
    for (small_code, sort_sequence) in [("C", 2), ("B", 1), ("A", 2)] {
        parent.push_child(
            SmallCode::builder("ORDERED", small_code)
                .name(small_code)
                .sort_sequence(sort_sequence)
                .build()
                .unwrap(),
        );
    }
    repo.save(&parent).unwrap();

    let loaded = repo.find_with_children_by_code("ORDERED").unwrap().unwrap();
    let order: Vec<&str> = loaded
        .children
        .iter()
        .map(|child| child.small_code.as_str())
        .collect();
    assert_eq!(order, vec!["B", "A", "C"]);
}

#[test]
fn delete_by_id_cascades_and_leaves_other_codes() {
    let conn = setup();
    seed(&conn);
    let repo = SqliteLargeCodeRepository::try_new(&conn).unwrap();

    repo.delete_by_id("WWW02").unwrap();

    assert!(repo.find_by_id("WWW02").unwrap().is_none());
    assert_eq!(small_code_count(&conn, "WWW02"), 0);
    let remaining = repo.find_by_id("WWW01").unwrap().unwrap();
    assert_eq!(remaining.children.len(), 2);
}

#[test]
fn delete_by_id_is_idempotent() {
    let conn = setup();
    seed(&conn);
    let repo = SqliteLargeCodeRepository::try_new(&conn).unwrap();

    repo.delete_by_id("WWW01").unwrap();
    repo.delete_by_id("WWW01").unwrap();
    repo.delete_by_id("NEVER_EXISTED").unwrap();

    assert!(repo.find_by_id("WWW01").unwrap().is_none());
    assert!(repo.find_by_id("NEVER_EXISTED").unwrap().is_none());
}

#[test]
fn failing_child_rolls_back_parent_and_siblings() {
    let conn = setup();
    conn.execute_batch(
        "CREATE TRIGGER reject_bad_small_code
         BEFORE INSERT ON small_codes
         WHEN NEW.small_code = 'BAD'
         BEGIN
             SELECT RAISE(ABORT, 'rejected small code');
         END;",
    )
    .unwrap();
    let repo = SqliteLargeCodeRepository::try_new(&conn).unwrap();

    let mut parent = large_code("NEW01", 1);
    for small_code in ["GOOD", "BAD"] {
        parent.push_child(
            SmallCode::builder("NEW01", small_code)
                .name(small_code)
                .sort_sequence(1)
                .build()
                .unwrap(),
        );
    }

    let err = repo.save(&parent).unwrap_err();
    assert!(err.is_constraint_violation(), "unexpected error: {err}");
    assert!(repo.find_by_id("NEW01").unwrap().is_none());
    assert_eq!(small_code_count(&conn, "NEW01"), 0);

    let batch_err = repo
        .save_all(&[large_code("FIRST", 1), parent])
        .unwrap_err();
    assert!(matches!(batch_err, RepoError::Db(_)));
    assert!(repo.find_by_id("FIRST").unwrap().is_none());
}

#[test]
fn invalid_graph_is_rejected_before_any_write() {
    let conn = setup();
    let repo = SqliteLargeCodeRepository::try_new(&conn).unwrap();

    let mut parent = large_code("WWW01", 1);
    parent.children.extend(small_codes("WWW02"));

    let err = repo.save(&parent).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert!(repo.find_by_id("WWW01").unwrap().is_none());
}

#[test]
fn without_save_cascade_children_must_be_saved_separately() {
    let conn = setup();
    let repo = SqliteLargeCodeRepository::with_cascade(&conn, CascadePolicy::NONE).unwrap();
    let small_repo = SqliteSmallCodeRepository::try_new(&conn).unwrap();

    let mut parent = large_code("WWW01", 1);
    for child in small_codes("WWW01") {
        parent.push_child(child);
    }
    let stored = repo.save(&parent).unwrap();
    assert!(stored.children.is_empty());
    assert_eq!(small_code_count(&conn, "WWW01"), 0);

    small_repo.save_all(&parent.children).unwrap();
    let reloaded = repo.find_by_id("WWW01").unwrap().unwrap();
    assert_eq!(reloaded.children.len(), 2);
}

#[test]
fn without_delete_cascade_parent_with_children_cannot_be_deleted() {
    let conn = setup();
    seed(&conn);
    let policy = CascadePolicy {
        save: true,
        delete: false,
    };
    let repo = SqliteLargeCodeRepository::with_cascade(&conn, policy).unwrap();
    assert_eq!(repo.cascade(), policy);

    let err = repo.delete_by_id("WWW01").unwrap_err();
    assert!(err.is_constraint_violation(), "unexpected error: {err}");
    assert!(repo.find_by_id("WWW01").unwrap().is_some());

    let small_repo = SqliteSmallCodeRepository::try_new(&conn).unwrap();
    for child in small_codes("WWW01") {
        small_repo.delete_by_id(&child.key()).unwrap();
    }
    repo.delete_by_id("WWW01").unwrap();
    assert!(repo.find_by_id("WWW01").unwrap().is_none());
}

#[test]
fn use_yn_category_round_trips_with_children() {
    let conn = setup();
    let repo = SqliteLargeCodeRepository::try_new(&conn).unwrap();

    let mut use_yn = LargeCode::builder("USE_YN")
        .name("Use flag")
        .category_division("SYS")
        .sort_sequence(0)
        .build()
        .unwrap();
    for (small_code, name) in [("Y", "Used"), ("N", "Unused")] {
        use_yn.push_child(
            SmallCode::builder("USE_YN", small_code)
                .name(name)
                .sort_sequence(1)
                .build()
                .unwrap(),
        );
    }
    repo.save(&use_yn).unwrap();

    let small_repo = SqliteSmallCodeRepository::try_new(&conn).unwrap();
    let yes = small_repo
        .find_by_id(&SmallCodeKey::new("USE_YN", "Y"))
        .unwrap()
        .unwrap();
    assert_eq!(yes.name, "Used");
}

#[test]
fn listing_orders_by_sort_sequence_then_code() {
    let conn = setup();
    let repo = SqliteLargeCodeRepository::try_new(&conn).unwrap();
    repo.save_all(&[
        large_code("B", 1),
        large_code("C", 0),
        large_code("A", 1),
    ])
    .unwrap();

    let codes: Vec<String> = repo
        .find_all()
        .unwrap()
        .into_iter()
        .map(|code| code.code)
        .collect();
    assert_eq!(codes, vec!["C", "A", "B"]);
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteLargeCodeRepository::try_new(&conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_required_tables() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteLargeCodeRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredTable("large_codes"))
    ));
}

#[test]
fn repository_rejects_connection_missing_required_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE large_codes (
            code TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            category_division TEXT NOT NULL,
            sort_sequence INTEGER NOT NULL,
            use_flag TEXT NOT NULL
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteLargeCodeRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredColumn {
            table: "large_codes",
            column: "registered_at"
        })
    ));
}
