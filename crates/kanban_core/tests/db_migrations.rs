use kanban_core::db::migrations::latest_version;
use kanban_core::db::{open_db, open_db_in_memory, open_db_with_retry, DbError};
use rusqlite::Connection;
use std::time::Duration;

#[test]
fn in_memory_store_has_every_board_table() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in [
        "projects",
        "board_columns",
        "cards",
        "tags",
        "card_tags",
        "card_updates",
    ] {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn reopening_a_file_store_keeps_schema_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kanban.db");

    let first = open_db(&path).unwrap();
    first
        .execute("INSERT INTO projects (id, name) VALUES ('p1', 'Roadmap');", [])
        .unwrap();
    drop(first);

    let second = open_db(&path).unwrap();
    assert_eq!(schema_version(&second), latest_version());
    let name: String = second
        .query_row("SELECT name FROM projects WHERE id = 'p1';", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(name, "Roadmap");
}

#[test]
fn upgrading_from_version_one_adds_history_and_keeps_board_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("v1.db");

    let conn = open_db(&path).unwrap();
    conn.execute_batch(
        "DROP TABLE card_updates;
         PRAGMA user_version = 1;
         INSERT INTO projects (id, name) VALUES ('p1', 'Roadmap');
         INSERT INTO board_columns (id, project_id, name, draw_order)
         VALUES ('c1', 'p1', 'Todo', 0);
         INSERT INTO cards (id, column_id, name, draw_order)
         VALUES ('k1', 'c1', 'Ship', 0);",
    )
    .unwrap();
    drop(conn);

    let upgraded = open_db(&path).unwrap();
    assert_eq!(schema_version(&upgraded), latest_version());
    assert_table_exists(&upgraded, "card_updates");
    let card_column: String = upgraded
        .query_row("SELECT column_id FROM cards WHERE id = 'k1';", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(card_column, "c1");

    upgraded
        .execute(
            "INSERT INTO card_updates (id, card_id, old_values, new_values)
             VALUES ('u1', 'k1', '{}', '{}');",
            [],
        )
        .unwrap();
}

#[test]
fn newer_schema_version_is_rejected_without_retry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db_with_retry(&path, 3, Duration::from_millis(1)).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unreachable_path_exhausts_connect_attempts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("nested").join("kanban.db");

    let err = open_db_with_retry(&path, 2, Duration::from_millis(1)).unwrap_err();
    match err {
        DbError::ConnectExhausted { attempts, .. } => assert_eq!(attempts, 2),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn foreign_keys_are_enforced() {
    let conn = open_db_in_memory().unwrap();
    let err = conn
        .execute(
            "INSERT INTO board_columns (id, project_id, name, draw_order)
             VALUES ('c1', 'nope', 'Todo', 0);",
            [],
        )
        .unwrap_err();
    assert!(err.to_string().contains("FOREIGN KEY"));
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
