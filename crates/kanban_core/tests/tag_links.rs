use kanban_core::db::{open_db_in_memory, Agent};
use kanban_core::repo::tag_link::{is_linked, link, link_all, unlink};
use kanban_core::{BoardError, BoardService, CardInput, ColumnInput, ProjectInput, TagInput};
use rusqlite::Connection;

struct Board {
    card_id: String,
    tag_ids: Vec<String>,
}

fn seed(conn: &Connection) -> Board {
    let service = BoardService::new(conn);
    let project_id = service
        .create_project(
            &ProjectInput::new("Roadmap")
                .with_tag(TagInput::new("bug", "#d73a4a"))
                .with_tag(TagInput::new("feature", "#a2eeef"))
                .with_column(ColumnInput::new("Todo").with_card(CardInput::new("Ship", ""))),
        )
        .unwrap();
    let tree = service.get_project_tree(&project_id).unwrap();
    Board {
        card_id: tree.columns[0].cards[0].id.clone(),
        tag_ids: tree.tags.iter().map(|tag| tag.id.clone()).collect(),
    }
}

fn link_rows(conn: &Connection, card_id: &str) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM card_tags WHERE card_id = ?1;",
        [card_id],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn linking_twice_writes_one_row() {
    let conn = open_db_in_memory().unwrap();
    let board = seed(&conn);
    let agent = Agent::connection(&conn);

    assert!(link(&agent, &board.card_id, &board.tag_ids[0]).unwrap());
    assert!(!link(&agent, &board.card_id, &board.tag_ids[0]).unwrap());
    assert_eq!(link_rows(&conn, &board.card_id), 1);
    assert!(is_linked(&agent, &board.card_id, &board.tag_ids[0]).unwrap());
}

#[test]
fn link_all_ignores_duplicate_ids_in_input() {
    let conn = open_db_in_memory().unwrap();
    let board = seed(&conn);
    let agent = Agent::connection(&conn);
    let ids = vec![
        board.tag_ids[0].clone(),
        board.tag_ids[1].clone(),
        board.tag_ids[0].clone(),
    ];

    assert_eq!(link_all(&agent, &board.card_id, &ids).unwrap(), 2);
    assert_eq!(link_rows(&conn, &board.card_id), 2);
}

#[test]
fn unlinking_a_missing_link_is_a_no_op() {
    let conn = open_db_in_memory().unwrap();
    let board = seed(&conn);
    let agent = Agent::connection(&conn);

    assert!(!unlink(&agent, &board.card_id, &board.tag_ids[1]).unwrap());
    link(&agent, &board.card_id, &board.tag_ids[1]).unwrap();
    assert!(unlink(&agent, &board.card_id, &board.tag_ids[1]).unwrap());
    assert_eq!(link_rows(&conn, &board.card_id), 0);
}

#[test]
fn linking_unknown_tag_is_a_store_error() {
    let conn = open_db_in_memory().unwrap();
    let board = seed(&conn);
    let agent = Agent::connection(&conn);

    let err = link(&agent, &board.card_id, "no-such-tag").unwrap_err();
    assert!(matches!(err, BoardError::Store(_)));
}

#[test]
fn service_link_reports_whether_link_was_new() {
    let conn = open_db_in_memory().unwrap();
    let board = seed(&conn);
    let service = BoardService::new(&conn);

    assert!(service.link_tag(&board.card_id, &board.tag_ids[0]).unwrap());
    assert!(!service.link_tag(&board.card_id, &board.tag_ids[0]).unwrap());
    assert!(service.unlink_tag(&board.card_id, &board.tag_ids[0]).unwrap());
    assert!(!service.unlink_tag(&board.card_id, &board.tag_ids[0]).unwrap());
}

#[test]
fn service_rejects_tag_from_another_project() {
    let conn = open_db_in_memory().unwrap();
    let board = seed(&conn);
    let service = BoardService::new(&conn);
    let other_project = service.create_project(&ProjectInput::new("Other")).unwrap();
    let foreign_tag = service.create_tag(&other_project, "ops", "").unwrap();

    let err = service.link_tag(&board.card_id, &foreign_tag).unwrap_err();
    assert!(matches!(err, BoardError::NoEffect { .. }));
    assert_eq!(link_rows(&conn, &board.card_id), 0);
}

#[test]
fn deleting_a_tag_drops_its_links() {
    let conn = open_db_in_memory().unwrap();
    let board = seed(&conn);
    let service = BoardService::new(&conn);
    service.link_tag(&board.card_id, &board.tag_ids[0]).unwrap();

    service.delete_tag(&board.tag_ids[0]).unwrap();
    assert_eq!(link_rows(&conn, &board.card_id), 0);
    assert!(matches!(
        service.delete_tag(&board.tag_ids[0]).unwrap_err(),
        BoardError::NotFound { .. }
    ));
}
