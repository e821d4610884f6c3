use kanban_core::db::{open_db_in_memory, Agent};
use kanban_core::repo::ordering::{
    clamp_position, close_gap, next_order, open_gap, relocate_card, reserve_slot, sibling_count,
};
use kanban_core::SiblingScope;
use rusqlite::{params, Connection};

fn setup(cards_per_column: &[(&str, &[&str])]) -> Connection {
    let conn = open_db_in_memory().unwrap();
    conn.execute("INSERT INTO projects (id, name) VALUES ('p', 'P');", [])
        .unwrap();
    for (column_index, (column_id, cards)) in cards_per_column.iter().enumerate() {
        conn.execute(
            "INSERT INTO board_columns (id, project_id, name, draw_order)
             VALUES (?1, 'p', ?1, ?2);",
            params![column_id, column_index as i64],
        )
        .unwrap();
        for (card_index, card_id) in cards.iter().enumerate() {
            conn.execute(
                "INSERT INTO cards (id, column_id, name, draw_order)
                 VALUES (?1, ?2, ?1, ?3);",
                params![card_id, column_id, card_index as i64],
            )
            .unwrap();
        }
    }
    conn
}

fn card_orders(conn: &Connection, column_id: &str) -> Vec<(String, i64)> {
    let mut stmt = conn
        .prepare("SELECT id, draw_order FROM cards WHERE column_id = ?1 ORDER BY draw_order, id;")
        .unwrap();
    let rows = stmt
        .query_map([column_id], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap();
    rows.map(Result::unwrap).collect()
}

fn pairs(expected: &[(&str, i64)]) -> Vec<(String, i64)> {
    expected
        .iter()
        .map(|(id, order)| (id.to_string(), *order))
        .collect()
}

#[test]
fn next_order_is_tail_of_dense_sequence() {
    let conn = setup(&[("todo", &["a", "b", "c"]), ("done", &[])]);
    let agent = Agent::connection(&conn);

    assert_eq!(next_order(&agent, SiblingScope::Cards, "todo").unwrap(), 3);
    assert_eq!(next_order(&agent, SiblingScope::Cards, "done").unwrap(), 0);
    assert_eq!(next_order(&agent, SiblingScope::Columns, "p").unwrap(), 2);
    assert_eq!(sibling_count(&agent, SiblingScope::Cards, "todo").unwrap(), 3);
}

#[test]
fn close_gap_shifts_only_later_siblings() {
    let conn = setup(&[("todo", &["a", "b", "c", "d"])]);
    let agent = Agent::begin(&conn).unwrap();

    agent
        .exec("DELETE FROM cards WHERE id = 'b';", [])
        .unwrap();
    let shifted = close_gap(&agent, SiblingScope::Cards, "todo", 1).unwrap();
    agent.commit().unwrap();

    assert_eq!(shifted, 2);
    assert_eq!(card_orders(&conn, "todo"), pairs(&[("a", 0), ("c", 1), ("d", 2)]));
}

#[test]
fn close_gap_after_last_sibling_shifts_nothing() {
    let conn = setup(&[("todo", &["a", "b"])]);
    let agent = Agent::begin(&conn).unwrap();

    agent
        .exec("DELETE FROM cards WHERE id = 'b';", [])
        .unwrap();
    assert_eq!(close_gap(&agent, SiblingScope::Cards, "todo", 1).unwrap(), 0);
    agent.commit().unwrap();

    assert_eq!(card_orders(&conn, "todo"), pairs(&[("a", 0)]));
}

#[test]
fn reserve_slot_opens_room_at_clamped_position() {
    let conn = setup(&[("todo", &["a", "b"])]);
    let agent = Agent::begin(&conn).unwrap();

    assert_eq!(clamp_position(&agent, SiblingScope::Cards, "todo", -4).unwrap(), 0);
    assert_eq!(clamp_position(&agent, SiblingScope::Cards, "todo", 40).unwrap(), 2);

    let order = reserve_slot(&agent, SiblingScope::Cards, "todo", Some(1)).unwrap();
    assert_eq!(order, 1);
    agent
        .exec(
            "INSERT INTO cards (id, column_id, name, draw_order) VALUES ('x', 'todo', 'x', ?1);",
            [order],
        )
        .unwrap();
    agent.commit().unwrap();

    assert_eq!(
        card_orders(&conn, "todo"),
        pairs(&[("a", 0), ("x", 1), ("b", 2)])
    );
}

#[test]
fn open_gap_at_tail_shifts_nothing() {
    let conn = setup(&[("todo", &["a", "b"])]);
    let agent = Agent::connection(&conn);
    assert_eq!(open_gap(&agent, SiblingScope::Cards, "todo", 2).unwrap(), 0);
}

#[test]
fn relocate_closes_source_and_appends_to_target() {
    let conn = setup(&[("todo", &["a", "b", "c"]), ("done", &["z"])]);
    let agent = Agent::begin(&conn).unwrap();

    let order = relocate_card(&agent, "a", "todo", 0, "done").unwrap();
    agent.commit().unwrap();

    assert_eq!(order, 1);
    assert_eq!(card_orders(&conn, "todo"), pairs(&[("b", 0), ("c", 1)]));
    assert_eq!(card_orders(&conn, "done"), pairs(&[("z", 0), ("a", 1)]));
}

#[test]
fn dropped_transaction_leaves_no_gap() {
    let conn = setup(&[("todo", &["a", "b", "c"])]);
    {
        let agent = Agent::begin(&conn).unwrap();
        close_gap(&agent, SiblingScope::Cards, "todo", 0).unwrap();
    }
    assert_eq!(
        card_orders(&conn, "todo"),
        pairs(&[("a", 0), ("b", 1), ("c", 2)])
    );
}
