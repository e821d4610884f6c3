//! Sibling `draw_order` assignment and repair.
//!
//! # Responsibility
//! - Compute the tail position for a new sibling.
//! - Close the gap left by a removed or relocated sibling.
//! - Open a gap for an insert at an explicit position.
//!
//! # Invariants
//! - After every committed operation the orders under one parent are exactly
//!   `0..count`.
//! - Every function must run on the same transaction-bound agent as the row
//!   write it supports; gaps are only visible inside that transaction.
//! - An insert uses either `next_order` or `open_gap`, never both.

use super::{BoardResult, EntityKind};
use crate::db::Agent;
use rusqlite::params;

/// Order assigned to the first sibling under an empty parent.
pub const BASE_ORDER: i64 = 0;

/// Temporary order for a row being moved; outside every valid sequence.
const PARKED_ORDER: i64 = -1;

/// Which sibling set an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiblingScope {
    /// Columns under one project.
    Columns,
    /// Cards under one column.
    Cards,
}

struct ScopeSql {
    max_order: &'static str,
    count: &'static str,
    close_gap: &'static str,
    open_gap: &'static str,
    set_order: &'static str,
}

const COLUMN_SQL: ScopeSql = ScopeSql {
    max_order: "SELECT MAX(draw_order) FROM board_columns WHERE project_id = ?1;",
    count: "SELECT COUNT(*) FROM board_columns WHERE project_id = ?1;",
    close_gap: "UPDATE board_columns
                SET draw_order = draw_order - 1,
                    updated_at = (strftime('%s', 'now') * 1000)
                WHERE project_id = ?1
                  AND draw_order > ?2;",
    open_gap: "UPDATE board_columns
               SET draw_order = draw_order + 1,
                   updated_at = (strftime('%s', 'now') * 1000)
               WHERE project_id = ?1
                 AND draw_order >= ?2;",
    set_order: "UPDATE board_columns SET draw_order = ?2 WHERE id = ?1;",
};

const CARD_SQL: ScopeSql = ScopeSql {
    max_order: "SELECT MAX(draw_order) FROM cards WHERE column_id = ?1;",
    count: "SELECT COUNT(*) FROM cards WHERE column_id = ?1;",
    close_gap: "UPDATE cards
                SET draw_order = draw_order - 1,
                    updated_at = (strftime('%s', 'now') * 1000)
                WHERE column_id = ?1
                  AND draw_order > ?2;",
    open_gap: "UPDATE cards
               SET draw_order = draw_order + 1,
                   updated_at = (strftime('%s', 'now') * 1000)
               WHERE column_id = ?1
                 AND draw_order >= ?2;",
    set_order: "UPDATE cards SET draw_order = ?2 WHERE id = ?1;",
};

/// Columns never change project, so only cards relocate.
const RELOCATE_CARD: &str = "UPDATE cards
    SET column_id = ?2,
        draw_order = ?3,
        updated_at = (strftime('%s', 'now') * 1000)
    WHERE id = ?1;";

impl SiblingScope {
    /// Entity kind of the parent that owns this sibling set.
    pub fn parent_kind(self) -> EntityKind {
        match self {
            Self::Columns => EntityKind::Project,
            Self::Cards => EntityKind::Column,
        }
    }

    /// Entity kind of the siblings themselves.
    pub fn sibling_kind(self) -> EntityKind {
        match self {
            Self::Columns => EntityKind::Column,
            Self::Cards => EntityKind::Card,
        }
    }

    fn sql(self) -> &'static ScopeSql {
        match self {
            Self::Columns => &COLUMN_SQL,
            Self::Cards => &CARD_SQL,
        }
    }
}

/// Returns `max(order) + 1` under `parent_id`, or [`BASE_ORDER`] when the
/// parent has no siblings.
pub fn next_order(agent: &Agent<'_>, scope: SiblingScope, parent_id: &str) -> BoardResult<i64> {
    let max: Option<i64> =
        agent.query_row(scope.sql().max_order, [parent_id], |row| row.get(0))?;
    Ok(max.map_or(BASE_ORDER, |value| value + 1))
}

pub fn sibling_count(agent: &Agent<'_>, scope: SiblingScope, parent_id: &str) -> BoardResult<i64> {
    let count = agent.query_row(scope.sql().count, [parent_id], |row| row.get(0))?;
    Ok(count)
}

/// Decrements every sibling order strictly greater than `removed_order`.
///
/// Returns how many siblings shifted. Deleting the last sibling shifts none.
pub fn close_gap(
    agent: &Agent<'_>,
    scope: SiblingScope,
    parent_id: &str,
    removed_order: i64,
) -> BoardResult<usize> {
    let shifted = agent.exec(scope.sql().close_gap, params![parent_id, removed_order])?;
    Ok(shifted)
}

/// Increments every sibling order `>= at_position` to make room for an
/// insert there. Returns how many siblings shifted.
pub fn open_gap(
    agent: &Agent<'_>,
    scope: SiblingScope,
    parent_id: &str,
    at_position: i64,
) -> BoardResult<usize> {
    let shifted = agent.exec(scope.sql().open_gap, params![parent_id, at_position])?;
    Ok(shifted)
}

/// Clamps a requested insert position into `0..=count`.
pub fn clamp_position(
    agent: &Agent<'_>,
    scope: SiblingScope,
    parent_id: &str,
    requested: i64,
) -> BoardResult<i64> {
    let count = sibling_count(agent, scope, parent_id)?;
    Ok(requested.clamp(BASE_ORDER, BASE_ORDER + count))
}

/// Resolves the order for a new sibling and prepares room for it.
///
/// `None` appends (`next_order`); `Some(position)` opens a gap at the clamped
/// position.
pub fn reserve_slot(
    agent: &Agent<'_>,
    scope: SiblingScope,
    parent_id: &str,
    position: Option<i64>,
) -> BoardResult<i64> {
    match position {
        None => next_order(agent, scope, parent_id),
        Some(requested) => {
            let at = clamp_position(agent, scope, parent_id, requested)?;
            open_gap(agent, scope, parent_id, at)?;
            Ok(at)
        }
    }
}

/// Moves one sibling from `from` to `to` inside the same parent.
///
/// The target is clamped into `0..count`. Returns the order the sibling ends
/// up with.
pub fn reorder_within(
    agent: &Agent<'_>,
    scope: SiblingScope,
    parent_id: &str,
    sibling_id: &str,
    from: i64,
    to: i64,
) -> BoardResult<i64> {
    let count = sibling_count(agent, scope, parent_id)?;
    let last = (BASE_ORDER + count - 1).max(BASE_ORDER);
    let target = to.clamp(BASE_ORDER, last);
    if target == from {
        return Ok(from);
    }

    let sql = scope.sql();
    agent.exec(sql.set_order, params![sibling_id, PARKED_ORDER])?;
    close_gap(agent, scope, parent_id, from)?;
    open_gap(agent, scope, parent_id, target)?;
    agent.exec(sql.set_order, params![sibling_id, target])?;
    Ok(target)
}

/// Moves a card to the tail of another column.
///
/// Composition of `close_gap(from_column, from_order)` and
/// `next_order(to_column)`. Returns the new order.
pub fn relocate_card(
    agent: &Agent<'_>,
    card_id: &str,
    from_column: &str,
    from_order: i64,
    to_column: &str,
) -> BoardResult<i64> {
    close_gap(agent, SiblingScope::Cards, from_column, from_order)?;
    let order = next_order(agent, SiblingScope::Cards, to_column)?;
    agent.exec(RELOCATE_CARD, params![card_id, to_column, order])?;
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::{next_order, reorder_within, SiblingScope, BASE_ORDER};
    use crate::db::{open_db_in_memory, Agent};

    fn seed(conn: &rusqlite::Connection, columns: &[&str]) {
        conn.execute("INSERT INTO projects (id, name) VALUES ('p', 'P');", [])
            .unwrap();
        for (index, id) in columns.iter().enumerate() {
            conn.execute(
                "INSERT INTO board_columns (id, project_id, name, draw_order)
                 VALUES (?1, 'p', ?1, ?2);",
                rusqlite::params![id, index as i64],
            )
            .unwrap();
        }
    }

    fn orders(conn: &rusqlite::Connection) -> Vec<(String, i64)> {
        let mut stmt = conn
            .prepare("SELECT id, draw_order FROM board_columns ORDER BY draw_order;")
            .unwrap();
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap();
        rows.map(Result::unwrap).collect()
    }

    #[test]
    fn empty_parent_starts_at_base_order() {
        let conn = open_db_in_memory().unwrap();
        seed(&conn, &[]);
        let agent = Agent::connection(&conn);
        assert_eq!(
            next_order(&agent, SiblingScope::Columns, "p").unwrap(),
            BASE_ORDER
        );
    }

    #[test]
    fn reorder_forward_and_backward_keeps_sequence_dense() {
        let conn = open_db_in_memory().unwrap();
        seed(&conn, &["a", "b", "c", "d"]);
        let agent = Agent::begin(&conn).unwrap();

        let placed = reorder_within(&agent, SiblingScope::Columns, "p", "a", 0, 2).unwrap();
        assert_eq!(placed, 2);
        let placed = reorder_within(&agent, SiblingScope::Columns, "p", "d", 3, 0).unwrap();
        assert_eq!(placed, 0);
        agent.commit().unwrap();

        let ids: Vec<(String, i64)> = orders(&conn);
        assert_eq!(
            ids,
            vec![
                ("d".to_string(), 0),
                ("b".to_string(), 1),
                ("c".to_string(), 2),
                ("a".to_string(), 3),
            ]
        );
    }

    #[test]
    fn reorder_clamps_target_past_tail() {
        let conn = open_db_in_memory().unwrap();
        seed(&conn, &["a", "b", "c"]);
        let agent = Agent::begin(&conn).unwrap();
        let placed = reorder_within(&agent, SiblingScope::Columns, "p", "a", 0, 99).unwrap();
        agent.commit().unwrap();
        assert_eq!(placed, 2);
        assert_eq!(orders(&conn)[2].0, "a");
    }
}
