// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqlitePool};
use sqlx::Row;
use tracing::debug;

use crate::database_error::{DatabaseError, WithContext};

/// The three shapes of collection the pagination engine can enumerate. Each
/// resolves to a base subquery returning a single `id`-aliased column plus a
/// constant argument vector.
#[derive(Debug, Clone)]
pub enum PaginationSource {
    /// All rows of a table, returning the given id column.
    Forward { table: String, column: String },

    /// All rows of a foreign table whose back-reference column equals the
    /// parent value: `SELECT <return_column> FROM <foreign_table> WHERE
    /// <reference_column> = ?`.
    Backward {
        foreign_table: String,
        reference_column: String,
        return_column: String,
        parent_id: u64,
    },

    /// All rows of a join table whose own column equals the parent value,
    /// returning the foreign column.
    Joined {
        join_table: String,
        own_column: String,
        foreign_column: String,
        parent_id: u64,
    },
}

impl PaginationSource {
    fn subquery(&self) -> (String, Vec<i64>) {
        let q = crate::quote_ident;

        match self {
            PaginationSource::Forward { table, column } => {
                (format!("SELECT {} AS id FROM {}", q(column), q(table)), vec![])
            }
            PaginationSource::Backward {
                foreign_table,
                reference_column,
                return_column,
                parent_id,
            } => (
                format!(
                    "SELECT {} AS id FROM {} WHERE {} = ?",
                    q(return_column),
                    q(foreign_table),
                    q(reference_column)
                ),
                vec![*parent_id as i64],
            ),
            PaginationSource::Joined {
                join_table,
                own_column,
                foreign_column,
                parent_id,
            } => (
                format!(
                    "SELECT {} AS id FROM {} WHERE {} = ?",
                    q(foreign_column),
                    q(join_table),
                    q(own_column)
                ),
                vec![*parent_id as i64],
            ),
        }
    }
}

/// Relay pagination arguments with cursors already decoded to row ids.
#[derive(Debug, Clone)]
pub struct PaginationRequest {
    pub source: PaginationSource,
    pub before: Option<u64>,
    pub after: Option<u64>,
    pub first: Option<u64>,
    pub last: Option<u64>,
}

/// One page of row ids plus the flags Relay's `PageInfo` needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub ids: Vec<u64>,
    pub has_previous_page: bool,
    pub has_next_page: bool,
}

fn bind_all<'q>(
    mut query: Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    args: &[i64],
) -> Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    for arg in args {
        query = query.bind(*arg);
    }
    query
}

/// Evaluate one page of a source specification.
///
/// The subquery is scanned in the driver's natural order; no ORDER BY is
/// added. Cursors therefore stay valid only as long as that order is stable,
/// which SQLite guarantees for an unmodified schema.
pub async fn paginate(
    pool: &SqlitePool,
    request: PaginationRequest,
) -> Result<Page, DatabaseError> {
    let PaginationRequest {
        source,
        before,
        after,
        first,
        mut last,
    } = request;

    // Forward windows win: a request carrying both keeps `first`.
    if first.is_some() && last.is_some() {
        last = None;
    }

    let (subquery, args) = source.subquery();
    debug!(subquery = %subquery, "paginating");

    let count_query = format!("SELECT count(*) FROM ({subquery})");
    let count: i64 = bind_all(sqlx::query(&count_query), &args)
        .fetch_one(pool)
        .await
        .map_err(DatabaseError::Delegate)
        .with_context("database error (count)".to_string())?
        .try_get(0)?;
    let count = count as u64;

    // 1-based positions of the cursor rows; 0 means "not found", which
    // produces an empty window below.
    let mut position_before: u64 = 0;
    let mut position_after: u64 = 0;
    if before.is_some() || after.is_some() {
        let mut predicates = vec![];
        let mut wanted = vec![];
        if let Some(id) = before {
            predicates.push("id = ?");
            wanted.push(id as i64);
        }
        if let Some(id) = after {
            predicates.push("id = ?");
            wanted.push(id as i64);
        }

        let positions_query = format!(
            "SELECT id, row_id FROM (SELECT id, row_number() OVER () AS row_id FROM ({subquery})) WHERE {}",
            predicates.join(" OR ")
        );
        let rows = bind_all(bind_all(sqlx::query(&positions_query), &args), &wanted)
            .fetch_all(pool)
            .await
            .map_err(DatabaseError::Delegate)
            .with_context("database error (positions)".to_string())?;

        for row in rows {
            let id: i64 = row.try_get(0)?;
            let row_id: i64 = row.try_get(1)?;

            if before == Some(id as u64) {
                position_before = row_id as u64;
            }
            if after == Some(id as u64) {
                position_after = row_id as u64;
            }
        }
    }

    // The window is 1-based and half-open: [begin, end).
    let mut begin: u64 = 1;
    let mut end: u64 = count + 1;
    if before.is_some() {
        end = position_before;
    }
    if after.is_some() {
        begin = position_after + 1;
    }
    if let Some(first) = first {
        end = (begin + first).min(count + 1);
    }
    if let Some(last) = last {
        begin = begin.max(1).max(end.saturating_sub(last));
    }

    let rows_query = format!(
        "SELECT id, row_id FROM (SELECT id, row_number() OVER () AS row_id FROM ({subquery})) \
         WHERE row_id >= ? AND row_id < ?"
    );
    let window = [begin as i64, end as i64];
    let rows = bind_all(bind_all(sqlx::query(&rows_query), &args), &window)
        .fetch_all(pool)
        .await
        .map_err(DatabaseError::Delegate)
        .with_context("database error (rows)".to_string())?;

    let mut ids = Vec::with_capacity(rows.len());
    for row in rows {
        let id: i64 = row.try_get(0)?;
        ids.push(u64::try_from(id).map_err(|_| {
            DatabaseError::Validation(format!("negative row id {id} in pagination source"))
        })?);
    }

    Ok(Page {
        ids,
        has_previous_page: begin > 1,
        has_next_page: end < count + 1,
    })
}
