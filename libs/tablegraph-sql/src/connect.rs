// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::database_error::DatabaseError;

const TABLE_STATEMENTS_QUERY: &str = "SELECT sql FROM sqlite_master WHERE type = 'table'";

/// Create a connection pool for the given database URL (`sqlite://...` or a
/// plain file path).
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, DatabaseError> {
    if database_url.is_empty() {
        return Err(DatabaseError::Config("empty database URL".to_string()));
    }

    Ok(SqlitePoolOptions::new().connect(database_url).await?)
}

/// Fetch the table-definition statements describing the live schema.
///
/// Entries without stored SQL (some internal tables) are skipped.
pub async fn schema_statements(pool: &SqlitePool) -> Result<Vec<String>, DatabaseError> {
    let rows = sqlx::query(TABLE_STATEMENTS_QUERY).fetch_all(pool).await?;

    let mut statements = Vec::with_capacity(rows.len());
    for row in rows {
        if let Some(sql) = row.try_get::<Option<String>, _>(0)? {
            statements.push(sql);
        }
    }

    Ok(statements)
}
