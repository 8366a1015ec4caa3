// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use chrono::NaiveDateTime;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use crate::database_error::{DatabaseError, WithContext};

/// A point read of one column of one row: `SELECT <column> FROM <table>
/// WHERE <key_column> = ?`.
///
/// A null column value, like an absent row, decodes to `None`.
pub struct ScalarRead<'a> {
    pub table: &'a str,
    pub key_column: &'a str,
    pub column: &'a str,
    pub id: u64,
}

macro_rules! scalar_reader {
    ($name:ident, $ty:ty) => {
        pub async fn $name(&self, pool: &SqlitePool) -> Result<Option<$ty>, DatabaseError> {
            let query = format!(
                "SELECT {} FROM {} WHERE {} = ?",
                crate::quote_ident(self.column),
                crate::quote_ident(self.table),
                crate::quote_ident(self.key_column)
            );

            let row = sqlx::query(&query)
                .bind(self.id as i64)
                .fetch_optional(pool)
                .await
                .map_err(DatabaseError::Delegate)
                .with_context("database error (scalar)".to_string())?;

            match row {
                Some(row) => Ok(row.try_get::<Option<$ty>, _>(0)?),
                None => Ok(None),
            }
        }
    };
}

impl ScalarRead<'_> {
    scalar_reader!(integer, i64);
    scalar_reader!(real, f64);
    scalar_reader!(text, String);
    scalar_reader!(boolean, bool);
    scalar_reader!(date_time, NaiveDateTime);
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn fixture() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        sqlx::query("CREATE TABLE artists (id INTEGER PRIMARY KEY, name TEXT, rating REAL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO artists (id, name, rating) VALUES (1, 'Ella', 4.5), (2, NULL, NULL)")
            .execute(&pool)
            .await
            .unwrap();

        pool
    }

    fn read<'a>(column: &'a str, id: u64) -> ScalarRead<'a> {
        ScalarRead {
            table: "artists",
            key_column: "id",
            column,
            id,
        }
    }

    #[tokio::test]
    async fn reads_values() {
        let pool = fixture().await;

        assert_eq!(read("name", 1).text(&pool).await.unwrap(), Some("Ella".to_string()));
        assert_eq!(read("rating", 1).real(&pool).await.unwrap(), Some(4.5));
        assert_eq!(read("id", 2).integer(&pool).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn null_and_missing_rows_decode_to_none() {
        let pool = fixture().await;

        assert_eq!(read("name", 2).text(&pool).await.unwrap(), None);
        assert_eq!(read("name", 99).text(&pool).await.unwrap(), None);
    }
}
