// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Normalization of `CREATE TABLE` statements into plain table records.
//!
//! Parsing is delegated to `sqlparser`; this module only folds the parts the
//! classifier needs out of the AST: per-column affinity, nullability,
//! primary-key flags and single-column foreign keys. Table-level constraints
//! fold into the column they name.

use sqlparser::ast::{ColumnOption, ObjectName, ObjectNamePart, Statement, TableConstraint};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

use crate::error::DdlError;

/// Tables whose names start with this prefix belong to the storage engine
/// and are skipped.
const RESERVED_TABLE_PREFIX: &str = "sqlite_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyRecord {
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRecord {
    pub name: String,
    pub value_type: Option<String>,
    pub is_non_null: bool,
    pub is_primary_key: bool,
    pub foreign_key: Option<ForeignKeyRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRecord {
    pub name: String,
    pub columns: Vec<ColumnRecord>,
}

fn last_name_part(name: &ObjectName) -> Option<String> {
    name.0.last().and_then(|part| match part {
        ObjectNamePart::Identifier(ident) => Some(ident.value.clone()),
        _ => None,
    })
}

fn foreign_key_target(
    table: &str,
    column: &str,
    foreign_table: &ObjectName,
    referred_columns: &[sqlparser::ast::Ident],
) -> Result<ForeignKeyRecord, DdlError> {
    let target_table = last_name_part(foreign_table).ok_or_else(|| DdlError::MissingForeignKeyTable {
        table: table.to_string(),
        column: column.to_string(),
    })?;

    if referred_columns.len() != 1 {
        return Err(DdlError::ForeignKeyTargetColumns {
            table: table.to_string(),
            column: column.to_string(),
            count: referred_columns.len(),
        });
    }

    Ok(ForeignKeyRecord {
        table: target_table,
        column: referred_columns[0].value.clone(),
    })
}

fn table_record(
    name: String,
    columns: &[sqlparser::ast::ColumnDef],
    constraints: &[TableConstraint],
) -> Result<TableRecord, DdlError> {
    let mut records = Vec::with_capacity(columns.len());

    for column in columns {
        let column_name = column.name.value.clone();
        if column_name.is_empty() {
            return Err(DdlError::MissingColumnName(name));
        }

        let raw_type = column.data_type.to_string();
        let mut record = ColumnRecord {
            name: column_name.clone(),
            value_type: (!raw_type.is_empty()).then_some(raw_type),
            is_non_null: false,
            is_primary_key: false,
            foreign_key: None,
        };

        for option in &column.options {
            match &option.option {
                ColumnOption::NotNull => record.is_non_null = true,
                ColumnOption::Unique { is_primary, .. } if *is_primary => {
                    record.is_primary_key = true
                }
                ColumnOption::ForeignKey {
                    foreign_table,
                    referred_columns,
                    ..
                } => {
                    record.foreign_key = Some(foreign_key_target(
                        &name,
                        &column_name,
                        foreign_table,
                        referred_columns,
                    )?);
                }
                _ => {}
            }
        }

        records.push(record);
    }

    for constraint in constraints {
        match constraint {
            TableConstraint::PrimaryKey { columns, .. } if columns.len() == 1 => {
                let key = columns[0].value.clone();
                if let Some(record) = records.iter_mut().find(|r| r.name == key) {
                    record.is_primary_key = true;
                }
            }
            TableConstraint::ForeignKey {
                columns,
                foreign_table,
                referred_columns,
                ..
            } => {
                if columns.len() != 1 {
                    return Err(DdlError::ForeignKeySourceColumns {
                        table: name,
                        count: columns.len(),
                    });
                }

                let key = columns[0].value.clone();
                let target = foreign_key_target(&name, &key, foreign_table, referred_columns)?;
                if let Some(record) = records.iter_mut().find(|r| r.name == key) {
                    record.foreign_key = Some(target);
                }
            }
            _ => {}
        }
    }

    Ok(TableRecord {
        name,
        columns: records,
    })
}

/// Normalize a sequence of table-definition statements. Statements that do
/// not define a table, and tables reserved by the storage engine, are
/// skipped.
pub fn ingest(statements: &[String]) -> Result<Vec<TableRecord>, DdlError> {
    let dialect = SQLiteDialect {};
    let mut records = vec![];

    for sql in statements {
        let parsed = Parser::parse_sql(&dialect, sql).map_err(|source| DdlError::Parse {
            statement: sql.clone(),
            source,
        })?;

        for statement in parsed {
            let Statement::CreateTable(create) = statement else {
                continue;
            };

            let name = last_name_part(&create.name)
                .ok_or_else(|| DdlError::MissingTableName(sql.clone()))?;
            if name.starts_with(RESERVED_TABLE_PREFIX) {
                tracing::debug!(table = %name, "skipping reserved table");
                continue;
            }

            records.push(table_record(name, &create.columns, &create.constraints)?);
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingest_one(sql: &str) -> TableRecord {
        let mut records = ingest(&[sql.to_string()]).unwrap();
        assert_eq!(records.len(), 1);
        records.remove(0)
    }

    #[test]
    fn columns_with_inline_options() {
        let record = ingest_one(
            "CREATE TABLE concerts (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                price REAL,
                venue_id INTEGER REFERENCES venues(id)
            )",
        );

        assert_eq!(record.name, "concerts");
        assert_eq!(record.columns.len(), 4);

        let id = &record.columns[0];
        assert!(id.is_primary_key);
        assert_eq!(id.value_type.as_deref(), Some("INTEGER"));

        let title = &record.columns[1];
        assert!(title.is_non_null);
        assert!(!title.is_primary_key);

        let venue = &record.columns[3];
        assert_eq!(
            venue.foreign_key,
            Some(ForeignKeyRecord {
                table: "venues".to_string(),
                column: "id".to_string(),
            })
        );
    }

    #[test]
    fn table_level_constraints_fold_into_columns() {
        let record = ingest_one(
            "CREATE TABLE concerts (
                id INTEGER,
                venue_id INTEGER,
                PRIMARY KEY (id),
                FOREIGN KEY (venue_id) REFERENCES venues(id)
            )",
        );

        assert!(record.columns[0].is_primary_key);
        assert_eq!(
            record.columns[1].foreign_key,
            Some(ForeignKeyRecord {
                table: "venues".to_string(),
                column: "id".to_string(),
            })
        );
    }

    #[test]
    fn multi_column_foreign_keys_are_rejected() {
        let result = ingest(&["CREATE TABLE t (a INTEGER, b INTEGER, FOREIGN KEY (a, b) REFERENCES u(x, y))"
            .to_string()]);
        assert!(matches!(
            result,
            Err(DdlError::ForeignKeySourceColumns { count: 2, .. })
        ));

        let result = ingest(&["CREATE TABLE t (a INTEGER REFERENCES u(x, y))".to_string()]);
        assert!(matches!(
            result,
            Err(DdlError::ForeignKeyTargetColumns { count: 2, .. })
        ));
    }

    #[test]
    fn reserved_tables_are_skipped() {
        let records = ingest(&[
            "CREATE TABLE sqlite_sequence (name TEXT, seq INTEGER)".to_string(),
            "CREATE TABLE venues (id INTEGER PRIMARY KEY)".to_string(),
        ])
        .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "venues");
    }

    #[test]
    fn non_table_statements_are_ignored() {
        let records = ingest(&["SELECT 1".to_string()]).unwrap();
        assert!(records.is_empty());
    }
}
