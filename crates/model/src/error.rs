// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use thiserror::Error;

/// Errors while normalizing table-definition statements.
#[derive(Error, Debug)]
pub enum DdlError {
    #[error("failed to parse statement '{statement}': {source}")]
    Parse {
        statement: String,
        source: sqlparser::parser::ParserError,
    },

    #[error("missing table name in statement '{0}'")]
    MissingTableName(String),

    #[error("missing column name in table '{0}'")]
    MissingColumnName(String),

    #[error("foreign key on column '{table}.{column}' has no target table")]
    MissingForeignKeyTable { table: String, column: String },

    #[error(
        "foreign key on column '{table}.{column}' references {count} columns (expected exactly 1)"
    )]
    ForeignKeyTargetColumns {
        table: String,
        column: String,
        count: usize,
    },

    #[error("foreign key constraint on table '{table}' names {count} columns (expected exactly 1)")]
    ForeignKeySourceColumns { table: String, count: usize },
}

/// Fatal errors while deriving the property graph. Any of these stops the
/// process at startup.
#[derive(Error, Debug)]
pub enum GraphBuildError {
    #[error(transparent)]
    Ddl(#[from] DdlError),

    #[error("failed to find table '{table}' referenced by foreign key of column '{column}'")]
    UnresolvedForeignKeyTable { table: String, column: String },

    #[error("failed to find exactly one column '{table}.{column}' referenced by a foreign key")]
    UnresolvedForeignKeyColumn { table: String, column: String },

    #[error("missing object for table '{0}'")]
    MissingObject(String),

    #[error("field '{field}' already exists in object '{object}'")]
    DuplicateField { object: String, field: String },

    #[error("join table '{0}' does not have exactly two foreign-key columns")]
    MalformedJoinTable(String),
}
