// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::HashMap;

use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqlitePool};
use thiserror::Error;
use tracing::debug;

use crate::cursor::{Cursor, CursorError};
use crate::database_error::{DatabaseError, WithContext};

#[derive(Error, Debug)]
pub enum MutationError {
    #[error("{0}")]
    Cursor(#[from] CursorError),

    #[error("{0}")]
    Database(#[from] DatabaseError),

    #[error("unexpected input field '{0}'")]
    UnknownField(String),

    #[error("missing required input field '{0}'")]
    MissingField(String),

    #[error("missing identification field")]
    MissingPrimaryKey,
}

/// A positional SQL parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Integer(i64),
    Real(f64),
    Text(String),
    Boolean(bool),
    Null,
}

/// One client-supplied input value: either an already-coerced scalar or an
/// opaque identifier still to be decoded and type-checked by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    Scalar(SqlValue),
    Id(String),
}

/// What an operation knows about one input field, independent of the
/// property graph it was derived from.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub column: String,
    pub kind: FieldSpecKind,
    pub required: bool,
}

#[derive(Debug, Clone)]
pub enum FieldSpecKind {
    Scalar,
    /// The row identifier; its cursor must carry the operation's own object.
    PrimaryKey { object: String },
    /// A forward reference; its cursor must carry the referenced object.
    Reference { object: String },
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q SqlValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Integer(v) => query.bind(*v),
        SqlValue::Real(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.as_str()),
        SqlValue::Boolean(v) => query.bind(*v),
        SqlValue::Null => query.bind(Option::<i64>::None),
    }
}

/// Decode the engine-facing value of one input, enforcing the embedded
/// object name on identifier inputs. The decoded cursor (if any) is returned
/// alongside so callers can echo it in payloads.
fn resolve_input(
    spec: &FieldSpec,
    value: &InputValue,
) -> Result<(SqlValue, Option<Cursor>), MutationError> {
    match (value, &spec.kind) {
        (InputValue::Scalar(value), _) => Ok((value.clone(), None)),
        (InputValue::Id(opaque), FieldSpecKind::PrimaryKey { object })
        | (InputValue::Id(opaque), FieldSpecKind::Reference { object }) => {
            let cursor = Cursor::decode_expecting(opaque, object)?;
            Ok((SqlValue::Integer(cursor.id() as i64), Some(cursor)))
        }
        (InputValue::Id(opaque), FieldSpecKind::Scalar) => {
            Err(CursorError::Invalid(opaque.clone()).into())
        }
    }
}

/// Validate an input set against its field specifications: every present
/// field must be known, every required field must be present.
fn validate(
    fields: &HashMap<String, FieldSpec>,
    input: &[(String, InputValue)],
) -> Result<(), MutationError> {
    for (name, _) in input {
        if !fields.contains_key(name) {
            return Err(MutationError::UnknownField(name.clone()));
        }
    }

    for (name, spec) in fields {
        if spec.required && !input.iter().any(|(n, _)| n == name) {
            return Err(MutationError::MissingField(name.clone()));
        }
    }

    Ok(())
}

/// `INSERT INTO <table> (<cols>) VALUES (?…)`, returning the created row id.
pub struct CreateRequest {
    pub table: String,
    pub fields: HashMap<String, FieldSpec>,
    pub input: Vec<(String, InputValue)>,
}

pub async fn create(pool: &SqlitePool, request: CreateRequest) -> Result<u64, MutationError> {
    validate(&request.fields, &request.input)?;

    let mut columns = vec![];
    let mut values = vec![];
    for (name, value) in &request.input {
        let spec = &request.fields[name];
        let (value, _) = resolve_input(spec, value)?;
        columns.push(crate::quote_ident(&spec.column));
        values.push(value);
    }

    let statement = if columns.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", crate::quote_ident(&request.table))
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            crate::quote_ident(&request.table),
            columns.join(", "),
            vec!["?"; columns.len()].join(", ")
        )
    };

    debug!(statement = %statement, "executing create");

    let mut query = sqlx::query(&statement);
    for value in &values {
        query = bind_value(query, value);
    }

    let result = query
        .execute(pool)
        .await
        .map_err(DatabaseError::Delegate)
        .with_context("database error (create)".to_string())?;

    Ok(result.last_insert_rowid() as u64)
}

/// `UPDATE <table> SET <col=?,…> WHERE <pk>=?`, returning the row id the
/// primary-key input decoded to.
///
/// An update whose input carries no non-key columns writes nothing and
/// succeeds.
pub struct UpdateRequest {
    pub table: String,
    pub fields: HashMap<String, FieldSpec>,
    pub input: Vec<(String, InputValue)>,
}

pub async fn update(pool: &SqlitePool, request: UpdateRequest) -> Result<u64, MutationError> {
    validate(&request.fields, &request.input)?;

    let mut key: Option<(String, Cursor)> = None;
    let mut assignments = vec![];
    let mut values = vec![];
    for (name, value) in &request.input {
        let spec = &request.fields[name];
        let (value, cursor) = resolve_input(spec, value)?;

        if let FieldSpecKind::PrimaryKey { .. } = spec.kind {
            key = cursor.map(|cursor| (spec.column.clone(), cursor));
        } else {
            assignments.push(format!("{} = ?", crate::quote_ident(&spec.column)));
            values.push(value);
        }
    }

    let (key_column, key_cursor) = key.ok_or(MutationError::MissingPrimaryKey)?;

    if assignments.is_empty() {
        return Ok(key_cursor.id());
    }

    let statement = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        crate::quote_ident(&request.table),
        assignments.join(", "),
        crate::quote_ident(&key_column)
    );
    debug!(statement = %statement, "executing update");

    let mut query = sqlx::query(&statement);
    for value in &values {
        query = bind_value(query, value);
    }
    query
        .bind(key_cursor.id() as i64)
        .execute(pool)
        .await
        .map_err(DatabaseError::Delegate)
        .with_context("database error (update)".to_string())?;

    Ok(key_cursor.id())
}

/// `DELETE FROM <table> WHERE <pk>=?`.
pub struct DeleteRequest {
    pub table: String,
    pub fields: HashMap<String, FieldSpec>,
    pub input: Vec<(String, InputValue)>,
}

pub async fn delete(pool: &SqlitePool, request: DeleteRequest) -> Result<(), MutationError> {
    validate(&request.fields, &request.input)?;

    let mut key: Option<(String, Cursor)> = None;
    for (name, value) in &request.input {
        let spec = &request.fields[name];
        let (_, cursor) = resolve_input(spec, value)?;

        if let FieldSpecKind::PrimaryKey { .. } = spec.kind {
            key = cursor.map(|cursor| (spec.column.clone(), cursor));
        }
    }

    let (key_column, key_cursor) = key.ok_or(MutationError::MissingPrimaryKey)?;

    let statement = format!(
        "DELETE FROM {} WHERE {} = ?",
        crate::quote_ident(&request.table),
        crate::quote_ident(&key_column)
    );
    sqlx::query(&statement)
        .bind(key_cursor.id() as i64)
        .execute(pool)
        .await
        .map_err(DatabaseError::Delegate)
        .with_context("database error (delete)".to_string())?;

    Ok(())
}

/// One side of a join-table row: the column to write, the object the
/// identifier must carry, and the opaque identifier itself.
pub struct AssociationEnd {
    pub column: String,
    pub object: String,
    pub id: String,
}

/// `INSERT INTO <join table> (<own>,<foreign>) VALUES (?,?)` or the matching
/// `DELETE`. Both identifiers are decoded and type-checked before any SQL.
pub struct AssociateRequest {
    pub join_table: String,
    pub own: AssociationEnd,
    pub foreign: AssociationEnd,
}

impl AssociateRequest {
    fn decode_ends(&self) -> Result<(Cursor, Cursor), MutationError> {
        let own = Cursor::decode_expecting(&self.own.id, &self.own.object)?;
        let foreign = Cursor::decode_expecting(&self.foreign.id, &self.foreign.object)?;
        Ok((own, foreign))
    }
}

pub async fn associate(
    pool: &SqlitePool,
    request: AssociateRequest,
) -> Result<(Cursor, Cursor), MutationError> {
    let (own, foreign) = request.decode_ends()?;

    let statement = format!(
        "INSERT INTO {} ({}, {}) VALUES (?, ?)",
        crate::quote_ident(&request.join_table),
        crate::quote_ident(&request.own.column),
        crate::quote_ident(&request.foreign.column)
    );
    sqlx::query(&statement)
        .bind(own.id() as i64)
        .bind(foreign.id() as i64)
        .execute(pool)
        .await
        .map_err(DatabaseError::Delegate)
        .with_context("database error (associate)".to_string())?;

    Ok((own, foreign))
}

pub async fn disassociate(
    pool: &SqlitePool,
    request: AssociateRequest,
) -> Result<(Cursor, Cursor), MutationError> {
    let (own, foreign) = request.decode_ends()?;

    let statement = format!(
        "DELETE FROM {} WHERE {} = ? AND {} = ?",
        crate::quote_ident(&request.join_table),
        crate::quote_ident(&request.own.column),
        crate::quote_ident(&request.foreign.column)
    );
    sqlx::query(&statement)
        .bind(own.id() as i64)
        .bind(foreign.id() as i64)
        .execute(pool)
        .await
        .map_err(DatabaseError::Delegate)
        .with_context("database error (disassociate)".to_string())?;

    Ok((own, foreign))
}
