// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Per-object type emission: the object itself plus its edge and connection
//! wrappers, with resolvers that translate each field access into exactly
//! one point or paginated query.

use async_graphql::dynamic::{Field, FieldFuture, FieldValue, Object, TypeRef};
use async_graphql::{Error, Value};
use sqlx::SqlitePool;
use tablegraph_model::ScalarType;

use tablegraph_sql::pagination::{paginate, PaginationRequest, PaginationSource};
use tablegraph_sql::{Cursor, ScalarRead};

use crate::relay::{self, Connection};
use crate::system_builder::{FieldInfo, ObjectInfo};
use crate::DATE_TIME_SCALAR;

pub(crate) fn build_objects(info: &ObjectInfo) -> Vec<Object> {
    vec![
        object_type(info),
        edge_type(&info.name),
        connection_type(&info.name),
    ]
}

pub(crate) fn scalar_type_ref(scalar: ScalarType, non_null: bool) -> TypeRef {
    let name = match scalar {
        ScalarType::Int => TypeRef::INT,
        ScalarType::Float => TypeRef::FLOAT,
        ScalarType::String => TypeRef::STRING,
        ScalarType::Boolean => TypeRef::BOOLEAN,
        ScalarType::Id => TypeRef::ID,
        ScalarType::DateTime => DATE_TIME_SCALAR,
    };

    if non_null {
        TypeRef::named_nn(name)
    } else {
        TypeRef::named(name)
    }
}

fn object_type(info: &ObjectInfo) -> Object {
    let mut object = Object::new(info.name.as_str());

    // a table without a primary key derives no identifier field and cannot
    // satisfy the Node capability
    let has_id = info
        .fields
        .iter()
        .any(|f| matches!(f, FieldInfo::Scalar { scalar: ScalarType::Id, .. }));
    if has_id {
        object = object.implement("Node");
    }

    for field in &info.fields {
        object = object.field(match field {
            FieldInfo::Scalar {
                name,
                scalar,
                non_null,
                column,
            } => scalar_field(info, name, *scalar, *non_null, column),
            FieldInfo::Forward {
                name,
                referenced_object,
                non_null,
                column,
            } => forward_field(info, name, referenced_object, *non_null, column),
            FieldInfo::Backward {
                name,
                referenced_object,
                foreign_table,
                reference_column,
                return_column,
            } => backward_field(
                name,
                referenced_object,
                foreign_table,
                reference_column,
                return_column,
            ),
            FieldInfo::Joined {
                name,
                referenced_object,
                join_table,
                own_column,
                foreign_column,
            } => joined_field(name, referenced_object, join_table, own_column, foreign_column),
        });
    }

    object
}

/// Identifier fields echo the parent cursor without touching the database;
/// every other scalar is a nullable-aware point read.
fn scalar_field(
    info: &ObjectInfo,
    name: &str,
    scalar: ScalarType,
    non_null: bool,
    column: &str,
) -> Field {
    if scalar == ScalarType::Id {
        return Field::new(name, TypeRef::named_nn(TypeRef::ID), |ctx| {
            FieldFuture::new(async move {
                let cursor = ctx.parent_value.try_downcast_ref::<Cursor>()?;
                Ok(Some(FieldValue::value(Value::from(cursor.encode()))))
            })
        });
    }

    let table = info.table.clone();
    let key_column = info.key_column.clone();
    let column = column.to_string();

    Field::new(name, scalar_type_ref(scalar, non_null), move |ctx| {
        let table = table.clone();
        let key_column = key_column.clone();
        let column = column.clone();

        FieldFuture::new(async move {
            let cursor = ctx.parent_value.try_downcast_ref::<Cursor>()?;
            let pool = ctx.data::<SqlitePool>()?;
            let read = ScalarRead {
                table: &table,
                key_column: &key_column,
                column: &column,
                id: cursor.id(),
            };

            let value = match scalar {
                ScalarType::Int => read
                    .integer(pool)
                    .await
                    .map_err(Error::new_with_source)?
                    .map(Value::from),
                ScalarType::Float => read
                    .real(pool)
                    .await
                    .map_err(Error::new_with_source)?
                    .map(Value::from),
                ScalarType::Boolean => read
                    .boolean(pool)
                    .await
                    .map_err(Error::new_with_source)?
                    .map(Value::from),
                ScalarType::DateTime => read
                    .date_time(pool)
                    .await
                    .map_err(Error::new_with_source)?
                    .map(|value| Value::from(value.format("%Y-%m-%dT%H:%M:%S").to_string())),
                // TEXT and BLOB columns both surface as strings
                ScalarType::String | ScalarType::Id => read
                    .text(pool)
                    .await
                    .map_err(Error::new_with_source)?
                    .map(Value::from),
            };

            Ok(value.map(FieldValue::value))
        })
    })
}

/// A forward reference reads its foreign-key column and re-wraps the value
/// as a cursor of the referenced object; a null column is a null field.
fn forward_field(
    info: &ObjectInfo,
    name: &str,
    referenced_object: &str,
    non_null: bool,
    column: &str,
) -> Field {
    let ty = if non_null {
        TypeRef::named_nn(referenced_object)
    } else {
        TypeRef::named(referenced_object)
    };

    let table = info.table.clone();
    let key_column = info.key_column.clone();
    let column = column.to_string();
    let referenced_object = referenced_object.to_string();

    Field::new(name, ty, move |ctx| {
        let table = table.clone();
        let key_column = key_column.clone();
        let column = column.clone();
        let referenced_object = referenced_object.clone();

        FieldFuture::new(async move {
            let cursor = ctx.parent_value.try_downcast_ref::<Cursor>()?;
            let pool = ctx.data::<SqlitePool>()?;

            let value = ScalarRead {
                table: &table,
                key_column: &key_column,
                column: &column,
                id: cursor.id(),
            }
            .integer(pool)
            .await
            .map_err(Error::new_with_source)?;

            Ok(match value {
                Some(id) => {
                    let id = u64::try_from(id)
                        .map_err(|_| Error::new(format!("negative reference id {id}")))?;
                    Some(FieldValue::owned_any(Cursor::new(
                        referenced_object.clone(),
                        id,
                    )))
                }
                None => None,
            })
        })
    })
}

fn backward_field(
    name: &str,
    referenced_object: &str,
    foreign_table: &str,
    reference_column: &str,
    return_column: &str,
) -> Field {
    let referenced_object = referenced_object.to_string();
    let foreign_table = foreign_table.to_string();
    let reference_column = reference_column.to_string();
    let return_column = return_column.to_string();

    let field = Field::new(
        name,
        TypeRef::named_nn(format!("{referenced_object}Connection")),
        move |ctx| {
            let referenced_object = referenced_object.clone();
            let foreign_table = foreign_table.clone();
            let reference_column = reference_column.clone();
            let return_column = return_column.clone();

            FieldFuture::new(async move {
                let parent = ctx.parent_value.try_downcast_ref::<Cursor>()?;
                let arguments = relay::parse_connection_arguments(&ctx, &referenced_object)?;
                let pool = ctx.data::<SqlitePool>()?;

                let page = paginate(
                    pool,
                    PaginationRequest {
                        source: PaginationSource::Backward {
                            foreign_table,
                            reference_column,
                            return_column,
                            parent_id: parent.id(),
                        },
                        before: arguments.before,
                        after: arguments.after,
                        first: arguments.first,
                        last: arguments.last,
                    },
                )
                .await
                .map_err(Error::new_with_source)?;

                Ok(Some(FieldValue::owned_any(Connection::new(
                    &referenced_object,
                    page,
                ))))
            })
        },
    );

    relay::with_connection_arguments(field)
}

fn joined_field(
    name: &str,
    referenced_object: &str,
    join_table: &str,
    own_column: &str,
    foreign_column: &str,
) -> Field {
    let referenced_object = referenced_object.to_string();
    let join_table = join_table.to_string();
    let own_column = own_column.to_string();
    let foreign_column = foreign_column.to_string();

    let field = Field::new(
        name,
        TypeRef::named_nn(format!("{referenced_object}Connection")),
        move |ctx| {
            let referenced_object = referenced_object.clone();
            let join_table = join_table.clone();
            let own_column = own_column.clone();
            let foreign_column = foreign_column.clone();

            FieldFuture::new(async move {
                let parent = ctx.parent_value.try_downcast_ref::<Cursor>()?;
                let arguments = relay::parse_connection_arguments(&ctx, &referenced_object)?;
                let pool = ctx.data::<SqlitePool>()?;

                let page = paginate(
                    pool,
                    PaginationRequest {
                        source: PaginationSource::Joined {
                            join_table,
                            own_column,
                            foreign_column,
                            parent_id: parent.id(),
                        },
                        before: arguments.before,
                        after: arguments.after,
                        first: arguments.first,
                        last: arguments.last,
                    },
                )
                .await
                .map_err(Error::new_with_source)?;

                Ok(Some(FieldValue::owned_any(Connection::new(
                    &referenced_object,
                    page,
                ))))
            })
        },
    );

    relay::with_connection_arguments(field)
}

fn edge_type(object_name: &str) -> Object {
    Object::new(format!("{object_name}Edge"))
        .description("An edge in a connection.")
        .field(Field::new(
            "node",
            TypeRef::named_nn(object_name),
            |ctx| {
                FieldFuture::new(async move {
                    let cursor = ctx.parent_value.try_downcast_ref::<Cursor>()?;
                    Ok(Some(FieldValue::owned_any(cursor.clone())))
                })
            },
        ))
        .field(Field::new("cursor", TypeRef::named_nn(TypeRef::ID), |ctx| {
            FieldFuture::new(async move {
                let cursor = ctx.parent_value.try_downcast_ref::<Cursor>()?;
                Ok(Some(FieldValue::value(Value::from(cursor.encode()))))
            })
        }))
}

fn connection_type(object_name: &str) -> Object {
    Object::new(format!("{object_name}Connection"))
        .description("A connection to a list of items.")
        .field(Field::new(
            "pageInfo",
            TypeRef::named_nn("PageInfo"),
            |ctx| {
                FieldFuture::new(async move {
                    let connection = ctx.parent_value.try_downcast_ref::<Connection>()?;
                    Ok(Some(FieldValue::owned_any(connection.clone())))
                })
            },
        ))
        .field(Field::new(
            "edges",
            TypeRef::named_nn_list_nn(format!("{object_name}Edge")),
            |ctx| {
                FieldFuture::new(async move {
                    let connection = ctx.parent_value.try_downcast_ref::<Connection>()?;
                    Ok(Some(FieldValue::list(
                        connection.edges.iter().cloned().map(FieldValue::owned_any),
                    )))
                })
            },
        ))
}
