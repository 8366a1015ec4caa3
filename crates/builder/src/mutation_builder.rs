// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The root `Mutation` type: `create<O>`, `update<O>` and `delete<O>` per
//! object, plus `associate`/`disassociate` per join-table pair.
//!
//! Input derivation per field kind:
//!
//! |            | create | update | delete |
//! |------------|--------|--------|--------|
//! | scalar `T!`| `T!`   | `T`    | omit   |
//! | scalar `T` | `T`    | `T`    | omit   |
//! | `ID!` (pk) | omit   | `ID!`  | `ID!`  |
//! | forward    | `ID`/`ID!` | `ID` | omit |
//! | backward   | omit   | omit   | omit   |
//! | joined     | separate associate/disassociate mutations |
//!
//! Every input additionally carries `clientMutationId: String!`, echoed in
//! the payload together with the affected object(s).

use std::collections::HashMap;
use std::sync::Arc;

use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, InputObject, InputValue, Object, ObjectAccessor, TypeRef,
};
use async_graphql::{Error, Value};
use sqlx::SqlitePool;
use tablegraph_model::{naming, ScalarType};

use tablegraph_sql::mutation::{self, AssociateRequest, AssociationEnd};
use tablegraph_sql::{
    CreateRequest, Cursor, DeleteRequest, FieldSpec, FieldSpecKind, SqlValue, UpdateRequest,
};

use crate::object_builder::scalar_type_ref;
use crate::system_builder::{AssociationInfo, MutationField, MutationFieldKind, ObjectInfo, ObjectSystem};

/// Request-scoped result of a mutation, consumed by the payload fields.
#[derive(Debug, Clone)]
struct MutationPayload {
    client_mutation_id: String,
    cursor: Option<Cursor>,
    referenced_cursor: Option<Cursor>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Operation {
    Create,
    Update,
    Delete,
}

/// The input type and requiredness of one field under one operation, `None`
/// when the field is omitted from that operation's input.
fn input_type(field: &MutationField, operation: Operation) -> Option<(TypeRef, bool)> {
    match (operation, &field.kind) {
        (Operation::Create, MutationFieldKind::PrimaryKey) => None,
        (Operation::Create, MutationFieldKind::Scalar(scalar)) => {
            Some((scalar_type_ref(*scalar, field.non_null), field.non_null))
        }
        (Operation::Create, MutationFieldKind::Reference { .. }) => Some((
            if field.non_null {
                TypeRef::named_nn(TypeRef::ID)
            } else {
                TypeRef::named(TypeRef::ID)
            },
            field.non_null,
        )),
        (Operation::Update, MutationFieldKind::PrimaryKey) => {
            Some((TypeRef::named_nn(TypeRef::ID), true))
        }
        (Operation::Update, MutationFieldKind::Scalar(scalar)) => {
            Some((scalar_type_ref(*scalar, false), false))
        }
        (Operation::Update, MutationFieldKind::Reference { .. }) => {
            Some((TypeRef::named(TypeRef::ID), false))
        }
        (Operation::Delete, MutationFieldKind::PrimaryKey) => {
            Some((TypeRef::named_nn(TypeRef::ID), true))
        }
        (Operation::Delete, _) => None,
    }
}

/// The fields participating in one operation, with their requiredness.
fn operation_fields(info: &ObjectInfo, operation: Operation) -> Vec<(MutationField, bool)> {
    info.mutation_fields
        .iter()
        .filter_map(|field| {
            input_type(field, operation).map(|(_, required)| (field.clone(), required))
        })
        .collect()
}

fn field_specs(
    fields: &[(MutationField, bool)],
    own_object: &str,
) -> HashMap<String, FieldSpec> {
    fields
        .iter()
        .map(|(field, required)| {
            let kind = match &field.kind {
                MutationFieldKind::Scalar(_) => FieldSpecKind::Scalar,
                MutationFieldKind::PrimaryKey => FieldSpecKind::PrimaryKey {
                    object: own_object.to_string(),
                },
                MutationFieldKind::Reference { object } => FieldSpecKind::Reference {
                    object: object.clone(),
                },
            };

            (
                field.input_name.clone(),
                FieldSpec {
                    column: field.column.clone(),
                    kind,
                    required: *required,
                },
            )
        })
        .collect()
}

/// Split the GraphQL input object into the echoed `clientMutationId` and the
/// engine-facing value list, coercing scalars by their declared kind.
fn collect_input(
    accessor: &ObjectAccessor<'_>,
    fields: &[(MutationField, bool)],
) -> Result<(String, Vec<(String, mutation::InputValue)>), Error> {
    let mut client_mutation_id = String::new();
    let mut values = vec![];

    for (name, value) in accessor.iter() {
        let name = name.as_str();
        if name == "clientMutationId" {
            client_mutation_id = value.string()?.to_string();
            continue;
        }

        let Some((field, _)) = fields.iter().find(|(f, _)| f.input_name == name) else {
            return Err(Error::new(format!("unexpected input field '{name}'")));
        };

        let value = if value.is_null() {
            mutation::InputValue::Scalar(SqlValue::Null)
        } else {
            match &field.kind {
                MutationFieldKind::Scalar(ScalarType::Int) => {
                    mutation::InputValue::Scalar(SqlValue::Integer(value.i64()?))
                }
                MutationFieldKind::Scalar(ScalarType::Float) => {
                    mutation::InputValue::Scalar(SqlValue::Real(value.f64()?))
                }
                MutationFieldKind::Scalar(ScalarType::Boolean) => {
                    mutation::InputValue::Scalar(SqlValue::Boolean(value.boolean()?))
                }
                MutationFieldKind::Scalar(ScalarType::String)
                | MutationFieldKind::Scalar(ScalarType::DateTime) => {
                    mutation::InputValue::Scalar(SqlValue::Text(value.string()?.to_string()))
                }
                MutationFieldKind::Scalar(ScalarType::Id)
                | MutationFieldKind::PrimaryKey
                | MutationFieldKind::Reference { .. } => {
                    mutation::InputValue::Id(value.string()?.to_string())
                }
            }
        };

        values.push((name.to_string(), value));
    }

    Ok((client_mutation_id, values))
}

fn client_mutation_id_field() -> Field {
    Field::new(
        "clientMutationId",
        TypeRef::named_nn(TypeRef::STRING),
        |ctx| {
            FieldFuture::new(async move {
                let payload = ctx.parent_value.try_downcast_ref::<MutationPayload>()?;
                Ok(Some(FieldValue::value(Value::from(
                    payload.client_mutation_id.clone(),
                ))))
            })
        },
    )
}

fn payload_object_field(
    name: &str,
    object_type: &str,
    pick: fn(&MutationPayload) -> &Option<Cursor>,
) -> Field {
    Field::new(name, TypeRef::named_nn(object_type), move |ctx| {
        FieldFuture::new(async move {
            let payload = ctx.parent_value.try_downcast_ref::<MutationPayload>()?;
            let cursor = pick(payload)
                .clone()
                .ok_or_else(|| Error::new("missing object in payload"))?;
            Ok(Some(FieldValue::owned_any(cursor)))
        })
    })
}

fn input_object(
    name: &str,
    fields: &[(MutationField, bool)],
    operation: Operation,
) -> InputObject {
    let mut input = InputObject::new(name).field(InputValue::new(
        "clientMutationId",
        TypeRef::named_nn(TypeRef::STRING),
    ));

    for (field, _) in fields {
        if let Some((ty, _)) = input_type(field, operation) {
            input = input.field(InputValue::new(field.input_name.as_str(), ty));
        }
    }

    input
}

fn create_field(info: &ObjectInfo) -> (Field, InputObject, Object) {
    let object_name = info.name.clone();
    let input_name = format!("Create{object_name}Input");
    let payload_name = format!("Create{object_name}Payload");

    let fields = Arc::new(operation_fields(info, Operation::Create));
    let input = input_object(&input_name, &fields, Operation::Create);

    let payload = Object::new(payload_name.as_str())
        .field(client_mutation_id_field())
        .field(payload_object_field(
            &naming::payload_field_name(&object_name),
            &object_name,
            |payload| &payload.cursor,
        ));

    let table = info.table.clone();
    let field = Field::new(
        format!("create{object_name}"),
        TypeRef::named_nn(payload_name.as_str()),
        move |ctx| {
            let object_name = object_name.clone();
            let table = table.clone();
            let fields = fields.clone();

            FieldFuture::new(async move {
                let input = ctx.args.try_get("input")?.object()?;
                let (client_mutation_id, values) = collect_input(&input, &fields)?;
                let pool = ctx.data::<SqlitePool>()?;

                let id = mutation::create(
                    pool,
                    CreateRequest {
                        table,
                        fields: field_specs(&fields, &object_name),
                        input: values,
                    },
                )
                .await
                .map_err(Error::new_with_source)?;

                Ok(Some(FieldValue::owned_any(MutationPayload {
                    client_mutation_id,
                    cursor: Some(Cursor::new(object_name, id)),
                    referenced_cursor: None,
                })))
            })
        },
    )
    .argument(InputValue::new("input", TypeRef::named_nn(input_name.as_str())));

    (field, input, payload)
}

fn update_field(info: &ObjectInfo) -> (Field, InputObject, Object) {
    let object_name = info.name.clone();
    let input_name = format!("Update{object_name}Input");
    let payload_name = format!("Update{object_name}Payload");

    let fields = Arc::new(operation_fields(info, Operation::Update));
    let input = input_object(&input_name, &fields, Operation::Update);

    let payload = Object::new(payload_name.as_str())
        .field(client_mutation_id_field())
        .field(payload_object_field(
            &naming::payload_field_name(&object_name),
            &object_name,
            |payload| &payload.cursor,
        ));

    let table = info.table.clone();
    let field = Field::new(
        format!("update{object_name}"),
        TypeRef::named_nn(payload_name.as_str()),
        move |ctx| {
            let object_name = object_name.clone();
            let table = table.clone();
            let fields = fields.clone();

            FieldFuture::new(async move {
                let input = ctx.args.try_get("input")?.object()?;
                let (client_mutation_id, values) = collect_input(&input, &fields)?;
                let pool = ctx.data::<SqlitePool>()?;

                let id = mutation::update(
                    pool,
                    UpdateRequest {
                        table,
                        fields: field_specs(&fields, &object_name),
                        input: values,
                    },
                )
                .await
                .map_err(Error::new_with_source)?;

                Ok(Some(FieldValue::owned_any(MutationPayload {
                    client_mutation_id,
                    cursor: Some(Cursor::new(object_name, id)),
                    referenced_cursor: None,
                })))
            })
        },
    )
    .argument(InputValue::new("input", TypeRef::named_nn(input_name.as_str())));

    (field, input, payload)
}

fn delete_field(info: &ObjectInfo) -> (Field, InputObject, Object) {
    let object_name = info.name.clone();
    let input_name = format!("Delete{object_name}Input");
    let payload_name = format!("Delete{object_name}Payload");

    let fields = Arc::new(operation_fields(info, Operation::Delete));
    let input = input_object(&input_name, &fields, Operation::Delete);

    // deletion leaves nothing to resolve; the payload only echoes
    let payload = Object::new(payload_name.as_str()).field(client_mutation_id_field());

    let table = info.table.clone();
    let field = Field::new(
        format!("delete{object_name}"),
        TypeRef::named_nn(payload_name.as_str()),
        move |ctx| {
            let object_name = object_name.clone();
            let table = table.clone();
            let fields = fields.clone();

            FieldFuture::new(async move {
                let input = ctx.args.try_get("input")?.object()?;
                let (client_mutation_id, values) = collect_input(&input, &fields)?;
                let pool = ctx.data::<SqlitePool>()?;

                mutation::delete(
                    pool,
                    DeleteRequest {
                        table,
                        fields: field_specs(&fields, &object_name),
                        input: values,
                    },
                )
                .await
                .map_err(Error::new_with_source)?;

                Ok(Some(FieldValue::owned_any(MutationPayload {
                    client_mutation_id,
                    cursor: None,
                    referenced_cursor: None,
                })))
            })
        },
    )
    .argument(InputValue::new("input", TypeRef::named_nn(input_name.as_str())));

    (field, input, payload)
}

fn association_field(info: &AssociationInfo, associate: bool) -> Field {
    let pair = format!("{}{}", info.first_object, info.second_object);
    let input_name = format!("Association{pair}Input");
    let payload_name = format!("Association{pair}Payload");
    let verb = if associate { "associate" } else { "disassociate" };

    let first_field = naming::association_input_field_name(&info.first_object);
    let second_field = naming::association_input_field_name(&info.second_object);
    let info = info.clone();

    Field::new(
        format!("{verb}{pair}"),
        TypeRef::named_nn(payload_name),
        move |ctx| {
            let info = info.clone();
            let first_field = first_field.clone();
            let second_field = second_field.clone();

            FieldFuture::new(async move {
                let input = ctx.args.try_get("input")?.object()?;
                let client_mutation_id = input.try_get("clientMutationId")?.string()?.to_string();
                let first_id = input.try_get(&first_field)?.string()?.to_string();
                let second_id = input.try_get(&second_field)?.string()?.to_string();
                let pool = ctx.data::<SqlitePool>()?;

                let request = AssociateRequest {
                    join_table: info.join_table,
                    own: AssociationEnd {
                        column: info.first_column,
                        object: info.first_object,
                        id: first_id,
                    },
                    foreign: AssociationEnd {
                        column: info.second_column,
                        object: info.second_object,
                        id: second_id,
                    },
                };

                let (own, foreign) = if associate {
                    mutation::associate(pool, request).await
                } else {
                    mutation::disassociate(pool, request).await
                }
                .map_err(Error::new_with_source)?;

                Ok(Some(FieldValue::owned_any(MutationPayload {
                    client_mutation_id,
                    cursor: Some(own),
                    referenced_cursor: Some(foreign),
                })))
            })
        },
    )
    .argument(InputValue::new("input", TypeRef::named_nn(input_name)))
}

fn association_types(info: &AssociationInfo) -> (InputObject, Object) {
    let pair = format!("{}{}", info.first_object, info.second_object);

    let input = InputObject::new(format!("Association{pair}Input"))
        .field(InputValue::new(
            "clientMutationId",
            TypeRef::named_nn(TypeRef::STRING),
        ))
        .field(InputValue::new(
            naming::association_input_field_name(&info.first_object),
            TypeRef::named_nn(TypeRef::ID),
        ))
        .field(InputValue::new(
            naming::association_input_field_name(&info.second_object),
            TypeRef::named_nn(TypeRef::ID),
        ));

    let payload = Object::new(format!("Association{pair}Payload"))
        .field(client_mutation_id_field())
        .field(payload_object_field(
            &naming::payload_field_name(&info.first_object),
            &info.first_object,
            |payload| &payload.cursor,
        ))
        .field(payload_object_field(
            &naming::payload_field_name(&info.second_object),
            &info.second_object,
            |payload| &payload.referenced_cursor,
        ));

    (input, payload)
}

pub(crate) fn build_mutation(
    system: &ObjectSystem,
) -> (Object, Vec<InputObject>, Vec<Object>) {
    let mut mutation = Object::new("Mutation");
    let mut inputs = vec![];
    let mut payloads = vec![];

    for object in &system.objects {
        for build in [create_field, update_field, delete_field] {
            let (field, input, payload) = build(object);
            mutation = mutation.field(field);
            inputs.push(input);
            payloads.push(payload);
        }
    }

    for association in &system.associations {
        let (input, payload) = association_types(association);
        inputs.push(input);
        payloads.push(payload);

        mutation = mutation.field(association_field(association, true));
        mutation = mutation.field(association_field(association, false));
    }

    (mutation, inputs, payloads)
}
