// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The root `Query` type: one paginated collection per object plus the
//! polymorphic `node` lookup.

use std::collections::HashSet;
use std::sync::Arc;

use async_graphql::dynamic::{Field, FieldFuture, FieldValue, InputValue, Object, TypeRef};
use async_graphql::Error;
use sqlx::SqlitePool;
use tablegraph_model::naming;

use tablegraph_sql::pagination::{paginate, PaginationRequest, PaginationSource};
use tablegraph_sql::Cursor;

use crate::relay::{self, Connection};
use crate::system_builder::ObjectSystem;

pub(crate) fn build_query(system: &ObjectSystem) -> Object {
    let mut query = Object::new("Query");

    for object in &system.objects {
        query = query.field(collection_field(
            &object.name,
            &object.table,
            &object.key_column,
        ));
    }

    query.field(node_field(
        system.objects.iter().map(|o| o.name.clone()).collect(),
    ))
}

fn collection_field(object_name: &str, table: &str, key_column: &str) -> Field {
    let object_name = object_name.to_string();
    let table = table.to_string();
    let key_column = key_column.to_string();

    let field = Field::new(
        naming::collection_field_name(&object_name),
        TypeRef::named_nn(format!("{object_name}Connection")),
        move |ctx| {
            let object_name = object_name.clone();
            let table = table.clone();
            let key_column = key_column.clone();

            FieldFuture::new(async move {
                let arguments = relay::parse_connection_arguments(&ctx, &object_name)?;
                let pool = ctx.data::<SqlitePool>()?;

                let page = paginate(
                    pool,
                    PaginationRequest {
                        source: PaginationSource::Forward {
                            table,
                            column: key_column,
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
                    &object_name,
                    page,
                ))))
            })
        },
    );

    relay::with_connection_arguments(field)
}

/// `node(id: ID!)` decodes the identifier and dispatches on the embedded
/// object name; the concrete type must be one the schema emitted.
fn node_field(object_names: HashSet<String>) -> Field {
    let object_names = Arc::new(object_names);

    Field::new("node", TypeRef::named("Node"), move |ctx| {
        let object_names = object_names.clone();

        FieldFuture::new(async move {
            let opaque = ctx.args.try_get("id")?.string()?;
            let cursor = Cursor::decode(opaque).map_err(Error::new_with_source)?;

            if !object_names.contains(cursor.object()) {
                return Err(Error::new(format!(
                    "unknown object '{}' in identifier",
                    cursor.object()
                )));
            }

            let type_name = cursor.object().to_string();
            Ok(Some(FieldValue::owned_any(cursor).with_type(type_name)))
        })
    })
    .argument(InputValue::new("id", TypeRef::named_nn(TypeRef::ID)))
}
