// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Relay plumbing shared by every derived object: the `Node` interface,
//! `PageInfo`, the request-scoped connection value, and the pagination
//! arguments.

use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, Interface, InterfaceField, Object, ResolverContext, TypeRef,
};
use async_graphql::{Error, Value};

use tablegraph_sql::{Cursor, Page};

/// A resolved page of edges, passed between a connection resolver and the
/// `pageInfo`/`edges` fields below it. Lives for one request.
#[derive(Debug, Clone)]
pub struct Connection {
    pub edges: Vec<Cursor>,
    pub has_previous_page: bool,
    pub has_next_page: bool,
}

impl Connection {
    pub fn new(object: &str, page: Page) -> Self {
        Self {
            edges: page
                .ids
                .into_iter()
                .map(|id| Cursor::new(object, id))
                .collect(),
            has_previous_page: page.has_previous_page,
            has_next_page: page.has_next_page,
        }
    }

    fn start_cursor(&self) -> Cursor {
        self.edges.first().cloned().unwrap_or_default()
    }

    fn end_cursor(&self) -> Cursor {
        self.edges.last().cloned().unwrap_or_default()
    }
}

/// The polymorphic identity capability. There is no inheritance behind it:
/// the concrete type is chosen from the decoded cursor's object name.
pub(crate) fn node_interface() -> Interface {
    Interface::new("Node").field(InterfaceField::new("id", TypeRef::named_nn(TypeRef::ID)))
}

fn page_info_field<F>(name: &str, ty: TypeRef, read: F) -> Field
where
    F: Fn(&Connection) -> Value + Send + Sync + Clone + 'static,
{
    Field::new(name, ty, move |ctx| {
        let read = read.clone();
        FieldFuture::new(async move {
            let connection = ctx.parent_value.try_downcast_ref::<Connection>()?;
            Ok(Some(FieldValue::value(read(connection))))
        })
    })
}

pub(crate) fn page_info_object() -> Object {
    Object::new("PageInfo")
        .description("Information about pagination in a connection.")
        .field(page_info_field(
            "hasNextPage",
            TypeRef::named_nn(TypeRef::BOOLEAN),
            |connection| Value::from(connection.has_next_page),
        ))
        .field(page_info_field(
            "hasPreviousPage",
            TypeRef::named_nn(TypeRef::BOOLEAN),
            |connection| Value::from(connection.has_previous_page),
        ))
        .field(page_info_field(
            "startCursor",
            TypeRef::named_nn(TypeRef::STRING),
            |connection| Value::from(connection.start_cursor().encode()),
        ))
        .field(page_info_field(
            "endCursor",
            TypeRef::named_nn(TypeRef::STRING),
            |connection| Value::from(connection.end_cursor().encode()),
        ))
}

/// Decoded `(before, after, first, last)` arguments of a connection field.
pub(crate) struct ConnectionArguments {
    pub before: Option<u64>,
    pub after: Option<u64>,
    pub first: Option<u64>,
    pub last: Option<u64>,
}

/// Attach the standard connection arguments to a field.
pub(crate) fn with_connection_arguments(field: Field) -> Field {
    field
        .argument(async_graphql::dynamic::InputValue::new(
            "before",
            TypeRef::named(TypeRef::ID),
        ))
        .argument(async_graphql::dynamic::InputValue::new(
            "after",
            TypeRef::named(TypeRef::ID),
        ))
        .argument(async_graphql::dynamic::InputValue::new(
            "first",
            TypeRef::named(TypeRef::INT),
        ))
        .argument(async_graphql::dynamic::InputValue::new(
            "last",
            TypeRef::named(TypeRef::INT),
        ))
}

/// Decode the connection arguments, enforcing that `before`/`after` carry
/// the connection's own object. Raised before any query runs.
pub(crate) fn parse_connection_arguments(
    ctx: &ResolverContext<'_>,
    object: &str,
) -> Result<ConnectionArguments, Error> {
    let cursor_argument = |name: &str| -> Result<Option<u64>, Error> {
        match ctx.args.get(name) {
            Some(value) if !value.is_null() => {
                let cursor = Cursor::decode_expecting(value.string()?, object)
                    .map_err(Error::new_with_source)?;
                Ok(Some(cursor.id()))
            }
            _ => Ok(None),
        }
    };

    let count_argument = |name: &str| -> Result<Option<u64>, Error> {
        match ctx.args.get(name) {
            Some(value) if !value.is_null() => {
                let count = value.i64()?;
                u64::try_from(count)
                    .map(Some)
                    .map_err(|_| Error::new(format!("argument '{name}' must be non-negative")))
            }
            _ => Ok(None),
        }
    };

    Ok(ConnectionArguments {
        before: cursor_argument("before")?,
        after: cursor_argument("after")?,
        first: count_argument("first")?,
        last: count_argument("last")?,
    })
}
