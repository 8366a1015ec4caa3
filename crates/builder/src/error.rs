// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use thiserror::Error;

/// Fatal errors while emitting the schema from the property graph.
#[derive(Error, Debug)]
pub enum SchemaBuildError {
    #[error("object '{0}' is not backed by a table")]
    MissingTable(String),

    #[error("field '{field}' of object '{object}' is missing its {what}")]
    IncompleteField {
        object: String,
        field: String,
        what: &'static str,
    },

    #[error("invalid schema: {0}")]
    Schema(#[from] async_graphql::dynamic::SchemaError),
}
