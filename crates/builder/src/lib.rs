// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Emission of the executable GraphQL schema from a property graph.
//!
//! The graph is first flattened into plain descriptors ([system_builder])
//! holding every string a resolver will need, so the emitted closures own
//! their data and the graph itself can be dropped after startup. The
//! builders then register one object, edge and connection type per derived
//! object, the Relay plumbing (`Node`, `PageInfo`), the root `Query` with
//! its paginated collections, and the root `Mutation` with
//! create/update/delete and association operations.

mod error;
mod mutation_builder;
mod object_builder;
mod query_builder;
mod relay;
mod system_builder;

use async_graphql::dynamic::{Scalar, Schema};
use tablegraph_model::PropertyGraph;
use tracing::debug;

pub use error::SchemaBuildError;
pub use relay::Connection;

/// The name of the scalar used for date-valued columns (ISO-8601 strings on
/// the wire).
pub(crate) const DATE_TIME_SCALAR: &str = "DateTime";

/// Emit the executable schema for a completed property graph.
///
/// The database pool is *not* captured here: resolvers expect it in
/// request-scoped data, mirroring the per-request context the transport
/// provides.
pub fn build_schema(graph: &PropertyGraph) -> Result<Schema, SchemaBuildError> {
    let system = system_builder::build_system(graph)?;

    let mut builder = Schema::build(
        "Query",
        system.has_mutations().then_some("Mutation"),
        None::<&str>,
    )
        .register(Scalar::new(DATE_TIME_SCALAR))
        .register(relay::node_interface())
        .register(relay::page_info_object());

    for object in &system.objects {
        debug!(object = %object.name, "emitting object types");
        for ty in object_builder::build_objects(object) {
            builder = builder.register(ty);
        }
    }

    builder = builder.register(query_builder::build_query(&system));

    if system.has_mutations() {
        let (mutation, inputs, payloads) = mutation_builder::build_mutation(&system);
        builder = builder.register(mutation);
        for input in inputs {
            builder = builder.register(input);
        }
        for payload in payloads {
            builder = builder.register(payload);
        }
    }

    Ok(builder.finish()?)
}
