// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

pub mod env_const;
pub mod logging_tracing;

use actix_web::{web, HttpResponse, Responder};
use async_graphql::dynamic::Schema;
use async_graphql::http::GraphiQLSource;
use async_graphql_actix_web::{GraphQLRequest, GraphQLResponse};
use sqlx::SqlitePool;

pub const ENDPOINT_HTTP_PATH: &str = "/graphql";

/// Execute one GraphQL request. The pool rides along in request-scoped data
/// so resolvers see exactly the per-request context they were written for.
pub async fn resolve(
    schema: web::Data<Schema>,
    pool: web::Data<SqlitePool>,
    request: GraphQLRequest,
) -> GraphQLResponse {
    let request = request.into_inner().data(pool.get_ref().clone());
    schema.execute(request).await.into()
}

/// Serve the GraphiQL page for interactive exploration.
pub async fn playground() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(GraphiQLSource::build().endpoint(ENDPOINT_HTTP_PATH).finish())
}
