// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! End-to-end execution of GraphQL documents against schemas derived from
//! live in-memory databases.

use async_graphql::dynamic::Schema;
use async_graphql::Request;
use serde_json::Value;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use tablegraph_builder::build_schema;
use tablegraph_sql::{connect, Cursor};

async fn setup(statements: &[&str]) -> (Schema, SqlitePool) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    for statement in statements {
        sqlx::query(statement).execute(&pool).await.unwrap();
    }

    let ddl = connect::schema_statements(&pool).await.unwrap();
    let graph = tablegraph_model::build(&ddl).unwrap();
    let schema = build_schema(&graph).unwrap();

    (schema, pool)
}

async fn execute(schema: &Schema, pool: &SqlitePool, document: &str) -> Value {
    let response = schema
        .execute(Request::new(document).data(pool.clone()))
        .await;
    assert!(
        response.errors.is_empty(),
        "unexpected errors: {:?}",
        response.errors
    );
    response.data.into_json().unwrap()
}

async fn execute_expecting_error(schema: &Schema, pool: &SqlitePool, document: &str) -> String {
    let response = schema
        .execute(Request::new(document).data(pool.clone()))
        .await;
    assert!(!response.errors.is_empty(), "expected errors");
    response.errors[0].message.clone()
}

fn join_table_fixture() -> Vec<&'static str> {
    vec![
        "CREATE TABLE gs (id INTEGER PRIMARY KEY)",
        "CREATE TABLE hs (id INTEGER PRIMARY KEY)",
        "CREATE TABLE g_h (g_id INTEGER REFERENCES gs(id), h_id INTEGER REFERENCES hs(id))",
    ]
}

#[tokio::test]
async fn joined_connections_nest() {
    let (schema, pool) = setup(&join_table_fixture()).await;

    for _ in 0..3 {
        sqlx::query("INSERT INTO gs DEFAULT VALUES").execute(&pool).await.unwrap();
    }
    for _ in 0..2 {
        sqlx::query("INSERT INTO hs DEFAULT VALUES").execute(&pool).await.unwrap();
    }
    sqlx::query("INSERT INTO g_h (g_id, h_id) VALUES (1, 1), (1, 2), (2, 1)")
        .execute(&pool)
        .await
        .unwrap();

    let data = execute(
        &schema,
        &pool,
        "{ gs(first: 10) { edges { node { hs { edges { node { id } } } } } } }",
    )
    .await;

    let outer = data["gs"]["edges"].as_array().unwrap();
    assert_eq!(outer.len(), 3);

    let inner_len =
        |i: usize| outer[i]["node"]["hs"]["edges"].as_array().unwrap().len();
    assert_eq!(inner_len(0), 2);
    assert_eq!(inner_len(1), 1);
    assert_eq!(inner_len(2), 0);
}

#[tokio::test]
async fn empty_collection_has_no_pages() {
    let (schema, pool) = setup(&[
        "CREATE TABLE cs (id INTEGER PRIMARY KEY, d_id INTEGER REFERENCES ds(id))",
        "CREATE TABLE ds (id INTEGER PRIMARY KEY)",
    ])
    .await;

    let data = execute(
        &schema,
        &pool,
        "{ cs(first: 5) { edges { node { id } } pageInfo { hasPreviousPage hasNextPage } } }",
    )
    .await;

    assert_eq!(data["cs"]["edges"].as_array().unwrap().len(), 0);
    assert_eq!(data["cs"]["pageInfo"]["hasPreviousPage"], Value::Bool(false));
    assert_eq!(data["cs"]["pageInfo"]["hasNextPage"], Value::Bool(false));
}

#[tokio::test]
async fn create_returns_cursor_and_echoes_mutation_id() {
    let (schema, pool) = setup(&[
        r#"CREATE TABLE "as" (id INTEGER PRIMARY KEY, b_id INTEGER REFERENCES bs(id))"#,
        r#"CREATE TABLE bs (id INTEGER PRIMARY KEY, a_id INTEGER REFERENCES "as"(id))"#,
    ])
    .await;

    let data = execute(
        &schema,
        &pool,
        r#"mutation { createA(input: { clientMutationId: "m1" }) { clientMutationId a { id } } }"#,
    )
    .await;

    assert_eq!(data["createA"]["clientMutationId"], "m1");

    let id = data["createA"]["a"]["id"].as_str().unwrap();
    let cursor = Cursor::decode(id).unwrap();
    assert_eq!(cursor.object(), "A");
    assert_eq!(cursor.id(), 1);
}

#[tokio::test]
async fn update_with_no_columns_succeeds_without_writing() {
    let (schema, pool) = setup(&[
        r#"CREATE TABLE "as" (id INTEGER PRIMARY KEY, b_id INTEGER REFERENCES bs(id))"#,
        r#"CREATE TABLE bs (id INTEGER PRIMARY KEY, a_id INTEGER REFERENCES "as"(id))"#,
    ])
    .await;

    let id = Cursor::new("B", 7).encode();
    let document = format!(
        r#"mutation {{ updateB(input: {{ id: "{id}", clientMutationId: "m2" }}) {{ clientMutationId b {{ id }} }} }}"#
    );
    let data = execute(&schema, &pool, &document).await;

    assert_eq!(data["updateB"]["clientMutationId"], "m2");
    let returned = Cursor::decode(data["updateB"]["b"]["id"].as_str().unwrap()).unwrap();
    assert_eq!(returned.object(), "B");
    assert_eq!(returned.id(), 7);
}

#[tokio::test]
async fn delete_with_wrong_object_fails_and_writes_nothing() {
    let (schema, pool) = setup(&[
        r#"CREATE TABLE "as" (id INTEGER PRIMARY KEY, b_id INTEGER REFERENCES bs(id))"#,
        r#"CREATE TABLE bs (id INTEGER PRIMARY KEY, a_id INTEGER REFERENCES "as"(id))"#,
    ])
    .await;

    sqlx::query(r#"INSERT INTO "as" DEFAULT VALUES"#)
        .execute(&pool)
        .await
        .unwrap();

    let id = Cursor::new("B", 1).encode();
    let document = format!(
        r#"mutation {{ deleteA(input: {{ id: "{id}", clientMutationId: "m3" }}) {{ clientMutationId }} }}"#
    );
    let message = execute_expecting_error(&schema, &pool, &document).await;
    assert!(message.contains("unexpected object"), "message: {message}");

    use sqlx::Row;
    let row = sqlx::query(r#"SELECT count(*) FROM "as""#)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.get::<i64, _>(0), 1);
}

#[tokio::test]
async fn pagination_after_with_first() {
    let (schema, pool) = setup(&["CREATE TABLE ds (id INTEGER PRIMARY KEY)"]).await;

    for _ in 0..5 {
        sqlx::query("INSERT INTO ds DEFAULT VALUES").execute(&pool).await.unwrap();
    }

    let after = Cursor::new("D", 3).encode();
    let document = format!(
        r#"{{ ds(first: 2, after: "{after}") {{
            edges {{ node {{ id }} }}
            pageInfo {{ hasPreviousPage hasNextPage }}
        }} }}"#
    );
    let data = execute(&schema, &pool, &document).await;

    let ids: Vec<u64> = data["ds"]["edges"]
        .as_array()
        .unwrap()
        .iter()
        .map(|edge| {
            Cursor::decode(edge["node"]["id"].as_str().unwrap())
                .unwrap()
                .id()
        })
        .collect();
    assert_eq!(ids, vec![4, 5]);
    assert_eq!(data["ds"]["pageInfo"]["hasPreviousPage"], Value::Bool(true));
    assert_eq!(data["ds"]["pageInfo"]["hasNextPage"], Value::Bool(false));
}

#[tokio::test]
async fn wrongly_typed_pagination_cursor_is_rejected() {
    let (schema, pool) = setup(&["CREATE TABLE ds (id INTEGER PRIMARY KEY)"]).await;

    let after = Cursor::new("C", 3).encode();
    let document = format!(r#"{{ ds(after: "{after}") {{ edges {{ node {{ id }} }} }} }}"#);
    let message = execute_expecting_error(&schema, &pool, &document).await;
    assert!(message.contains("unexpected object"), "message: {message}");
}

#[tokio::test]
async fn scalar_and_forward_fields_resolve() {
    let (schema, pool) = setup(&[
        "CREATE TABLE venues (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
        "CREATE TABLE concerts (id INTEGER PRIMARY KEY, title TEXT, price REAL, venue_id INTEGER REFERENCES venues(id))",
    ])
    .await;

    sqlx::query("INSERT INTO venues (name) VALUES ('Roundhouse')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO concerts (title, price, venue_id) VALUES ('An Evening', 35.5, 1), (NULL, NULL, NULL)")
        .execute(&pool)
        .await
        .unwrap();

    let data = execute(
        &schema,
        &pool,
        "{ concerts { edges { node { title price venue { name } } } } }",
    )
    .await;

    let edges = data["concerts"]["edges"].as_array().unwrap();
    assert_eq!(edges.len(), 2);
    assert_eq!(edges[0]["node"]["title"], "An Evening");
    assert_eq!(edges[0]["node"]["price"], 35.5);
    assert_eq!(edges[0]["node"]["venue"]["name"], "Roundhouse");
    assert_eq!(edges[1]["node"]["title"], Value::Null);
    assert_eq!(edges[1]["node"]["venue"], Value::Null);
}

#[tokio::test]
async fn backward_references_paginate() {
    let (schema, pool) = setup(&[
        "CREATE TABLE cs (id INTEGER PRIMARY KEY, d_id INTEGER REFERENCES ds(id))",
        "CREATE TABLE ds (id INTEGER PRIMARY KEY)",
    ])
    .await;

    sqlx::query("INSERT INTO ds DEFAULT VALUES").execute(&pool).await.unwrap();
    sqlx::query("INSERT INTO ds DEFAULT VALUES").execute(&pool).await.unwrap();
    sqlx::query("INSERT INTO cs (d_id) VALUES (1), (1), (2)")
        .execute(&pool)
        .await
        .unwrap();

    let data = execute(
        &schema,
        &pool,
        "{ ds { edges { node { dsCs { edges { node { id } } } } } } }",
    )
    .await;

    let edges = data["ds"]["edges"].as_array().unwrap();
    let backward_len = |i: usize| edges[i]["node"]["dsCs"]["edges"].as_array().unwrap().len();
    assert_eq!(backward_len(0), 2);
    assert_eq!(backward_len(1), 1);
}

#[tokio::test]
async fn node_resolves_by_embedded_object_name() {
    let (schema, pool) = setup(&["CREATE TABLE ds (id INTEGER PRIMARY KEY)"]).await;

    sqlx::query("INSERT INTO ds DEFAULT VALUES").execute(&pool).await.unwrap();

    let id = Cursor::new("D", 1).encode();
    let document = format!(r#"{{ node(id: "{id}") {{ id }} }}"#);
    let data = execute(&schema, &pool, &document).await;
    assert_eq!(data["node"]["id"].as_str().unwrap(), id);

    let unknown = Cursor::new("Nope", 1).encode();
    let document = format!(r#"{{ node(id: "{unknown}") {{ id }} }}"#);
    let message = execute_expecting_error(&schema, &pool, &document).await;
    assert!(message.contains("unknown object"), "message: {message}");
}

#[tokio::test]
async fn associate_and_disassociate_round_trip() {
    let (schema, pool) = setup(&join_table_fixture()).await;

    sqlx::query("INSERT INTO gs DEFAULT VALUES").execute(&pool).await.unwrap();
    sqlx::query("INSERT INTO hs DEFAULT VALUES").execute(&pool).await.unwrap();

    let g = Cursor::new("G", 1).encode();
    let h = Cursor::new("H", 1).encode();

    let document = format!(
        r#"mutation {{ associateGH(input: {{ clientMutationId: "m4", gId: "{g}", hId: "{h}" }}) {{
            clientMutationId g {{ id }} h {{ id }}
        }} }}"#
    );
    let data = execute(&schema, &pool, &document).await;
    assert_eq!(data["associateGH"]["clientMutationId"], "m4");
    assert_eq!(data["associateGH"]["g"]["id"].as_str().unwrap(), g);
    assert_eq!(data["associateGH"]["h"]["id"].as_str().unwrap(), h);

    let data = execute(&schema, &pool, "{ gs { edges { node { hs { edges { node { id } } } } } } }").await;
    assert_eq!(
        data["gs"]["edges"][0]["node"]["hs"]["edges"].as_array().unwrap().len(),
        1
    );

    let document = format!(
        r#"mutation {{ disassociateGH(input: {{ clientMutationId: "m5", gId: "{g}", hId: "{h}" }}) {{
            clientMutationId
        }} }}"#
    );
    execute(&schema, &pool, &document).await;

    let data = execute(&schema, &pool, "{ gs { edges { node { hs { edges { node { id } } } } } } }").await;
    assert_eq!(
        data["gs"]["edges"][0]["node"]["hs"]["edges"].as_array().unwrap().len(),
        0
    );
}

#[tokio::test]
async fn association_mutations_are_emitted_once_per_pair() {
    let (schema, _) = setup(&join_table_fixture()).await;

    let sdl = schema.sdl();
    assert_eq!(sdl.matches("associateGH(").count(), 1, "sdl: {sdl}");
    assert_eq!(sdl.matches("disassociateGH(").count(), 1);
    assert!(!sdl.contains("associateHG"));
    assert!(sdl.contains("AssociationGHInput"));
    assert!(sdl.contains("gId: ID!"));
    assert!(sdl.contains("hId: ID!"));
    // the join table never becomes an object
    assert!(!sdl.contains("GHConnection"));
}

#[tokio::test]
async fn derived_schema_shape() {
    let (schema, _) = setup(&[
        r#"CREATE TABLE "as" (id INTEGER PRIMARY KEY, b_id INTEGER REFERENCES bs(id))"#,
        r#"CREATE TABLE bs (id INTEGER PRIMARY KEY, a_id INTEGER REFERENCES "as"(id))"#,
    ])
    .await;

    let sdl = schema.sdl();

    // mutual references stay forward in both directions, plus synthesized
    // back-references exposed as connections
    assert!(sdl.contains("b: B"), "sdl: {sdl}");
    assert!(sdl.contains("a: A"));
    assert!(sdl.contains("asBs("));
    assert!(sdl.contains("bsAs("));
    assert!(sdl.contains("AConnection!"));
    assert!(sdl.contains("BConnection!"));
    assert!(sdl.contains("id: ID!"));
    assert!(sdl.contains("createA(input: CreateAInput!): CreateAPayload!"));
    assert!(sdl.contains("node(id: ID!): Node"));
}
