// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::env;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time;

use actix_web::{middleware, web, App, HttpServer};
use thiserror::Error;
use tracing::info;
use tracing_actix_web::TracingLogger;

use tablegraph_server_actix::env_const::{DATABASE_URL, TG_DATABASE_URL, TG_SERVER_PORT};
use tablegraph_server_actix::{logging_tracing, playground, resolve, ENDPOINT_HTTP_PATH};

const DEFAULT_SERVER_PORT: u16 = 8765;

#[derive(Error)]
enum ServerError {
    #[error("TG_DATABASE_URL (or DATABASE_URL) must be set to the database to serve")]
    MissingDatabaseUrl,
    #[error("Port {0} is already in use. Check if there is another process running at that port.")]
    PortInUse(u16),
    #[error("{0}")]
    Database(#[from] tablegraph_sql::DatabaseError),
    #[error("{0}")]
    GraphBuild(#[from] tablegraph_model::GraphBuildError),
    #[error("{0}")]
    SchemaBuild(#[from] tablegraph_builder::SchemaBuildError),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

// A custom `Debug` implementation (delegating to `Display`) so that the
// default `Debug` message is not printed when the server exits with an error.
impl std::fmt::Debug for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

#[actix_web::main]
async fn main() -> Result<(), ServerError> {
    let start_time = time::SystemTime::now();

    logging_tracing::init();

    let database_url = env::var(TG_DATABASE_URL)
        .or_else(|_| env::var(DATABASE_URL))
        .map_err(|_| ServerError::MissingDatabaseUrl)?;

    let pool = tablegraph_sql::connect::create_pool(&database_url).await?;
    let statements = tablegraph_sql::connect::schema_statements(&pool).await?;
    info!(tables = statements.len(), "fetched table definitions");

    let graph = tablegraph_model::build(&statements)?;
    let schema = tablegraph_builder::build_schema(&graph)?;

    let server_port = env::var(TG_SERVER_PORT)
        .ok()
        .map(|port| {
            port.parse::<u16>()
                .map_err(|_| std::io::Error::new(ErrorKind::InvalidInput, "invalid TG_SERVER_PORT"))
        })
        .transpose()?
        .unwrap_or(DEFAULT_SERVER_PORT);

    let schema = web::Data::new(schema);
    let pool = web::Data::new(pool);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(middleware::NormalizePath::new(
                middleware::TrailingSlash::Trim,
            ))
            .app_data(schema.clone())
            .app_data(pool.clone())
            .route(ENDPOINT_HTTP_PATH, web::post().to(resolve))
            .route(ENDPOINT_HTTP_PATH, web::get().to(playground))
    });

    // Bind both all interfaces (production) and localhost (development, so
    // IPv6 loopback works too).
    let server = server
        .bind(("0.0.0.0", server_port))
        .and_then(|server| server.bind(("localhost", server_port)));

    match server {
        Ok(server) => {
            println!(
                "Started server on {} in {:.2} ms",
                pretty_addr(&server.addrs()),
                start_time.elapsed().unwrap_or_default().as_micros() as f64 / 1000.0
            );
            println!("- Endpoint hosted at:");
            println!("\thttp://localhost:{server_port}{ENDPOINT_HTTP_PATH}");

            Ok(server.run().await?)
        }
        Err(e) => Err(if e.kind() == ErrorKind::AddrInUse {
            ServerError::PortInUse(server_port)
        } else {
            ServerError::Io(e)
        }),
    }
}

fn pretty_addr(addrs: &[SocketAddr]) -> String {
    let loopback_addr = addrs.iter().find(|addr| addr.ip().is_loopback());

    match loopback_addr {
        Some(addr) => format!("localhost:{}", addr.port()),
        None => format!("{addrs:?}"),
    }
}
