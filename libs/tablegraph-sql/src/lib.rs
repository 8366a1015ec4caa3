// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

/// Database access layer for the derived graph API.
///
/// Every statement this crate emits falls into one of three shapes: a point
/// read of a single column ([scalar]), a key-set pagination query over one of
/// three source specifications ([pagination]), or a single-row write
/// ([mutation]). Identifiers interpolated into statements come from the
/// property graph built at startup; all user-supplied values bind
/// positionally.
///
/// The [cursor] module is the bijection between `(object name, row id)` pairs
/// and the opaque identifiers clients hold. The pagination and mutation
/// engines sit above it: mutations decode and type-check every identifier
/// input before any SQL runs.
pub mod connect;
pub mod cursor;
pub mod database_error;
pub mod mutation;
pub mod pagination;
pub mod scalar;

pub use cursor::{Cursor, CursorError};

/// Quote an identifier for interpolation into a statement. Identifiers come
/// from the startup graph, but nothing stops a table from being named after
/// a keyword.
pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
pub use database_error::DatabaseError;
pub use mutation::{
    AssociateRequest, AssociationEnd, CreateRequest, DeleteRequest, FieldSpec, FieldSpecKind,
    InputValue, MutationError, SqlValue, UpdateRequest,
};
pub use pagination::{Page, PaginationRequest, PaginationSource};
pub use scalar::ScalarRead;
