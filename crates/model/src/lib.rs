// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

/// The intermediate model between a relational schema and the graph API
/// derived from it.
///
/// [ingest] normalizes `CREATE TABLE` statements into plain table records.
/// [construct] runs three ordered passes over those records to produce a
/// [graph::PropertyGraph]: tables and columns with containment edges,
/// resolved foreign-key edges with join-table marking, and finally the
/// derived objects and fields every downstream consumer walks. The graph is
/// built once at startup and read-only afterwards.
pub mod construct;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod naming;

pub use construct::{build, construct};
pub use error::{DdlError, GraphBuildError};
pub use graph::{
    ColumnNode, Edge, EdgeKind, FieldKind, FieldNode, ForeignKey, Node, NodeId, NodeKind,
    ObjectNode, PropertyGraph, ReferenceKind, ScalarType, TableNode,
};
pub use ingest::{ingest, ColumnRecord, ForeignKeyRecord, TableRecord};
