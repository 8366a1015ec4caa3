// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Derivation of the property graph from table records, in three ordered
//! passes:
//!
//! 1. structure: table and column nodes with containment edges;
//! 2. foreign-key resolution and join-table marking;
//! 3. objects and fields: scalars, forward references, synthesized
//!    back-references, and joined fields for join tables.
//!
//! Object descriptors are created before any field so that mutually
//! referencing tables resolve; fields attach in a second sweep.

use tracing::debug;

use crate::error::GraphBuildError;
use crate::graph::{
    ColumnNode, EdgeKind, FieldKind, FieldNode, ForeignKey, NodeId, NodeKind, ObjectNode,
    PropertyGraph, ReferenceKind, ScalarType, TableNode,
};
use crate::ingest::{ingest, TableRecord};
use crate::naming;

/// Build the property graph straight from table-definition statements.
pub fn build(statements: &[String]) -> Result<PropertyGraph, GraphBuildError> {
    let records = ingest(statements)?;
    construct(&records)
}

/// Build the property graph from normalized table records.
pub fn construct(records: &[TableRecord]) -> Result<PropertyGraph, GraphBuildError> {
    let mut graph = PropertyGraph::new();

    add_structure(&mut graph, records);
    resolve_foreign_keys(&mut graph)?;
    mark_join_tables(&mut graph);
    add_objects(&mut graph)?;

    Ok(graph)
}

fn add_structure(graph: &mut PropertyGraph, records: &[TableRecord]) {
    for record in records {
        let table = graph.add_node(NodeKind::Table(TableNode {
            name: record.name.clone(),
            is_join_table: false,
        }));

        for column in &record.columns {
            let node = graph.add_node(NodeKind::Column(ColumnNode {
                name: column.name.clone(),
                value_type: column.value_type.clone(),
                is_non_null: column.is_non_null,
                is_primary_key: column.is_primary_key,
                foreign_key: column.foreign_key.as_ref().map(|fk| ForeignKey {
                    table: fk.table.clone(),
                    column: fk.column.clone(),
                }),
            }));
            graph.add_edge(table, node, EdgeKind::TableHasColumn);
        }
    }
}

/// Resolve every declared foreign key to `ForeignKeyReferenceTable` and
/// `ForeignKeyReferenceColumn` edges. A target that does not resolve to
/// exactly one table and one column is fatal.
fn resolve_foreign_keys(graph: &mut PropertyGraph) -> Result<(), GraphBuildError> {
    let references: Vec<(NodeId, ForeignKey)> = graph
        .nodes()
        .filter_map(|node| {
            node.as_column()
                .and_then(|column| column.foreign_key.clone())
                .map(|fk| (node.id, fk))
        })
        .collect();

    for (column, fk) in references {
        let referenced_table = graph.table_named(&fk.table).ok_or_else(|| {
            GraphBuildError::UnresolvedForeignKeyTable {
                table: fk.table.clone(),
                column: graph[column].name().to_string(),
            }
        })?;

        let referenced_column = {
            let mut candidates = graph
                .columns_of(referenced_table)
                .filter(|&c| graph[c].name() == fk.column);
            match (candidates.next(), candidates.next()) {
                (Some(column), None) => column,
                _ => {
                    return Err(GraphBuildError::UnresolvedForeignKeyColumn {
                        table: fk.table.clone(),
                        column: fk.column.clone(),
                    })
                }
            }
        };

        graph.add_edge(column, referenced_table, EdgeKind::ForeignKeyReferenceTable);
        graph.add_edge(column, referenced_column, EdgeKind::ForeignKeyReferenceColumn);
    }

    Ok(())
}

fn is_foreign_key_column(graph: &PropertyGraph, column: NodeId) -> bool {
    graph
        .edges()
        .from(column)
        .of_kind(EdgeKind::ForeignKeyReferenceTable)
        .count()
        == 1
        && graph
            .edges()
            .from(column)
            .of_kind(EdgeKind::ForeignKeyReferenceColumn)
            .count()
            == 1
}

/// A table is a join table iff it has exactly two columns and both resolved
/// to foreign keys.
fn mark_join_tables(graph: &mut PropertyGraph) {
    let tables: Vec<NodeId> = graph.tables().map(|(id, _)| id).collect();

    for table in tables {
        let columns: Vec<NodeId> = graph.columns_of(table).collect();
        let is_join_table =
            columns.len() == 2 && columns.iter().all(|&c| is_foreign_key_column(graph, c));

        if let Some(table) = graph.table_mut(table) {
            table.is_join_table = is_join_table;
            if is_join_table {
                debug!(table = %table.name, "marked join table");
            }
        }
    }
}

fn affinity_scalar_type(column: &ColumnNode) -> ScalarType {
    let affinity = column
        .value_type
        .as_deref()
        .unwrap_or("")
        .to_ascii_uppercase();

    if affinity.starts_with("INTEGER") {
        ScalarType::Int
    } else if affinity.starts_with("REAL") || affinity.starts_with("NUMERIC") {
        ScalarType::Float
    } else {
        // TEXT, BLOB and anything else fall back to strings
        ScalarType::String
    }
}

fn add_objects(graph: &mut PropertyGraph) -> Result<(), GraphBuildError> {
    let tables: Vec<NodeId> = graph
        .tables()
        .filter(|(_, t)| !t.is_join_table)
        .map(|(id, _)| id)
        .collect();

    // descriptors for every object first: forward fields of one table may
    // name the object of a table that has not been visited yet
    for &table in &tables {
        let name = naming::object_name(graph[table].name());
        debug!(object = %name, "adding object");

        let object = graph.add_node(NodeKind::Object(ObjectNode { name }));
        graph.add_edge(object, table, EdgeKind::ObjectHasTable);
    }

    let mut forward_fields = vec![];
    for &table in &tables {
        forward_fields.extend(add_direct_fields(graph, table)?);
    }

    add_back_reference_fields(graph, &forward_fields)?;
    add_joined_fields(graph)
}

/// One field per column: a forward reference when the column resolved to a
/// foreign key, a scalar otherwise. Returns the forward field ids for the
/// back-reference pass.
fn add_direct_fields(
    graph: &mut PropertyGraph,
    table: NodeId,
) -> Result<Vec<NodeId>, GraphBuildError> {
    let object = graph
        .object_of_table(table)
        .ok_or_else(|| GraphBuildError::MissingObject(graph[table].name().to_string()))?;

    let mut forward_fields = vec![];

    let columns: Vec<NodeId> = graph.columns_of(table).collect();
    for column in columns {
        if is_foreign_key_column(graph, column) {
            let referenced_table = graph
                .edges()
                .from(column)
                .of_kind(EdgeKind::ForeignKeyReferenceTable)
                .first_target()
                .ok_or_else(|| GraphBuildError::MissingObject(graph[column].name().to_string()))?;
            let referenced_column = graph
                .edges()
                .from(column)
                .of_kind(EdgeKind::ForeignKeyReferenceColumn)
                .first_target()
                .ok_or_else(|| GraphBuildError::MissingObject(graph[column].name().to_string()))?;
            let referenced_object = graph.object_of_table(referenced_table).ok_or_else(|| {
                GraphBuildError::MissingObject(graph[referenced_table].name().to_string())
            })?;

            let non_null = graph[column]
                .as_column()
                .map(|c| c.is_non_null)
                .unwrap_or(false);
            let name = naming::forward_field_name(graph[referenced_table].name());

            let field = graph.add_node(NodeKind::Field(FieldNode {
                name,
                kind: FieldKind::Reference {
                    reference: ReferenceKind::Forward,
                    non_null,
                },
            }));

            graph.add_edge(field, referenced_table, EdgeKind::FieldReferencesTable);
            graph.add_edge(field, referenced_column, EdgeKind::FieldReferencesColumn);
            graph.add_edge(field, referenced_object, EdgeKind::FieldReferencesObject);
            graph.add_edge(field, table, EdgeKind::FieldHasTable);
            graph.add_edge(field, column, EdgeKind::FieldHasColumn);
            graph.add_edge(object, field, EdgeKind::ObjectHasField);

            forward_fields.push(field);
        } else {
            let column_node = graph[column]
                .as_column()
                .ok_or_else(|| GraphBuildError::MissingObject(graph[column].name().to_string()))?;

            let kind = if column_node.is_primary_key {
                FieldKind::Scalar {
                    value_type: ScalarType::Id,
                    non_null: true,
                }
            } else {
                FieldKind::Scalar {
                    value_type: affinity_scalar_type(column_node),
                    non_null: column_node.is_non_null,
                }
            };

            let name = naming::scalar_field_name(graph[column].name());
            let field = graph.add_node(NodeKind::Field(FieldNode { name, kind }));

            graph.add_edge(field, table, EdgeKind::FieldHasTable);
            graph.add_edge(field, column, EdgeKind::FieldHasColumn);
            graph.add_edge(object, field, EdgeKind::ObjectHasField);
        }
    }

    Ok(forward_fields)
}

fn has_field_named(graph: &PropertyGraph, object: NodeId, name: &str) -> bool {
    graph
        .fields_of(object)
        .any(|field| graph[field].name() == name)
}

/// For every forward field F on object O referencing object O', synthesize
/// the inverse field on O'. A name collision on O' is fatal.
fn add_back_reference_fields(
    graph: &mut PropertyGraph,
    forward_fields: &[NodeId],
) -> Result<(), GraphBuildError> {
    for &field in forward_fields {
        let edges_from = |kind| graph.edges().from(field).of_kind(kind).first_target();

        let own_table = edges_from(EdgeKind::FieldHasTable);
        let own_column = edges_from(EdgeKind::FieldHasColumn);
        let referenced_table = edges_from(EdgeKind::FieldReferencesTable);
        let referenced_column = edges_from(EdgeKind::FieldReferencesColumn);
        let own_object = graph
            .edges()
            .to(field)
            .of_kind(EdgeKind::ObjectHasField)
            .first_source();

        let (Some(own_table), Some(own_column), Some(referenced_table), Some(referenced_column), Some(own_object)) =
            (own_table, own_column, referenced_table, referenced_column, own_object)
        else {
            continue;
        };

        let referenced_object = graph.object_of_table(referenced_table).ok_or_else(|| {
            GraphBuildError::MissingObject(graph[referenced_table].name().to_string())
        })?;

        let name =
            naming::back_reference_field_name(graph[field].name(), graph[own_table].name());
        if has_field_named(graph, referenced_object, &name) {
            return Err(GraphBuildError::DuplicateField {
                object: graph[referenced_object].name().to_string(),
                field: name,
            });
        }

        let back_reference = graph.add_node(NodeKind::Field(FieldNode {
            name,
            kind: FieldKind::Reference {
                reference: ReferenceKind::Backward,
                non_null: true,
            },
        }));

        graph.add_edge(back_reference, own_table, EdgeKind::FieldReferencesTable);
        graph.add_edge(back_reference, own_column, EdgeKind::FieldReferencesColumn);
        graph.add_edge(back_reference, own_object, EdgeKind::FieldReferencesObject);
        graph.add_edge(back_reference, referenced_table, EdgeKind::FieldHasTable);
        graph.add_edge(back_reference, referenced_column, EdgeKind::FieldHasColumn);
        graph.add_edge(referenced_object, back_reference, EdgeKind::ObjectHasField);
    }

    Ok(())
}

/// For every join table, one joined field on each referenced object, wired
/// to the join table, both join columns, and both referenced sides.
fn add_joined_fields(graph: &mut PropertyGraph) -> Result<(), GraphBuildError> {
    let join_tables: Vec<NodeId> = graph
        .tables()
        .filter(|(_, t)| t.is_join_table)
        .map(|(id, _)| id)
        .collect();

    for table in join_tables {
        let columns: Vec<NodeId> = graph.columns_of(table).collect();
        if columns.len() != 2 {
            return Err(GraphBuildError::MalformedJoinTable(
                graph[table].name().to_string(),
            ));
        }
        let (first, second) = (columns[0], columns[1]);

        for (own, other) in [(first, second), (second, first)] {
            let resolve = |column: NodeId, kind| {
                graph
                    .edges()
                    .from(column)
                    .of_kind(kind)
                    .first_target()
                    .ok_or_else(|| {
                        GraphBuildError::MalformedJoinTable(graph[table].name().to_string())
                    })
            };

            let own_table = resolve(own, EdgeKind::ForeignKeyReferenceTable)?;
            let own_column = resolve(own, EdgeKind::ForeignKeyReferenceColumn)?;
            let other_table = resolve(other, EdgeKind::ForeignKeyReferenceTable)?;
            let other_column = resolve(other, EdgeKind::ForeignKeyReferenceColumn)?;

            let own_object = graph
                .object_of_table(own_table)
                .ok_or_else(|| GraphBuildError::MissingObject(graph[own_table].name().to_string()))?;
            let other_object = graph.object_of_table(other_table).ok_or_else(|| {
                GraphBuildError::MissingObject(graph[other_table].name().to_string())
            })?;

            let name =
                naming::joined_field_name(graph[other].name(), graph[other_column].name());
            if has_field_named(graph, own_object, &name) {
                return Err(GraphBuildError::DuplicateField {
                    object: graph[own_object].name().to_string(),
                    field: name,
                });
            }

            let field = graph.add_node(NodeKind::Field(FieldNode {
                name,
                kind: FieldKind::Reference {
                    reference: ReferenceKind::Joined,
                    non_null: true,
                },
            }));

            graph.add_edge(field, table, EdgeKind::FieldReferencesJoinTable);
            graph.add_edge(field, own, EdgeKind::FieldReferencesOwnJoinColumn);
            graph.add_edge(field, other, EdgeKind::FieldReferencesForeignJoinColumn);
            graph.add_edge(field, own_table, EdgeKind::FieldReferencesOwnTable);
            graph.add_edge(field, own_column, EdgeKind::FieldReferencesOwnColumn);
            graph.add_edge(field, other_table, EdgeKind::FieldReferencesForeignTable);
            graph.add_edge(field, other_column, EdgeKind::FieldReferencesForeignColumn);
            graph.add_edge(field, other_object, EdgeKind::FieldReferencesObject);
            graph.add_edge(own_object, field, EdgeKind::ObjectHasField);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_from(statements: &[&str]) -> PropertyGraph {
        let statements: Vec<String> = statements.iter().map(|s| s.to_string()).collect();
        build(&statements).unwrap()
    }

    fn field_names(graph: &PropertyGraph, object: &str) -> Vec<String> {
        let object = graph.object_named(object).unwrap();
        graph
            .fields_of(object)
            .map(|f| graph[f].name().to_string())
            .collect()
    }

    fn field_kind(graph: &PropertyGraph, object: &str, field: &str) -> FieldKind {
        let object = graph.object_named(object).unwrap();
        let field = graph
            .fields_of(object)
            .find(|&f| graph[f].name() == field)
            .unwrap();
        graph[field].as_field().unwrap().kind.clone()
    }

    #[test]
    fn mutual_references_are_both_forward() {
        let graph = graph_from(&[
            "CREATE TABLE \"as\" (id INTEGER PRIMARY KEY, b_id INTEGER REFERENCES bs(id))",
            "CREATE TABLE bs (id INTEGER PRIMARY KEY, a_id INTEGER REFERENCES \"as\"(id))",
        ]);

        assert_eq!(field_names(&graph, "A"), vec!["id", "b", "asBs"]);
        assert_eq!(field_names(&graph, "B"), vec!["id", "a", "bsAs"]);

        assert_eq!(
            field_kind(&graph, "A", "b"),
            FieldKind::Reference {
                reference: ReferenceKind::Forward,
                non_null: false,
            }
        );
        assert_eq!(
            field_kind(&graph, "B", "a"),
            FieldKind::Reference {
                reference: ReferenceKind::Forward,
                non_null: false,
            }
        );
        assert_eq!(
            field_kind(&graph, "A", "asBs"),
            FieldKind::Reference {
                reference: ReferenceKind::Backward,
                non_null: true,
            }
        );
    }

    #[test]
    fn single_direction_yields_forward_and_backward() {
        let graph = graph_from(&[
            "CREATE TABLE cs (id INTEGER PRIMARY KEY, d_id INTEGER REFERENCES ds(id))",
            "CREATE TABLE ds (id INTEGER PRIMARY KEY)",
        ]);

        assert_eq!(field_names(&graph, "C"), vec!["id", "d"]);
        assert_eq!(field_names(&graph, "D"), vec!["id", "dsCs"]);
        assert_eq!(
            field_kind(&graph, "D", "dsCs"),
            FieldKind::Reference {
                reference: ReferenceKind::Backward,
                non_null: true,
            }
        );
    }

    #[test]
    fn forward_and_backward_fields_compose_to_identity() {
        let graph = graph_from(&[
            "CREATE TABLE cs (id INTEGER PRIMARY KEY, d_id INTEGER REFERENCES ds(id))",
            "CREATE TABLE ds (id INTEGER PRIMARY KEY)",
        ]);

        let c = graph.object_named("C").unwrap();
        let d = graph.object_named("D").unwrap();

        let forward = graph
            .fields_of(c)
            .find(|&f| graph[f].name() == "d")
            .unwrap();
        let backward = graph
            .fields_of(d)
            .find(|&f| graph[f].name() == "dsCs")
            .unwrap();

        // the forward field points at D, its inverse back at C
        assert_eq!(
            graph
                .edges()
                .from(forward)
                .of_kind(EdgeKind::FieldReferencesObject)
                .first_target(),
            Some(d)
        );
        assert_eq!(
            graph
                .edges()
                .from(backward)
                .of_kind(EdgeKind::FieldReferencesObject)
                .first_target(),
            Some(c)
        );
    }

    #[test]
    fn join_tables_vanish_into_joined_fields() {
        let graph = graph_from(&[
            "CREATE TABLE gs (id INTEGER PRIMARY KEY)",
            "CREATE TABLE hs (id INTEGER PRIMARY KEY)",
            "CREATE TABLE g_h (g_id INTEGER REFERENCES gs(id), h_id INTEGER REFERENCES hs(id))",
        ]);

        let join = graph.table_named("g_h").unwrap();
        assert!(graph[join].as_table().unwrap().is_join_table);
        assert!(graph.object_of_table(join).is_none());
        assert!(graph.object_named("GH").is_none());

        assert_eq!(field_names(&graph, "G"), vec!["id", "hs"]);
        assert_eq!(field_names(&graph, "H"), vec!["id", "gs"]);
        assert_eq!(
            field_kind(&graph, "G", "hs"),
            FieldKind::Reference {
                reference: ReferenceKind::Joined,
                non_null: true,
            }
        );

        // each joined field names the opposite object
        let g = graph.object_named("G").unwrap();
        let h = graph.object_named("H").unwrap();
        let hs = graph.fields_of(g).find(|&f| graph[f].name() == "hs").unwrap();
        assert_eq!(
            graph
                .edges()
                .from(hs)
                .of_kind(EdgeKind::FieldReferencesObject)
                .first_target(),
            Some(h)
        );
    }

    #[test]
    fn a_table_with_two_columns_and_one_foreign_key_is_not_a_join_table() {
        let graph = graph_from(&[
            "CREATE TABLE gs (id INTEGER PRIMARY KEY)",
            "CREATE TABLE notes (g_id INTEGER REFERENCES gs(id), body TEXT)",
        ]);

        let table = graph.table_named("notes").unwrap();
        assert!(!graph[table].as_table().unwrap().is_join_table);
        assert!(graph.object_named("Note").is_some());
    }

    #[test]
    fn every_non_join_table_has_exactly_one_object() {
        let graph = graph_from(&[
            "CREATE TABLE gs (id INTEGER PRIMARY KEY)",
            "CREATE TABLE hs (id INTEGER PRIMARY KEY)",
            "CREATE TABLE g_h (g_id INTEGER REFERENCES gs(id), h_id INTEGER REFERENCES hs(id))",
        ]);

        for (table, node) in graph.tables() {
            let objects = graph
                .edges()
                .to(table)
                .of_kind(EdgeKind::ObjectHasTable)
                .count();
            assert_eq!(objects, if node.is_join_table { 0 } else { 1 });
        }
    }

    #[test]
    fn field_names_are_unique_per_object() {
        let graph = graph_from(&[
            "CREATE TABLE \"as\" (id INTEGER PRIMARY KEY, b_id INTEGER REFERENCES bs(id))",
            "CREATE TABLE bs (id INTEGER PRIMARY KEY, a_id INTEGER REFERENCES \"as\"(id))",
            "CREATE TABLE gs (id INTEGER PRIMARY KEY)",
            "CREATE TABLE hs (id INTEGER PRIMARY KEY)",
            "CREATE TABLE g_h (g_id INTEGER REFERENCES gs(id), h_id INTEGER REFERENCES hs(id))",
        ]);

        for (object, _) in graph.objects() {
            let mut names: Vec<_> = graph
                .fields_of(object)
                .map(|f| graph[f].name().to_string())
                .collect();
            let total = names.len();
            names.sort();
            names.dedup();
            assert_eq!(names.len(), total);
        }
    }

    #[test]
    fn scalar_types_follow_the_affinity_map() {
        let graph = graph_from(&[
            "CREATE TABLE samples (
                id INTEGER PRIMARY KEY,
                attendance INTEGER NOT NULL,
                label TEXT,
                blob_data BLOB,
                ratio REAL,
                amount NUMERIC,
                other VARCHAR(10)
            )",
        ]);

        let expect = |field: &str, value_type, non_null| {
            assert_eq!(
                field_kind(&graph, "Sample", field),
                FieldKind::Scalar {
                    value_type,
                    non_null,
                },
                "field {field}"
            );
        };

        expect("id", ScalarType::Id, true);
        expect("attendance", ScalarType::Int, true);
        expect("label", ScalarType::String, false);
        expect("blobData", ScalarType::String, false);
        expect("ratio", ScalarType::Float, false);
        expect("amount", ScalarType::Float, false);
        expect("other", ScalarType::String, false);
    }

    #[test]
    fn back_reference_collision_is_fatal() {
        let statements: Vec<String> = [
            "CREATE TABLE cs (id INTEGER PRIMARY KEY, d_id INTEGER REFERENCES ds(id))",
            "CREATE TABLE ds (id INTEGER PRIMARY KEY, ds_cs TEXT)",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let result = build(&statements);
        assert!(matches!(
            result,
            Err(GraphBuildError::DuplicateField { object, field })
                if object == "D" && field == "dsCs"
        ));
    }

    #[test]
    fn unresolved_foreign_keys_are_fatal() {
        let statements: Vec<String> =
            ["CREATE TABLE cs (id INTEGER PRIMARY KEY, z_id INTEGER REFERENCES zs(id))"]
                .iter()
                .map(|s| s.to_string())
                .collect();

        assert!(matches!(
            build(&statements),
            Err(GraphBuildError::UnresolvedForeignKeyTable { table, .. }) if table == "zs"
        ));

        let statements: Vec<String> = [
            "CREATE TABLE cs (id INTEGER PRIMARY KEY, d_id INTEGER REFERENCES ds(nope))",
            "CREATE TABLE ds (id INTEGER PRIMARY KEY)",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        assert!(matches!(
            build(&statements),
            Err(GraphBuildError::UnresolvedForeignKeyColumn { column, .. }) if column == "nope"
        ));
    }
}
