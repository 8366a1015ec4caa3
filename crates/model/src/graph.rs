// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! A directed multigraph of tables, columns, objects and fields.
//!
//! Nodes and edges live in append-only arenas addressed by [NodeId] indices.
//! Payloads are tagged enums rather than attribute maps, so the classifier
//! downstream matches on types instead of comparing strings. Selections are
//! lazy views over the arenas; nothing here mutates after construction.

use std::ops::Index;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
}

#[derive(Debug)]
pub enum NodeKind {
    Table(TableNode),
    Column(ColumnNode),
    Object(ObjectNode),
    Field(FieldNode),
}

#[derive(Debug)]
pub struct TableNode {
    pub name: String,
    /// Stamped by the foreign-key resolution pass.
    pub is_join_table: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
}

#[derive(Debug)]
pub struct ColumnNode {
    pub name: String,
    /// Raw type affinity as declared, if any.
    pub value_type: Option<String>,
    pub is_non_null: bool,
    pub is_primary_key: bool,
    pub foreign_key: Option<ForeignKey>,
}

#[derive(Debug)]
pub struct ObjectNode {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Int,
    Float,
    String,
    Boolean,
    Id,
    DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Forward,
    Backward,
    Joined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Scalar {
        value_type: ScalarType,
        non_null: bool,
    },
    Reference {
        reference: ReferenceKind,
        non_null: bool,
    },
}

#[derive(Debug)]
pub struct FieldNode {
    pub name: String,
    pub kind: FieldKind,
}

impl Node {
    pub fn name(&self) -> &str {
        match &self.kind {
            NodeKind::Table(table) => &table.name,
            NodeKind::Column(column) => &column.name,
            NodeKind::Object(object) => &object.name,
            NodeKind::Field(field) => &field.name,
        }
    }

    pub fn as_table(&self) -> Option<&TableNode> {
        match &self.kind {
            NodeKind::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_column(&self) -> Option<&ColumnNode> {
        match &self.kind {
            NodeKind::Column(column) => Some(column),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectNode> {
        match &self.kind {
            NodeKind::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_field(&self) -> Option<&FieldNode> {
        match &self.kind {
            NodeKind::Field(field) => Some(field),
            _ => None,
        }
    }
}

/// The closed set of association edges. The classifier depends on this set
/// being closed: a column is a forward reference exactly when it carries both
/// `ForeignKeyReference*` edges, and a table is a join table exactly when
/// both of its two columns do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    TableHasColumn,
    ForeignKeyReferenceTable,
    ForeignKeyReferenceColumn,
    ObjectHasTable,
    ObjectHasField,
    FieldHasTable,
    FieldHasColumn,
    FieldReferencesTable,
    FieldReferencesColumn,
    FieldReferencesObject,
    FieldReferencesJoinTable,
    FieldReferencesOwnJoinColumn,
    FieldReferencesForeignJoinColumn,
    FieldReferencesOwnTable,
    FieldReferencesOwnColumn,
    FieldReferencesForeignTable,
    FieldReferencesForeignColumn,
}

#[derive(Debug)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
}

#[derive(Debug, Default)]
pub struct PropertyGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl PropertyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { id, kind });
        id
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId, kind: EdgeKind) {
        self.edges.push(Edge { from, to, kind });
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> EdgeSelection<'_> {
        EdgeSelection {
            graph: self,
            kind: None,
            from: None,
            to: None,
        }
    }

    pub(crate) fn table_mut(&mut self, id: NodeId) -> Option<&mut TableNode> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn tables(&self) -> impl Iterator<Item = (NodeId, &TableNode)> {
        self.nodes().filter_map(|n| n.as_table().map(|t| (n.id, t)))
    }

    pub fn objects(&self) -> impl Iterator<Item = (NodeId, &ObjectNode)> {
        self.nodes().filter_map(|n| n.as_object().map(|o| (n.id, o)))
    }

    pub fn fields(&self) -> impl Iterator<Item = (NodeId, &FieldNode)> {
        self.nodes().filter_map(|n| n.as_field().map(|f| (n.id, f)))
    }

    pub fn table_named(&self, name: &str) -> Option<NodeId> {
        self.tables().find(|(_, t)| t.name == name).map(|(id, _)| id)
    }

    pub fn object_named(&self, name: &str) -> Option<NodeId> {
        self.objects().find(|(_, o)| o.name == name).map(|(id, _)| id)
    }

    /// Columns of a table, in declaration order.
    pub fn columns_of(&self, table: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges().from(table).of_kind(EdgeKind::TableHasColumn).targets()
    }

    /// Fields of an object, in creation order.
    pub fn fields_of(&self, object: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges().from(object).of_kind(EdgeKind::ObjectHasField).targets()
    }

    /// The object derived from a table, absent for join tables.
    pub fn object_of_table(&self, table: NodeId) -> Option<NodeId> {
        self.edges()
            .to(table)
            .of_kind(EdgeKind::ObjectHasTable)
            .sources()
            .next()
    }

    /// The table an object is backed by.
    pub fn table_of_object(&self, object: NodeId) -> Option<NodeId> {
        self.edges()
            .from(object)
            .of_kind(EdgeKind::ObjectHasTable)
            .targets()
            .next()
    }
}

impl Index<NodeId> for PropertyGraph {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

/// A lazy, composable view over the edge arena. Copyable so chains like
/// `graph.edges().from(n).of_kind(k).targets()` stay allocation-free.
#[derive(Clone, Copy)]
pub struct EdgeSelection<'g> {
    graph: &'g PropertyGraph,
    kind: Option<EdgeKind>,
    from: Option<NodeId>,
    to: Option<NodeId>,
}

impl<'g> EdgeSelection<'g> {
    pub fn of_kind(self, kind: EdgeKind) -> Self {
        Self {
            kind: Some(kind),
            ..self
        }
    }

    pub fn from(self, from: NodeId) -> Self {
        Self {
            from: Some(from),
            ..self
        }
    }

    pub fn to(self, to: NodeId) -> Self {
        Self {
            to: Some(to),
            ..self
        }
    }

    pub fn iter(self) -> impl Iterator<Item = &'g Edge> {
        self.graph.edges.iter().filter(move |e| {
            self.kind.map_or(true, |kind| e.kind == kind)
                && self.from.map_or(true, |from| e.from == from)
                && self.to.map_or(true, |to| e.to == to)
        })
    }

    pub fn sources(self) -> impl Iterator<Item = NodeId> + 'g {
        self.iter().map(|e| e.from)
    }

    pub fn targets(self) -> impl Iterator<Item = NodeId> + 'g {
        self.iter().map(|e| e.to)
    }

    pub fn first_target(self) -> Option<NodeId> {
        self.targets().next()
    }

    pub fn first_source(self) -> Option<NodeId> {
        self.sources().next()
    }

    pub fn count(self) -> usize {
        self.iter().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (PropertyGraph, NodeId, NodeId, NodeId) {
        let mut graph = PropertyGraph::new();
        let table = graph.add_node(NodeKind::Table(TableNode {
            name: "concerts".to_string(),
            is_join_table: false,
        }));
        let id_column = graph.add_node(NodeKind::Column(ColumnNode {
            name: "id".to_string(),
            value_type: Some("INTEGER".to_string()),
            is_non_null: false,
            is_primary_key: true,
            foreign_key: None,
        }));
        let name_column = graph.add_node(NodeKind::Column(ColumnNode {
            name: "name".to_string(),
            value_type: Some("TEXT".to_string()),
            is_non_null: true,
            is_primary_key: false,
            foreign_key: None,
        }));
        graph.add_edge(table, id_column, EdgeKind::TableHasColumn);
        graph.add_edge(table, name_column, EdgeKind::TableHasColumn);

        (graph, table, id_column, name_column)
    }

    #[test]
    fn selections_compose() {
        let (graph, table, id_column, name_column) = sample();

        let columns: Vec<_> = graph
            .edges()
            .from(table)
            .of_kind(EdgeKind::TableHasColumn)
            .targets()
            .collect();
        assert_eq!(columns, vec![id_column, name_column]);

        assert_eq!(
            graph.edges().to(name_column).count(),
            1
        );
        assert_eq!(
            graph.edges().from(table).of_kind(EdgeKind::ObjectHasField).count(),
            0
        );
    }

    #[test]
    fn columns_keep_declaration_order() {
        let (graph, table, id_column, name_column) = sample();

        let columns: Vec<_> = graph.columns_of(table).collect();
        assert_eq!(columns, vec![id_column, name_column]);
        assert_eq!(graph[id_column].name(), "id");
        assert_eq!(graph[name_column].name(), "name");
    }

    #[test]
    fn typed_lookups() {
        let (graph, table, id_column, _) = sample();

        assert_eq!(graph.table_named("concerts"), Some(table));
        assert_eq!(graph.table_named("venues"), None);
        assert!(graph[id_column].as_column().unwrap().is_primary_key);
        assert!(graph[table].as_column().is_none());
    }
}
