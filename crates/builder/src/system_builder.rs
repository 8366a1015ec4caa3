// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Flattening of the property graph into self-contained descriptors.
//!
//! Resolvers must not hold the graph (they outlive it conceptually and the
//! dynamic schema wants `'static` closures), so every table, column and
//! object name a resolver will interpolate is resolved here, once, at
//! startup.

use tablegraph_model::{
    naming, EdgeKind, FieldKind, NodeId, PropertyGraph, ReferenceKind, ScalarType,
};

use crate::error::SchemaBuildError;

/// Everything the builders need to know about one derived object.
#[derive(Debug, Clone)]
pub(crate) struct ObjectInfo {
    pub name: String,
    pub table: String,
    /// Primary-key column of the backing table; `id` when none is declared.
    pub key_column: String,
    pub fields: Vec<FieldInfo>,
    pub mutation_fields: Vec<MutationField>,
}

#[derive(Debug, Clone)]
pub(crate) enum FieldInfo {
    Scalar {
        name: String,
        scalar: ScalarType,
        non_null: bool,
        column: String,
    },
    Forward {
        name: String,
        referenced_object: String,
        non_null: bool,
        /// The foreign-key column on the object's own table.
        column: String,
    },
    Backward {
        name: String,
        referenced_object: String,
        foreign_table: String,
        reference_column: String,
        return_column: String,
    },
    Joined {
        name: String,
        referenced_object: String,
        join_table: String,
        own_column: String,
        foreign_column: String,
    },
}

/// One mutation input field derived from an object field.
#[derive(Debug, Clone)]
pub(crate) struct MutationField {
    pub input_name: String,
    pub column: String,
    pub non_null: bool,
    pub kind: MutationFieldKind,
}

#[derive(Debug, Clone)]
pub(crate) enum MutationFieldKind {
    Scalar(ScalarType),
    PrimaryKey,
    Reference { object: String },
}

/// A join table collapsed to the unordered object pair it connects. Emitted
/// once, for the alphabetically ordered pair.
#[derive(Debug, Clone)]
pub(crate) struct AssociationInfo {
    pub first_object: String,
    pub second_object: String,
    pub join_table: String,
    /// Column referencing the first object's table.
    pub first_column: String,
    /// Column referencing the second object's table.
    pub second_column: String,
}

#[derive(Debug, Clone)]
pub(crate) struct ObjectSystem {
    pub objects: Vec<ObjectInfo>,
    pub associations: Vec<AssociationInfo>,
}

impl ObjectSystem {
    pub fn has_mutations(&self) -> bool {
        !self.objects.is_empty()
    }
}

fn primary_key_column(graph: &PropertyGraph, table: NodeId) -> Option<String> {
    graph.columns_of(table).find_map(|column| {
        graph[column]
            .as_column()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.clone())
    })
}

pub(crate) fn build_system(graph: &PropertyGraph) -> Result<ObjectSystem, SchemaBuildError> {
    let mut objects = vec![];
    let mut associations = vec![];

    for (object_id, object) in graph.objects() {
        let table_id = graph
            .table_of_object(object_id)
            .ok_or_else(|| SchemaBuildError::MissingTable(object.name.clone()))?;
        let table = graph[table_id].name().to_string();
        let key_column = primary_key_column(graph, table_id).unwrap_or_else(|| "id".to_string());

        let mut fields = vec![];
        let mut mutation_fields = vec![];

        for field_id in graph.fields_of(object_id) {
            let field = graph[field_id].as_field().ok_or_else(|| {
                SchemaBuildError::IncompleteField {
                    object: object.name.clone(),
                    field: graph[field_id].name().to_string(),
                    what: "field node",
                }
            })?;

            let target = |kind: EdgeKind, what: &'static str| {
                graph
                    .edges()
                    .from(field_id)
                    .of_kind(kind)
                    .first_target()
                    .map(|id| graph[id].name().to_string())
                    .ok_or_else(|| SchemaBuildError::IncompleteField {
                        object: object.name.clone(),
                        field: field.name.clone(),
                        what,
                    })
            };

            match &field.kind {
                FieldKind::Scalar {
                    value_type,
                    non_null,
                } => {
                    let column = target(EdgeKind::FieldHasColumn, "column")?;
                    fields.push(FieldInfo::Scalar {
                        name: field.name.clone(),
                        scalar: *value_type,
                        non_null: *non_null,
                        column: column.clone(),
                    });
                    mutation_fields.push(MutationField {
                        input_name: field.name.clone(),
                        column,
                        non_null: *non_null,
                        kind: match value_type {
                            ScalarType::Id => MutationFieldKind::PrimaryKey,
                            other => MutationFieldKind::Scalar(*other),
                        },
                    });
                }
                FieldKind::Reference {
                    reference: ReferenceKind::Forward,
                    non_null,
                } => {
                    let column = target(EdgeKind::FieldHasColumn, "column")?;
                    let referenced_object = target(EdgeKind::FieldReferencesObject, "referenced object")?;
                    let referenced_column = target(EdgeKind::FieldReferencesColumn, "referenced column")?;

                    fields.push(FieldInfo::Forward {
                        name: field.name.clone(),
                        referenced_object: referenced_object.clone(),
                        non_null: *non_null,
                        column: column.clone(),
                    });
                    mutation_fields.push(MutationField {
                        input_name: naming::reference_input_field_name(
                            &field.name,
                            &referenced_column,
                        ),
                        column,
                        non_null: *non_null,
                        kind: MutationFieldKind::Reference {
                            object: referenced_object,
                        },
                    });
                }
                FieldKind::Reference {
                    reference: ReferenceKind::Backward,
                    ..
                } => {
                    let foreign_table_id = graph
                        .edges()
                        .from(field_id)
                        .of_kind(EdgeKind::FieldReferencesTable)
                        .first_target()
                        .ok_or_else(|| SchemaBuildError::IncompleteField {
                            object: object.name.clone(),
                            field: field.name.clone(),
                            what: "referenced table",
                        })?;

                    fields.push(FieldInfo::Backward {
                        name: field.name.clone(),
                        referenced_object: target(
                            EdgeKind::FieldReferencesObject,
                            "referenced object",
                        )?,
                        foreign_table: graph[foreign_table_id].name().to_string(),
                        reference_column: target(
                            EdgeKind::FieldReferencesColumn,
                            "referenced column",
                        )?,
                        return_column: primary_key_column(graph, foreign_table_id)
                            .unwrap_or_else(|| "id".to_string()),
                    });
                }
                FieldKind::Reference {
                    reference: ReferenceKind::Joined,
                    ..
                } => {
                    let referenced_object =
                        target(EdgeKind::FieldReferencesObject, "referenced object")?;
                    let join_table = target(EdgeKind::FieldReferencesJoinTable, "join table")?;
                    let own_column =
                        target(EdgeKind::FieldReferencesOwnJoinColumn, "own join column")?;
                    let foreign_column = target(
                        EdgeKind::FieldReferencesForeignJoinColumn,
                        "foreign join column",
                    )?;

                    // one association per unordered pair
                    if object.name < referenced_object {
                        associations.push(AssociationInfo {
                            first_object: object.name.clone(),
                            second_object: referenced_object.clone(),
                            join_table: join_table.clone(),
                            first_column: own_column.clone(),
                            second_column: foreign_column.clone(),
                        });
                    }

                    fields.push(FieldInfo::Joined {
                        name: field.name.clone(),
                        referenced_object,
                        join_table,
                        own_column,
                        foreign_column,
                    });
                }
            }
        }

        objects.push(ObjectInfo {
            name: object.name.clone(),
            table,
            key_column,
            fields,
            mutation_fields,
        });
    }

    Ok(ObjectSystem {
        objects,
        associations,
    })
}
