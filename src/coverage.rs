//! Coverage report: which explorable fields have been reached so far.
//!
//! A field is explorable if it can become an endpoint: every root field, and
//! every non-trivial field of an object or interface type reachable from the
//! query type. A field is discovered once an endpoint exists for it and
//! non-null once one of its endpoints produced data.

use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::graph::EndpointGraph;
use crate::schema::{Schema, TypeKind};

/// Per-field counters: `[requests, non-null results]`.
pub type FieldCounts = [usize; 2];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coverage {
    pub total_fields: usize,
    pub discovered_fields: usize,
    pub non_null_fields: usize,
    pub types: IndexMap<String, IndexMap<String, FieldCounts>>,
}

impl Coverage {
    /// Compute coverage of the schema from the current graph state.
    pub fn compute(schema: &Schema, graph: &EndpointGraph) -> Self {
        let mut types: IndexMap<String, IndexMap<String, FieldCounts>> = IndexMap::new();
        for type_name in reachable_types(schema) {
            let Some(ty) = schema.get(&type_name) else {
                continue;
            };
            let is_root = type_name == schema.query_type().name;
            let fields: IndexMap<String, FieldCounts> = ty
                .fields
                .iter()
                .filter(|f| is_root || !schema.is_simple_field(f))
                .map(|f| (f.name.clone(), [0, 0]))
                .collect();
            if !fields.is_empty() {
                types.insert(type_name, fields);
            }
        }

        let mut discovered: IndexSet<(String, String)> = IndexSet::new();
        let mut non_null: IndexSet<(String, String)> = IndexSet::new();

        for e in graph.ids() {
            let endpoint = graph.get(e);
            let owner = match (&endpoint.on, endpoint.parent) {
                (Some(on), _) => on.clone(),
                (None, Some(parent)) => graph.get(parent).field.ty.named_type().to_string(),
                (None, None) => schema.query_type().name.clone(),
            };
            let results = endpoint.results().len();
            let non_null_results = graph.non_null_results(e).len();

            let Some(counts) = types
                .get_mut(&owner)
                .and_then(|fields| fields.get_mut(&endpoint.field.name))
            else {
                continue;
            };
            counts[0] += results;
            counts[1] += non_null_results;

            let key = (owner, endpoint.field.name.clone());
            if non_null_results > 0 {
                non_null.insert(key.clone());
            }
            discovered.insert(key);
        }

        Self {
            total_fields: types.values().map(IndexMap::len).sum(),
            discovered_fields: discovered.len(),
            non_null_fields: non_null.len(),
            types,
        }
    }

    /// Share of explorable fields discovered, in `0.0..=1.0`.
    pub fn ratio(&self) -> f64 {
        if self.total_fields == 0 {
            0.0
        } else {
            self.discovered_fields as f64 / self.total_fields as f64
        }
    }
}

/// Object and interface types reachable from the query type, in visit order.
fn reachable_types(schema: &Schema) -> IndexSet<String> {
    let mut seen = IndexSet::new();
    let mut queue = VecDeque::from([schema.query_type().name.clone()]);

    while let Some(name) = queue.pop_front() {
        let Some(ty) = schema.get(&name) else {
            continue;
        };
        match ty.kind {
            TypeKind::Object | TypeKind::Interface => {
                if !seen.insert(name.clone()) {
                    continue;
                }
                for field in &ty.fields {
                    queue.push_back(field.ty.named_type().to_string());
                }
                if ty.kind == TypeKind::Interface {
                    queue.extend(schema.possible_types(&name).into_iter().map(|t| t.name.clone()));
                }
            }
            TypeKind::Union => {
                queue.extend(schema.possible_types(&name).into_iter().map(|t| t.name.clone()));
            }
            TypeKind::Scalar | TypeKind::Enum | TypeKind::InputObject => {}
        }
    }
    seen
}
