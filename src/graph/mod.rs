//! Endpoint graph: the growing set of reachable fields and their history.
//!
//! An [`Endpoint`] is a field the explorer can request. Root fields of the
//! query type are endpoints from the start; deeper fields become endpoints
//! once an earlier response proves their parent resolves to data.
//!
//! Endpoints live in a `petgraph` arena with an edge from every parent to its
//! children. They are deduplicated by their dotted id
//! (`customers.contracts<Company>`) and never removed.

pub mod values;

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use serde_json::Value;

use crate::error::{SchemaError, SchemaResult};
use crate::outcome::{Outcome, ResponseError};
use crate::schema::{FieldDef, Schema, TYPENAME_FIELD, TypeKind};

pub use values::values_at_path;

/// Handle to an endpoint inside an [`EndpointGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointId(NodeIndex);

impl EndpointId {
    /// Position in discovery order.
    pub fn index(self) -> usize {
        self.0.index()
    }
}

/// A discovered field with its accumulated outcomes.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub field: FieldDef,
    pub parent: Option<EndpointId>,
    /// Concrete type this endpoint is scoped to when reached through an
    /// interface or union.
    pub on: Option<String>,
    results: Vec<Outcome>,
}

impl Endpoint {
    pub fn results(&self) -> &[Outcome] {
        &self.results
    }
}

/// Arena of endpoints keyed by their dotted id.
#[derive(Debug, Default)]
pub struct EndpointGraph {
    graph: DiGraph<Endpoint, ()>,
    by_id: HashMap<String, EndpointId>,
}

impl EndpointGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// One endpoint per root field of the query type.
    ///
    /// Fails if none of them is non-trivial, since nothing could ever be
    /// explored past the root.
    pub fn from_schema(schema: &Schema) -> SchemaResult<Self> {
        let query = schema.query_type();
        if query.fields.iter().all(|f| schema.is_simple_field(f)) {
            return Err(SchemaError::NoOperations);
        }

        let mut graph = Self::new();
        for field in &query.fields {
            graph.insert(field.clone(), None, None);
        }
        tracing::debug!(roots = graph.len(), query_type = %query.name, "endpoint graph initialized");
        Ok(graph)
    }

    /// Insert an endpoint unless one with the same id exists.
    ///
    /// Returns the endpoint's handle and whether it was newly added.
    pub fn insert(
        &mut self,
        field: FieldDef,
        parent: Option<EndpointId>,
        on: Option<String>,
    ) -> (EndpointId, bool) {
        let id = self.compose_id(&field.name, parent, on.as_deref());
        if let Some(existing) = self.by_id.get(&id) {
            return (*existing, false);
        }

        let node = self.graph.add_node(Endpoint {
            field,
            parent,
            on,
            results: Vec::new(),
        });
        let handle = EndpointId(node);
        if let Some(parent) = parent {
            self.graph.add_edge(parent.0, node, ());
        }
        self.by_id.insert(id, handle);
        (handle, true)
    }

    fn compose_id(&self, name: &str, parent: Option<EndpointId>, on: Option<&str>) -> String {
        let segment = match on {
            Some(on) => format!("{name}<{on}>"),
            None => name.to_string(),
        };
        match parent {
            Some(parent) => format!("{}.{segment}", self.id(parent)),
            None => segment,
        }
    }

    pub fn get(&self, e: EndpointId) -> &Endpoint {
        &self.graph[e.0]
    }

    /// Look up an endpoint by its dotted id.
    pub fn find(&self, id: &str) -> Option<EndpointId> {
        self.by_id.get(id).copied()
    }

    /// All endpoints in discovery order.
    pub fn ids(&self) -> impl Iterator<Item = EndpointId> + '_ {
        self.graph.node_indices().map(EndpointId)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Endpoints discovered beneath `e`.
    pub fn children(&self, e: EndpointId) -> Vec<EndpointId> {
        let mut children: Vec<EndpointId> = self
            .graph
            .neighbors_directed(e.0, Direction::Outgoing)
            .map(EndpointId)
            .collect();
        children.sort();
        children
    }

    /// Dotted ancestor chain with `<Discriminator>` suffixes.
    pub fn id(&self, e: EndpointId) -> String {
        let endpoint = self.get(e);
        self.compose_id(&endpoint.field.name, endpoint.parent, endpoint.on.as_deref())
    }

    /// Field names from the root down to `e`.
    pub fn path(&self, e: EndpointId) -> Vec<String> {
        let mut path = Vec::new();
        let mut cursor = Some(e);
        while let Some(current) = cursor {
            let endpoint = self.get(current);
            path.push(endpoint.field.name.clone());
            cursor = endpoint.parent;
        }
        path.reverse();
        path
    }

    /// Record an outcome for `e`.
    pub fn append(&mut self, e: EndpointId, outcome: Outcome) {
        self.graph[e.0].results.push(outcome);
    }

    /// Every outcome across all endpoints.
    pub fn outcomes(&self) -> impl Iterator<Item = &Outcome> {
        self.graph.node_weights().flat_map(|e| e.results.iter())
    }

    pub fn successful_results(&self, e: EndpointId) -> Vec<&Outcome> {
        self.get(e).results.iter().filter(|r| !r.failed).collect()
    }

    /// Outcomes proving that `e`'s path resolved to at least one non-null value.
    ///
    /// With a discriminator, only parent objects of that concrete type count.
    pub fn non_null_results(&self, e: EndpointId) -> Vec<&Outcome> {
        let path = self.path(e);
        let on = self.get(e).on.as_deref();
        self.get(e)
            .results
            .iter()
            .filter(|r| !resolve(r, &path, on).is_empty())
            .collect()
    }

    /// Non-null outcomes where the value at `e`'s path has concrete type `typename`.
    pub fn non_null_results_of_type(&self, e: EndpointId, typename: &str) -> Vec<&Outcome> {
        let path = self.path(e);
        let on = self.get(e).on.as_deref();
        self.get(e)
            .results
            .iter()
            .filter(|r| {
                resolve(r, &path, on)
                    .iter()
                    .any(|v| v.get(TYPENAME_FIELD).and_then(Value::as_str) == Some(typename))
            })
            .collect()
    }

    /// Errors reported at exactly `e`'s path.
    pub fn specific_errors(&self, e: EndpointId) -> Vec<&ResponseError> {
        let path = self.path(e);
        self.get(e)
            .results
            .iter()
            .flat_map(|r| r.errors())
            .filter(|error| error.path_equals(&path))
            .collect()
    }

    /// Child fields of `e` proven reachable by its outcomes so far.
    ///
    /// For an object return type: every non-trivial field, once any outcome is
    /// non-null. For an interface or union: the non-trivial fields of each
    /// concrete type observed in a non-null outcome, scoped to that type.
    pub fn reachable_children(&self, e: EndpointId, schema: &Schema) -> Vec<(FieldDef, Option<String>)> {
        let named = self.get(e).field.ty.named_type();
        let Some(ty) = schema.get(named) else {
            return Vec::new();
        };

        match ty.kind {
            TypeKind::Object => {
                if self.non_null_results(e).is_empty() {
                    return Vec::new();
                }
                ty.fields
                    .iter()
                    .filter(|f| !schema.is_simple_field(f))
                    .map(|f| (f.clone(), None))
                    .collect()
            }
            TypeKind::Interface | TypeKind::Union => schema
                .possible_types(named)
                .into_iter()
                .filter(|possible| !self.non_null_results_of_type(e, &possible.name).is_empty())
                .flat_map(|possible| {
                    possible
                        .fields
                        .iter()
                        .filter(|f| !schema.is_simple_field(f))
                        .map(|f| (f.clone(), Some(possible.name.clone())))
                })
                .collect(),
            TypeKind::Scalar | TypeKind::Enum | TypeKind::InputObject => Vec::new(),
        }
    }

    /// Merge the reachable children of `e` into the graph.
    ///
    /// Returns only endpoints that were not already present, so repeated
    /// calls are idempotent.
    pub fn expand(&mut self, e: EndpointId, schema: &Schema) -> Vec<EndpointId> {
        let mut added = Vec::new();
        for (field, on) in self.reachable_children(e, schema) {
            let (child, new) = self.insert(field, Some(e), on);
            if new {
                added.push(child);
            }
        }
        if !added.is_empty() {
            tracing::debug!(endpoint = %self.id(e), added = added.len(), "graph expanded");
        }
        added
    }
}

/// Non-null values at `path` in an outcome's data, honouring a discriminator.
fn resolve<'a>(outcome: &'a Outcome, path: &[String], on: Option<&str>) -> Vec<&'a Value> {
    let Some(data) = outcome.data.as_ref() else {
        return Vec::new();
    };
    let Some(on) = on else {
        return values_at_path(data, path);
    };
    let Some((last, parent_path)) = path.split_last() else {
        return Vec::new();
    };
    values_at_path(data, parent_path)
        .into_iter()
        .filter(|parent| parent.get(TYPENAME_FIELD).and_then(Value::as_str) == Some(on))
        .flat_map(|parent| values_at_path(parent, std::slice::from_ref(last)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::from_sdl(
            r#"
            type Query {
              hello: String
              customers(limit: Int, offset: Int): [Customer]
            }
            union Customer = Individual | Company
            enum CustomerType { INDIVIDUAL COMPANY }
            type Individual {
              id: ID!
              type: CustomerType
              name: String
              person: Person
              contracts: [Contract]
            }
            type Company {
              id: ID!
              type: CustomerType
              name: String
              form: String
              employees: [Person]
              contracts: [Contract]
            }
            type Contract { id: ID! customer: Customer }
            type Person { firstname: String lastname: String }
            "#,
        )
        .unwrap()
    }

    fn outcome(data: serde_json::Value) -> Outcome {
        Outcome::with_data(Document::new(vec![]), json!({ "customers": data }))
    }

    fn both() -> Outcome {
        outcome(json!([
            { "__typename": "Individual", "contracts": [{ "id": "4" }] },
            {
                "__typename": "Company",
                "form": "lol",
                "contracts": [{ "id": "5" }, { "id": "6" }, { "list": ["wut", null] }]
            }
        ]))
    }

    fn individual() -> Outcome {
        outcome(json!([{ "__typename": "Individual", "contracts": [{ "id": "4" }] }]))
    }

    fn company() -> Outcome {
        outcome(json!([{
            "__typename": "Company",
            "form": "lol",
            "contracts": [{ "id": "5" }, { "id": "6" }, { "list": ["wut", null] }]
        }]))
    }

    fn field(schema: &Schema, ty: &str, name: &str) -> FieldDef {
        schema.get(ty).unwrap().field(name).unwrap().clone()
    }

    #[test]
    fn ids_and_non_null_results() {
        let schema = schema();
        let mut graph = EndpointGraph::new();
        let (customers, _) = graph.insert(field(&schema, "Query", "customers"), None, None);
        let (individual_contracts, _) = graph.insert(
            field(&schema, "Individual", "contracts"),
            Some(customers),
            Some("Individual".into()),
        );
        let (company_contracts, _) = graph.insert(
            field(&schema, "Company", "contracts"),
            Some(customers),
            Some("Company".into()),
        );

        assert_eq!(graph.id(customers), "customers");
        assert_eq!(graph.id(individual_contracts), "customers.contracts<Individual>");
        assert_eq!(graph.id(company_contracts), "customers.contracts<Company>");
        assert_eq!(graph.path(company_contracts), vec!["customers", "contracts"]);

        for e in [customers, individual_contracts, company_contracts] {
            graph.append(e, both());
            graph.append(e, individual());
            graph.append(e, company());
        }

        assert_eq!(
            graph.non_null_results(customers),
            vec![&both(), &individual(), &company()]
        );
        assert_eq!(
            graph.non_null_results(individual_contracts),
            vec![&both(), &individual()]
        );
        assert_eq!(
            graph.non_null_results(company_contracts),
            vec![&both(), &company()]
        );

        assert_eq!(
            graph.non_null_results_of_type(customers, "Company"),
            vec![&both(), &company()]
        );
        // Ids do not depend on result history.
        assert_eq!(graph.id(company_contracts), "customers.contracts<Company>");
    }

    #[test]
    fn insert_deduplicates_by_id() {
        let schema = schema();
        let mut graph = EndpointGraph::new();
        let (a, new_a) = graph.insert(field(&schema, "Query", "customers"), None, None);
        let (b, new_b) = graph.insert(field(&schema, "Query", "customers"), None, None);
        assert!(new_a);
        assert!(!new_b);
        assert_eq!(a, b);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.find("customers"), Some(a));
    }

    #[test]
    fn expand_union_endpoint() {
        let schema = schema();
        let mut graph = EndpointGraph::from_schema(&schema).unwrap();
        let customers = graph.find("customers").unwrap();

        assert!(graph.expand(customers, &schema).is_empty());

        graph.append(customers, both());
        let added: Vec<String> = graph
            .expand(customers, &schema)
            .into_iter()
            .map(|e| graph.id(e))
            .collect();
        assert_eq!(
            added,
            vec![
                "customers.person<Individual>",
                "customers.contracts<Individual>",
                "customers.employees<Company>",
                "customers.contracts<Company>",
            ]
        );
        assert_eq!(graph.children(customers).len(), 4);

        assert!(graph.expand(customers, &schema).is_empty());
        assert_eq!(graph.len(), 6);
    }

    #[test]
    fn expand_object_endpoint_requires_non_null_result() {
        let schema = schema();
        let mut graph = EndpointGraph::from_schema(&schema).unwrap();
        let customers = graph.find("customers").unwrap();
        graph.append(customers, company());
        graph.expand(customers, &schema);

        let contracts = graph.find("customers.contracts<Company>").unwrap();
        graph.append(
            contracts,
            outcome(json!([{ "__typename": "Company", "contracts": [] }])),
        );
        assert!(graph.expand(contracts, &schema).is_empty());

        graph.append(contracts, company());
        let added: Vec<String> = graph
            .expand(contracts, &schema)
            .into_iter()
            .map(|e| graph.id(e))
            .collect();
        assert_eq!(added, vec!["customers.contracts<Company>.customer"]);
    }

    #[test]
    fn leaf_endpoints_never_expand() {
        let schema = schema();
        let mut graph = EndpointGraph::from_schema(&schema).unwrap();
        let hello = graph.find("hello").unwrap();
        graph.append(
            hello,
            Outcome::with_data(Document::new(vec![]), json!({ "hello": "world" })),
        );
        assert!(graph.expand(hello, &schema).is_empty());
    }

    #[test]
    fn specific_errors_match_exact_path() {
        let schema = schema();
        let mut graph = EndpointGraph::from_schema(&schema).unwrap();
        let customers = graph.find("customers").unwrap();
        let mut failed = Outcome::with_data(Document::new(vec![]), json!(null));
        failed.failed = true;
        failed.errors = Some(
            serde_json::from_value(json!([
                { "message": "at root", "path": ["customers"] },
                { "message": "nested", "path": ["customers", 0, "name"] },
                { "message": "global" }
            ]))
            .unwrap(),
        );
        graph.append(customers, failed);

        let errors: Vec<&str> = graph
            .specific_errors(customers)
            .iter()
            .map(|e| e.message.as_str())
            .collect();
        assert_eq!(errors, vec!["at root"]);
        assert!(graph.successful_results(customers).is_empty());
    }

    #[test]
    fn schema_without_operations_is_rejected() {
        let schema = Schema::from_sdl("type Query { hello: String }").unwrap();
        assert!(matches!(
            EndpointGraph::from_schema(&schema),
            Err(SchemaError::NoOperations)
        ));
    }


    #[test]
    fn expand_interface_endpoint() {
        let schema = Schema::from_sdl(
            r#"
            type Query { node(id: ID): Node }
            interface Node { id: ID! }
            type Account implements Node { id: ID! items: [Item] }
            type Device implements Node { id: ID! owner: Account }
            type Item { id: ID! }
            "#,
        )
        .unwrap();
        let mut graph = EndpointGraph::from_schema(&schema).unwrap();
        let node = graph.find("node").unwrap();
        let account = || {
            Outcome::with_data(
                Document::new(vec![]),
                json!({ "node": { "__typename": "Account", "id": "1", "items": [{ "id": "2" }] } }),
            )
        };
        let device = || {
            Outcome::with_data(
                Document::new(vec![]),
                json!({ "node": { "__typename": "Device", "id": "3", "owner": null } }),
            )
        };

        graph.append(node, account());
        let added: Vec<String> = graph.expand(node, &schema).into_iter().map(|e| graph.id(e)).collect();
        assert_eq!(added, vec!["node.items<Account>"]);
        assert!(graph.expand(node, &schema).is_empty());

        let items = graph.find("node.items<Account>").unwrap();
        assert_eq!(graph.get(items).on.as_deref(), Some("Account"));
        graph.append(items, device());
        assert!(graph.non_null_results(items).is_empty());
        graph.append(items, account());
        assert_eq!(graph.non_null_results(items), vec![&account()]);

        graph.append(node, device());
        let added: Vec<String> = graph.expand(node, &schema).into_iter().map(|e| graph.id(e)).collect();
        assert_eq!(added, vec!["node.owner<Device>"]);
        assert_eq!(graph.len(), 3);
    }
}
