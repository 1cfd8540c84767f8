//! Request synthesis: build a complete query document for an endpoint.
//!
//! Selections ask for every simple field of the endpoint's return type (plus
//! `__typename`), arguments are filled from memory when it knows relevant
//! values, and nested endpoints are reached by grafting the new field into a
//! prior request that proved the parent path resolves.

pub mod fake;

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::document::{Argument, Document, Field, Selection, Value, rewrite_selections};
use crate::error::{SynthError, SynthResult};
use crate::graph::{EndpointGraph, EndpointId};
use crate::memory::{Assoc, FuzzyMemory, Tokenizer};
use crate::schema::{FieldDef, InputValueDef, NamedType, Schema, TYPENAME_FIELD, TypeKind, TypeRef};

/// Input nesting depth past which optional inputs are no longer generated.
pub const MAX_INPUT_DEPTH: usize = 8;

/// Tunable probabilities for argument synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisOptions {
    /// Chance of sending `null` for a nullable input.
    pub null_probability: f64,
    /// Lists get between zero and this many elements.
    pub max_list_length: usize,
    /// Chance of ignoring memory candidates for a name-based guess.
    pub fallback_probability: f64,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            null_probability: 0.5,
            max_list_length: 3,
            fallback_probability: 0.1,
        }
    }
}

/// Memory lookup labels for an input value.
///
/// `ancestors` are the names of the enclosing input fields, outermost first,
/// starting with the argument itself when `input` is nested in an input object.
pub fn input_assoc(type_name: &str, input: &InputValueDef, ancestors: &[&str], field: &FieldDef) -> Assoc {
    let mut assoc = Assoc::new();
    assoc.insert(input.name.clone(), 1.0);
    assoc.insert(type_name.to_string(), 0.5);
    assoc.insert(
        format!("{} {}", field.name, input.name),
        1.0 / (ancestors.len() as f64 + 1.0),
    );
    if !ancestors.is_empty() {
        let mut phrase = ancestors.join(" ");
        phrase.push(' ');
        phrase.push_str(&input.name);
        assoc.insert(phrase, 1.0);
    }
    assoc
}

/// Generates request documents from the schema, memory and a random stream.
///
/// All randomness is drawn from the borrowed generator, so a seeded generator
/// reproduces the same requests for the same memory and graph state.
pub struct Synthesizer<'a, T: Tokenizer, R: Rng> {
    schema: &'a Schema,
    memory: &'a FuzzyMemory<T>,
    options: &'a SynthesisOptions,
    rng: &'a mut R,
}

impl<'a, T: Tokenizer, R: Rng> Synthesizer<'a, T, R> {
    pub fn new(
        schema: &'a Schema,
        memory: &'a FuzzyMemory<T>,
        options: &'a SynthesisOptions,
        rng: &'a mut R,
    ) -> Self {
        Self {
            schema,
            memory,
            options,
            rng,
        }
    }

    /// Build the request for endpoint `e`.
    ///
    /// Root endpoints get a fresh document. Nested endpoints reuse the request
    /// of a random prior outcome in which the parent resolved to data.
    pub fn synthesize(&mut self, graph: &EndpointGraph, e: EndpointId) -> SynthResult<Document> {
        let endpoint = graph.get(e);
        let node = self.field_node(&endpoint.field)?;

        let path_selections = match &endpoint.on {
            Some(on) => vec![
                Selection::field(TYPENAME_FIELD),
                Selection::fragment(on.clone(), vec![Selection::Field(node)]),
            ],
            None => vec![Selection::Field(node)],
        };

        let Some(parent) = endpoint.parent else {
            return Ok(Document::new(path_selections));
        };

        let candidates = match &endpoint.on {
            Some(on) => graph.non_null_results_of_type(parent, on),
            None => graph.non_null_results(parent),
        };
        let Some(base) = candidates.choose(&mut *self.rng) else {
            return Err(SynthError::MissingParentResults {
                endpoint: graph.id(e),
            });
        };

        Ok(rewrite_selections(&base.document, &graph.path(parent), &path_selections))
    }

    /// The field with generated arguments and its selection set.
    pub fn field_node(&mut self, field: &FieldDef) -> SynthResult<Field> {
        Ok(Field {
            name: field.name.clone(),
            arguments: self.arguments(field)?,
            selections: self.selections(field.ty.named_type()),
        })
    }

    /// Selection set requesting every simple field of `type_name`.
    pub fn selections(&self, type_name: &str) -> Vec<Selection> {
        let Some(ty) = self.schema.get(type_name) else {
            return Vec::new();
        };
        let mut selections = match ty.kind {
            TypeKind::Object => self.simple_fields(ty),
            TypeKind::Interface | TypeKind::Union => self
                .schema
                .possible_types(type_name)
                .into_iter()
                .map(|possible| Selection::fragment(possible.name.clone(), self.simple_fields(possible)))
                .collect(),
            TypeKind::Scalar | TypeKind::Enum | TypeKind::InputObject => return Vec::new(),
        };
        selections.push(Selection::field(TYPENAME_FIELD));
        selections
    }

    fn simple_fields(&self, ty: &NamedType) -> Vec<Selection> {
        ty.fields
            .iter()
            .filter(|f| self.schema.is_simple_field(f))
            .map(|f| Selection::field(f.name.clone()))
            .collect()
    }

    /// One argument per declared argument; arguments that came out null are omitted.
    pub fn arguments(&mut self, field: &FieldDef) -> SynthResult<Vec<Argument>> {
        let mut arguments = Vec::with_capacity(field.args.len());
        for arg in &field.args {
            let value = self.gen_input(&arg.ty, arg, &[], field)?;
            if !value.is_null() {
                arguments.push(Argument {
                    name: arg.name.clone(),
                    value,
                });
            }
        }
        Ok(arguments)
    }

    /// A value for `input` of type `ty`, possibly null if the type allows it.
    pub fn gen_input(
        &mut self,
        ty: &TypeRef,
        input: &InputValueDef,
        ancestors: &[&str],
        field: &FieldDef,
    ) -> SynthResult<Value> {
        if let TypeRef::NonNull(inner) = ty {
            return self.gen_non_null(inner, input, ancestors, field);
        }
        if ancestors.len() >= MAX_INPUT_DEPTH {
            return Ok(Value::Null);
        }
        if self.rng.gen_range(0.0..1.0) < self.options.null_probability {
            return Ok(Value::Null);
        }
        self.gen_non_null(ty, input, ancestors, field)
    }

    fn gen_non_null(
        &mut self,
        ty: &TypeRef,
        input: &InputValueDef,
        ancestors: &[&str],
        field: &FieldDef,
    ) -> SynthResult<Value> {
        let name = match ty {
            TypeRef::Named(name) => name,
            TypeRef::List(inner) => {
                if ancestors.len() >= MAX_INPUT_DEPTH {
                    return Ok(Value::List(Vec::new()));
                }
                let len = self.rng.gen_range(0..=self.options.max_list_length);
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(self.gen_input(inner, input, ancestors, field)?);
                }
                return Ok(Value::List(items));
            }
            // A non-null type never wraps another non-null type.
            TypeRef::NonNull(_) => {
                return Err(SynthError::UnknownType {
                    name: ty.to_string(),
                });
            }
        };

        let schema = self.schema;
        let named = schema
            .get(name)
            .ok_or_else(|| SynthError::UnknownType { name: name.clone() })?;

        match named.kind {
            TypeKind::InputObject => {
                let mut nested = ancestors.to_vec();
                nested.push(&input.name);
                let mut fields = Vec::with_capacity(named.input_fields.len());
                for input_field in &named.input_fields {
                    let value = self.gen_input(&input_field.ty, input_field, &nested, field)?;
                    fields.push((input_field.name.clone(), value));
                }
                Ok(Value::Object(fields))
            }
            TypeKind::Enum => Ok(named
                .enum_values
                .choose(&mut *self.rng)
                .map_or(Value::Null, |v| Value::Enum(v.clone()))),
            TypeKind::Scalar => self.gen_scalar(named, input, ancestors, field),
            TypeKind::Object | TypeKind::Interface | TypeKind::Union => {
                Err(SynthError::UnknownType { name: name.clone() })
            }
        }
    }

    /// Memory-guided scalar: a weighted pick among recalled values, or a
    /// name-based guess when memory has nothing or on a fallback draw.
    fn gen_scalar(
        &mut self,
        scalar: &NamedType,
        input: &InputValueDef,
        ancestors: &[&str],
        field: &FieldDef,
    ) -> SynthResult<Value> {
        if scalar.name == "Boolean" {
            return Ok(Value::Boolean(self.rng.gen_bool(0.5)));
        }

        let assoc = input_assoc(&scalar.name, input, ancestors, field);
        let recalled = self.memory.query(&assoc)?;

        let value = match scalar.name.as_str() {
            "Float" => {
                let candidates: Vec<(f64, f64)> = recalled
                    .iter()
                    .filter_map(|r| r.value.as_f64().map(|x| (x, r.score)))
                    .collect();
                match self.pick_candidate(&candidates) {
                    Some(x) => Value::Float(x),
                    None => Value::Float(fake::float(&mut *self.rng)),
                }
            }
            "Int" => {
                let candidates: Vec<(i64, f64)> = recalled
                    .iter()
                    .filter_map(|r| r.value.as_i64().map(|i| (i, r.score)))
                    .collect();
                match self.pick_candidate(&candidates) {
                    Some(i) => Value::Int(i),
                    None => Value::Int(fake::integer_for(&mut *self.rng, &input.name)),
                }
            }
            // ID, String and custom scalars travel as strings.
            _ => {
                let candidates: Vec<(String, f64)> = recalled
                    .iter()
                    .map(|r| (r.value.to_string(), r.score))
                    .collect();
                match self.pick_candidate(&candidates) {
                    Some(s) => Value::String(s),
                    None => Value::String(fake::string_for(&mut *self.rng, &input.name)),
                }
            }
        };
        Ok(value)
    }

    /// Roulette-wheel pick by score, or `None` to fall back to a fresh guess.
    fn pick_candidate<V: Clone>(&mut self, candidates: &[(V, f64)]) -> Option<V> {
        if candidates.is_empty() {
            return None;
        }
        if self.rng.gen_range(0.0..1.0) <= self.options.fallback_probability {
            return None;
        }
        let weights = WeightedIndex::new(candidates.iter().map(|(_, score)| *score)).ok()?;
        Some(candidates[weights.sample(&mut *self.rng)].0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryValue, assoc};
    use crate::outcome::Outcome;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::json;

    const SDL: &str = r#"
        type Query {
          hello: String
          customers(limit: Int, offset: Int): [Customer]
          customer(id: ID!): Customer
          search(filter: Filter!): [Customer]
          ratio(value: Float!): Float
          flag(on: Boolean!, kind: CustomerType!): Boolean
        }
        input Filter { name: String! next: Filter tags: [String!] }
        enum CustomerType { INDIVIDUAL COMPANY }
        union Customer = Individual | Company
        type Individual { id: ID! type: CustomerType name: String contracts: [Contract] }
        type Company { id: ID! name: String form: String contracts: [Contract] }
        type Contract { id: ID! }
    "#;

    fn schema() -> Schema {
        Schema::from_sdl(SDL).unwrap()
    }

    fn root(schema: &Schema, name: &str) -> FieldDef {
        schema.query_type().field(name).unwrap().clone()
    }

    #[test]
    fn builds_lookup_labels() {
        let schema = schema();
        let customer = root(&schema, "customer");
        let id = &customer.args[0];
        assert_eq!(
            input_assoc("ID", id, &[], &customer),
            assoc(&[("id", 1.0), ("ID", 0.5), ("customer id", 1.0)])
        );

        let search = root(&schema, "search");
        let name = InputValueDef::new("name", TypeRef::named("String"));
        assert_eq!(
            input_assoc("String", &name, &["filter"], &search),
            assoc(&[
                ("name", 1.0),
                ("String", 0.5),
                ("search name", 0.5),
                ("filter name", 1.0),
            ])
        );
    }

    #[test]
    fn union_selections_use_fragments() {
        let schema = schema();
        let memory = FuzzyMemory::default();
        let options = SynthesisOptions::default();
        let mut rng = StdRng::seed_from_u64(1);
        let synth = Synthesizer::new(&schema, &memory, &options, &mut rng);

        let doc = Document::new(synth.selections("Customer"));
        assert_eq!(
            doc.to_string(),
            "{\n  ... on Individual {\n    id\n    type\n    name\n  }\n  ... on Company {\n    id\n    name\n    form\n  }\n  __typename\n}"
        );
        assert_eq!(
            Document::new(synth.selections("Contract")).to_string(),
            "{\n  id\n  __typename\n}"
        );
        assert!(synth.selections("String").is_empty());
    }

    #[test]
    fn recalls_remembered_ids() {
        let schema = schema();
        let mut memory = FuzzyMemory::default();
        memory
            .store(MemoryValue::from("4"), assoc(&[("id", 0.2), ("customer id", 0.7)]))
            .unwrap();
        let options = SynthesisOptions {
            fallback_probability: 0.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let mut synth = Synthesizer::new(&schema, &memory, &options, &mut rng);

        let customer = root(&schema, "customer");
        let args = synth.arguments(&customer).unwrap();
        assert_eq!(args, vec![Argument { name: "id".into(), value: Value::String("4".into()) }]);
    }

    #[test]
    fn int_candidates_must_be_integral() {
        let schema = schema();
        let mut memory = FuzzyMemory::default();
        memory.store(MemoryValue::from("many"), assoc(&[("limit", 1.0)])).unwrap();
        memory.store(MemoryValue::from("7"), assoc(&[("limit", 1.0)])).unwrap();
        let options = SynthesisOptions {
            null_probability: 0.0,
            fallback_probability: 0.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(9);
        let mut synth = Synthesizer::new(&schema, &memory, &options, &mut rng);

        let customers = root(&schema, "customers");
        for _ in 0..10 {
            let args = synth.arguments(&customers).unwrap();
            assert_eq!(args[0].value, Value::Int(7));
        }
    }

    #[test]
    fn nulls_are_omitted_and_non_null_is_always_sent() {
        let schema = schema();
        let memory = FuzzyMemory::default();
        let options = SynthesisOptions {
            null_probability: 1.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(2);
        let mut synth = Synthesizer::new(&schema, &memory, &options, &mut rng);

        assert!(synth.arguments(&root(&schema, "customers")).unwrap().is_empty());

        let flag = synth.arguments(&root(&schema, "flag")).unwrap();
        assert_eq!(flag.len(), 2);
        assert!(matches!(flag[0].value, Value::Boolean(_)));
        assert!(matches!(&flag[1].value, Value::Enum(v) if v == "INDIVIDUAL" || v == "COMPANY"));

        let search = synth.arguments(&root(&schema, "search")).unwrap();
        match &search[0].value {
            Value::Object(fields) => {
                assert_eq!(fields[0].0, "name");
                assert!(matches!(fields[0].1, Value::String(_)));
                assert_eq!(fields[1], ("next".to_string(), Value::Null));
                assert_eq!(fields[2], ("tags".to_string(), Value::Null));
            }
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn self_referential_inputs_terminate() {
        let schema = schema();
        let memory = FuzzyMemory::default();
        let options = SynthesisOptions {
            null_probability: 0.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(4);
        let mut synth = Synthesizer::new(&schema, &memory, &options, &mut rng);

        let search = synth.arguments(&root(&schema, "search")).unwrap();
        let mut depth = 0;
        let mut cursor = &search[0].value;
        while let Value::Object(fields) = cursor {
            depth += 1;
            cursor = &fields[1].1;
        }
        assert_eq!(*cursor, Value::Null);
        assert_eq!(depth, MAX_INPUT_DEPTH);
    }

    #[test]
    fn root_documents_are_deterministic_per_seed() {
        let schema = schema();
        let memory = FuzzyMemory::default();
        let options = SynthesisOptions::default();
        let graph = EndpointGraph::from_schema(&schema).unwrap();
        let search = graph.find("search").unwrap();

        let render = |seed: u64| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut synth = Synthesizer::new(&schema, &memory, &options, &mut rng);
            (0..5)
                .map(|_| synth.synthesize(&graph, search).unwrap().to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(render(42), render(42));
    }

    #[test]
    fn nested_endpoint_requires_parent_results() {
        let schema = schema();
        let memory = FuzzyMemory::default();
        let options = SynthesisOptions::default();
        let mut graph = EndpointGraph::from_schema(&schema).unwrap();
        let customers = graph.find("customers").unwrap();
        let contracts = schema.get("Company").unwrap().field("contracts").unwrap().clone();
        let (child, _) = graph.insert(contracts, Some(customers), Some("Company".into()));

        let mut rng = StdRng::seed_from_u64(1);
        let mut synth = Synthesizer::new(&schema, &memory, &options, &mut rng);
        let err = synth.synthesize(&graph, child).unwrap_err();
        assert!(
            matches!(err, SynthError::MissingParentResults { endpoint } if endpoint == "customers.contracts<Company>")
        );
    }

    #[test]
    fn nested_endpoint_grafts_into_parent_request() {
        let schema = schema();
        let memory = FuzzyMemory::default();
        let options = SynthesisOptions::default();
        let mut graph = EndpointGraph::from_schema(&schema).unwrap();
        let customers = graph.find("customers").unwrap();

        let parent_doc = Document::new(vec![Selection::Field(Field {
            name: "customers".into(),
            arguments: vec![Argument {
                name: "limit".into(),
                value: Value::Int(3),
            }],
            selections: vec![Selection::field("__typename")],
        })]);
        graph.append(
            customers,
            Outcome::with_data(
                parent_doc,
                json!({ "customers": [{ "__typename": "Company", "contracts": [{ "id": "5" }] }] }),
            ),
        );
        let added = graph.expand(customers, &schema);
        let contracts = added
            .into_iter()
            .find(|e| graph.id(*e) == "customers.contracts<Company>")
            .unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        let mut synth = Synthesizer::new(&schema, &memory, &options, &mut rng);
        let doc = synth.synthesize(&graph, contracts).unwrap();
        assert_eq!(
            doc.to_string(),
            "{\n  customers(limit: 3) {\n    __typename\n    ... on Company {\n      contracts {\n        id\n        __typename\n      }\n    }\n  }\n}"
        );
    }

    const NODE_SDL: &str = r#"
        type Query { node(id: ID): Node }
        interface Node { id: ID! }
        type Account implements Node { id: ID! label: String items: [Item] }
        type Device implements Node { id: ID! }
        type Item { id: ID! }
    "#;

    #[test]
    fn interface_selections_use_fragments_per_implementor() {
        let schema = Schema::from_sdl(NODE_SDL).unwrap();
        let memory = FuzzyMemory::default();
        let options = SynthesisOptions::default();
        let mut rng = StdRng::seed_from_u64(1);
        let synth = Synthesizer::new(&schema, &memory, &options, &mut rng);

        assert_eq!(
            Document::new(synth.selections("Node")).to_string(),
            "{\n  ... on Account {\n    id\n    label\n  }\n  ... on Device {\n    id\n  }\n  __typename\n}"
        );
    }

    #[test]
    fn nested_endpoint_grafts_through_interface() {
        let schema = Schema::from_sdl(NODE_SDL).unwrap();
        let memory = FuzzyMemory::default();
        let options = SynthesisOptions::default();
        let mut graph = EndpointGraph::from_schema(&schema).unwrap();
        let node = graph.find("node").unwrap();

        let parent_doc = Document::new(vec![Selection::Field(Field {
            name: "node".into(),
            arguments: vec![],
            selections: vec![Selection::field("__typename")],
        })]);
        graph.append(
            node,
            Outcome::with_data(
                parent_doc,
                json!({ "node": { "__typename": "Account", "items": [{ "id": "2" }] } }),
            ),
        );
        graph.expand(node, &schema);
        let items = graph.find("node.items<Account>").unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        let mut synth = Synthesizer::new(&schema, &memory, &options, &mut rng);
        assert_eq!(
            synth.synthesize(&graph, items).unwrap().to_string(),
            "{\n  node {\n    __typename\n    ... on Account {\n      items {\n        id\n        __typename\n      }\n    }\n  }\n}"
        );
    }
}
