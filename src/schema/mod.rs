//! Read-only typed view of a GraphQL schema.
//!
//! The explorer only needs a small slice of the type system: named types with
//! their kind, the fields and arguments of output types, the fields of input
//! objects, enum values, and the possible concrete types of abstract types.
//!
//! Schemas are loaded either from an introspection result
//! ([`Schema::from_introspection`], [`introspection::introspect`]) or from an
//! SDL document ([`Schema::from_sdl`]).

pub mod introspection;
pub mod sdl;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, SchemaResult};

/// Names of the scalars every schema provides.
pub const BUILTIN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// The reserved field carrying the concrete type of an object.
pub const TYPENAME_FIELD: &str = "__typename";

/// Classification of a named type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
}

impl TypeKind {
    /// Leaf types have no selectable sub-fields.
    pub fn is_leaf(self) -> bool {
        matches!(self, TypeKind::Scalar | TypeKind::Enum)
    }

    /// Interfaces and unions resolve to one of several object types.
    pub fn is_abstract(self) -> bool {
        matches!(self, TypeKind::Interface | TypeKind::Union)
    }
}

impl std::fmt::Display for TypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TypeKind::Scalar => "scalar",
            TypeKind::Object => "type",
            TypeKind::Interface => "interface",
            TypeKind::Union => "union",
            TypeKind::Enum => "enum",
            TypeKind::InputObject => "input",
        };
        f.write_str(s)
    }
}

/// A (possibly wrapped) reference to a named type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    pub fn list(of: TypeRef) -> Self {
        TypeRef::List(Box::new(of))
    }

    pub fn non_null(of: TypeRef) -> Self {
        TypeRef::NonNull(Box::new(of))
    }

    /// The innermost named type, stripping all list and non-null wrappers.
    pub fn named_type(&self) -> &str {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.named_type(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeRef::NonNull(_))
    }
}

impl std::fmt::Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeRef::Named(name) => f.write_str(name),
            TypeRef::List(inner) => write!(f, "[{inner}]"),
            TypeRef::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

/// An argument or input-object field declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputValueDef {
    pub name: String,
    pub ty: TypeRef,
    /// Default value as GraphQL literal text, if declared.
    pub default_value: Option<String>,
}

impl InputValueDef {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            default_value: None,
        }
    }

    pub fn with_default(mut self, literal: impl Into<String>) -> Self {
        self.default_value = Some(literal.into());
        self
    }

    /// Whether a non-null default is declared.
    pub fn has_default(&self) -> bool {
        self.default_value
            .as_deref()
            .is_some_and(|literal| literal.trim() != "null")
    }
}

/// A field of an object or interface type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub args: Vec<InputValueDef>,
    pub ty: TypeRef,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            ty,
        }
    }

    pub fn with_arg(mut self, arg: InputValueDef) -> Self {
        self.args.push(arg);
        self
    }
}

/// A named type definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedType {
    pub name: String,
    pub kind: TypeKind,
    /// Output fields (objects and interfaces).
    pub fields: Vec<FieldDef>,
    /// Input fields (input objects).
    pub input_fields: Vec<InputValueDef>,
    /// Interfaces implemented by an object or interface type.
    pub interfaces: Vec<String>,
    /// Members of a union type.
    pub members: Vec<String>,
    /// Values of an enum type.
    pub enum_values: Vec<String>,
}

impl NamedType {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            fields: Vec::new(),
            input_fields: Vec::new(),
            interfaces: Vec::new(),
            members: Vec::new(),
            enum_values: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A complete schema: named types in declaration order plus the query root.
#[derive(Debug, Clone)]
pub struct Schema {
    types: IndexMap<String, NamedType>,
    query_type: String,
}

impl Schema {
    /// Assemble a schema from type definitions.
    ///
    /// Built-in scalars are added when missing. Fails if the query type is not
    /// an object type or if any type reference is dangling.
    pub fn new(
        types: impl IntoIterator<Item = NamedType>,
        query_type: impl Into<String>,
    ) -> SchemaResult<Self> {
        let mut map: IndexMap<String, NamedType> = IndexMap::new();
        for ty in types {
            map.insert(ty.name.clone(), ty);
        }
        for scalar in BUILTIN_SCALARS {
            map.entry(scalar.to_string())
                .or_insert_with(|| NamedType::new(scalar, TypeKind::Scalar));
        }

        let query_type = query_type.into();
        match map.get(&query_type) {
            Some(t) if t.kind == TypeKind::Object => {}
            _ => return Err(SchemaError::MissingQueryType),
        }

        let schema = Self {
            types: map,
            query_type,
        };
        schema.check_references()?;
        Ok(schema)
    }

    fn check_references(&self) -> SchemaResult<()> {
        let known = |name: &str| -> SchemaResult<()> {
            if self.types.contains_key(name) {
                Ok(())
            } else {
                Err(SchemaError::UnknownType {
                    name: name.to_string(),
                })
            }
        };
        for ty in self.types.values() {
            for field in &ty.fields {
                known(field.ty.named_type())?;
                for arg in &field.args {
                    known(arg.ty.named_type())?;
                }
            }
            for input in &ty.input_fields {
                known(input.ty.named_type())?;
            }
            for name in ty.members.iter().chain(&ty.interfaces) {
                known(name)?;
            }
        }
        Ok(())
    }

    /// Look up a named type.
    pub fn get(&self, name: &str) -> Option<&NamedType> {
        self.types.get(name)
    }

    /// All named types in declaration order.
    pub fn types(&self) -> impl Iterator<Item = &NamedType> {
        self.types.values()
    }

    /// The root query type.
    pub fn query_type(&self) -> &NamedType {
        // Presence checked in `Schema::new`.
        &self.types[&self.query_type]
    }

    /// Kind of the named type behind a reference, if known.
    pub fn kind_of(&self, ty: &TypeRef) -> Option<TypeKind> {
        self.get(ty.named_type()).map(|t| t.kind)
    }

    /// Whether the named type behind a reference is a scalar or enum.
    pub fn is_leaf(&self, ty: &TypeRef) -> bool {
        self.kind_of(ty).is_some_and(TypeKind::is_leaf)
    }

    /// A field is simple if it takes no arguments and returns a leaf type.
    pub fn is_simple_field(&self, field: &FieldDef) -> bool {
        field.args.is_empty() && self.is_leaf(&field.ty)
    }

    /// Concrete object types an abstract type may resolve to.
    ///
    /// Union members in declaration order; for interfaces, every object type
    /// implementing it in schema order. Empty for any other kind.
    pub fn possible_types(&self, name: &str) -> Vec<&NamedType> {
        let Some(ty) = self.get(name) else {
            return Vec::new();
        };
        match ty.kind {
            TypeKind::Union => ty
                .members
                .iter()
                .filter_map(|m| self.get(m))
                .filter(|t| t.kind == TypeKind::Object)
                .collect(),
            TypeKind::Interface => self
                .types
                .values()
                .filter(|t| t.kind == TypeKind::Object && t.interfaces.iter().any(|i| i == name))
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shop() -> Schema {
        Schema::from_sdl(
            r#"
            type Query {
              customers(limit: Int): [Customer]
              node(id: ID!): Node
            }
            interface Node { id: ID! }
            union Customer = Individual | Company
            type Individual implements Node { id: ID! name: String }
            type Company implements Node { id: ID! form: String }
            "#,
        )
        .unwrap()
    }

    #[test]
    fn type_ref_display_and_named_type() {
        let ty = TypeRef::non_null(TypeRef::list(TypeRef::non_null(TypeRef::named("ID"))));
        assert_eq!(ty.to_string(), "[ID!]!");
        assert_eq!(ty.named_type(), "ID");
        assert!(ty.is_non_null());
    }

    #[test]
    fn builtin_scalars_are_present() {
        let schema = shop();
        for name in BUILTIN_SCALARS {
            assert_eq!(schema.get(name).unwrap().kind, TypeKind::Scalar);
        }
    }

    #[test]
    fn possible_types_of_union_and_interface() {
        let schema = shop();
        let union: Vec<_> = schema
            .possible_types("Customer")
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(union, vec!["Individual", "Company"]);

        let iface: Vec<_> = schema
            .possible_types("Node")
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(iface, vec!["Individual", "Company"]);

        assert!(schema.possible_types("Individual").is_empty());
    }

    #[test]
    fn dangling_reference_is_rejected() {
        let err = Schema::new(
            vec![NamedType {
                fields: vec![FieldDef::new("x", TypeRef::named("Missing"))],
                ..NamedType::new("Query", TypeKind::Object)
            }],
            "Query",
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownType { name } if name == "Missing"));
    }

    #[test]
    fn simple_fields() {
        let schema = shop();
        let individual = schema.get("Individual").unwrap();
        assert!(schema.is_simple_field(individual.field("name").unwrap()));
        let query = schema.query_type();
        assert!(!schema.is_simple_field(query.field("customers").unwrap()));
    }

    #[test]
    fn default_values() {
        let arg = InputValueDef::new("limit", TypeRef::named("Int")).with_default("10");
        assert!(arg.has_default());
        let arg = InputValueDef::new("limit", TypeRef::named("Int")).with_default("null");
        assert!(!arg.has_default());
    }
}
