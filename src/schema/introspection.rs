//! Schema loading from GraphQL introspection results.
//!
//! Accepts the standard `__schema` payload, with or without the `data`
//! envelope, and can fetch it live over HTTP.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{SchemaError, SchemaResult};

use super::{FieldDef, InputValueDef, NamedType, Schema, TypeKind, TypeRef};

/// The introspection query sent to live endpoints (descriptions omitted).
pub const INTROSPECTION_QUERY: &str = r#"query IntrospectionQuery {
  __schema {
    queryType { name }
    types { ...FullType }
  }
}

fragment FullType on __Type {
  kind
  name
  fields(includeDeprecated: true) {
    name
    args { ...InputValue }
    type { ...TypeRef }
  }
  inputFields { ...InputValue }
  interfaces { ...TypeRef }
  enumValues(includeDeprecated: true) { name }
  possibleTypes { ...TypeRef }
}

fragment InputValue on __InputValue {
  name
  type { ...TypeRef }
  defaultValue
}

fragment TypeRef on __Type {
  kind
  name
  ofType {
    kind
    name
    ofType {
      kind
      name
      ofType {
        kind
        name
        ofType {
          kind
          name
          ofType {
            kind
            name
            ofType {
              kind
              name
              ofType { kind name }
            }
          }
        }
      }
    }
  }
}"#;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Root>,
    #[serde(default)]
    errors: Option<Vec<ErrorEntry>>,
    #[serde(rename = "__schema", default)]
    schema: Option<RawSchema>,
}

#[derive(Debug, Deserialize)]
struct Root {
    #[serde(rename = "__schema")]
    schema: RawSchema,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSchema {
    query_type: Option<NameRef>,
    types: Vec<RawType>,
}

#[derive(Debug, Deserialize)]
struct NameRef {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawType {
    kind: String,
    name: Option<String>,
    #[serde(default)]
    fields: Option<Vec<RawField>>,
    #[serde(default)]
    input_fields: Option<Vec<RawInputValue>>,
    #[serde(default)]
    interfaces: Option<Vec<RawTypeRef>>,
    #[serde(default)]
    enum_values: Option<Vec<NameRef>>,
    #[serde(default)]
    possible_types: Option<Vec<RawTypeRef>>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    name: String,
    #[serde(default)]
    args: Vec<RawInputValue>,
    #[serde(rename = "type")]
    ty: RawTypeRef,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInputValue {
    name: String,
    #[serde(rename = "type")]
    ty: RawTypeRef,
    #[serde(default)]
    default_value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTypeRef {
    kind: String,
    name: Option<String>,
    #[serde(default)]
    of_type: Option<Box<RawTypeRef>>,
}

impl RawTypeRef {
    fn convert(&self) -> SchemaResult<TypeRef> {
        let inner = || -> SchemaResult<TypeRef> {
            self.of_type
                .as_deref()
                .ok_or_else(|| SchemaError::Introspection {
                    message: format!("{} type reference without ofType", self.kind),
                })?
                .convert()
        };
        match self.kind.as_str() {
            "NON_NULL" => Ok(TypeRef::non_null(inner()?)),
            "LIST" => Ok(TypeRef::list(inner()?)),
            _ => self
                .name
                .clone()
                .map(TypeRef::Named)
                .ok_or_else(|| SchemaError::Introspection {
                    message: "named type reference without a name".into(),
                }),
        }
    }
}

fn convert_kind(kind: &str) -> Option<TypeKind> {
    match kind {
        "SCALAR" => Some(TypeKind::Scalar),
        "OBJECT" => Some(TypeKind::Object),
        "INTERFACE" => Some(TypeKind::Interface),
        "UNION" => Some(TypeKind::Union),
        "ENUM" => Some(TypeKind::Enum),
        "INPUT_OBJECT" => Some(TypeKind::InputObject),
        _ => None,
    }
}

fn convert_input(raw: &RawInputValue) -> SchemaResult<InputValueDef> {
    Ok(InputValueDef {
        name: raw.name.clone(),
        ty: raw.ty.convert()?,
        default_value: raw.default_value.clone(),
    })
}

fn convert_type(raw: &RawType) -> SchemaResult<Option<NamedType>> {
    let (Some(kind), Some(name)) = (convert_kind(&raw.kind), raw.name.as_ref()) else {
        return Ok(None);
    };
    let mut ty = NamedType::new(name.clone(), kind);

    for field in raw.fields.iter().flatten() {
        ty.fields.push(FieldDef {
            name: field.name.clone(),
            args: field.args.iter().map(convert_input).collect::<SchemaResult<_>>()?,
            ty: field.ty.convert()?,
        });
    }
    for input in raw.input_fields.iter().flatten() {
        ty.input_fields.push(convert_input(input)?);
    }
    ty.interfaces = raw
        .interfaces
        .iter()
        .flatten()
        .filter_map(|i| i.name.clone())
        .collect();
    ty.enum_values = raw
        .enum_values
        .iter()
        .flatten()
        .map(|v| v.name.clone())
        .collect();
    if kind == TypeKind::Union {
        ty.members = raw
            .possible_types
            .iter()
            .flatten()
            .filter_map(|p| p.name.clone())
            .collect();
    }
    Ok(Some(ty))
}

impl Schema {
    /// Build a schema from an introspection result.
    ///
    /// Accepts `{"data": {"__schema": ...}}` as well as a bare `{"__schema": ...}`.
    /// Introspection meta types (`__Type`, ...) are kept; they are never
    /// reachable from the query root except through `__typename`, which the
    /// explorer handles separately.
    pub fn from_introspection(json: &serde_json::Value) -> SchemaResult<Self> {
        let envelope: Envelope =
            serde_json::from_value(json.clone()).map_err(|e| SchemaError::Introspection {
                message: format!("malformed introspection result: {e}"),
            })?;

        if let Some(errors) = envelope.errors.filter(|e| !e.is_empty()) {
            let joined: Vec<_> = errors.into_iter().map(|e| e.message).collect();
            return Err(SchemaError::Introspection {
                message: joined.join("; "),
            });
        }

        let raw = envelope
            .data
            .map(|root| root.schema)
            .or(envelope.schema)
            .ok_or_else(|| SchemaError::Introspection {
                message: "no data".into(),
            })?;

        let query_type = raw
            .query_type
            .map(|q| q.name)
            .ok_or(SchemaError::MissingQueryType)?;

        let mut types = Vec::with_capacity(raw.types.len());
        for raw_type in &raw.types {
            if let Some(ty) = convert_type(raw_type)? {
                types.push(ty);
            }
        }

        Schema::new(types, query_type)
    }
}

/// Fetch and parse a schema from a live endpoint.
pub fn introspect(
    url: &str,
    headers: &BTreeMap<String, String>,
    timeout: Duration,
) -> SchemaResult<Schema> {
    let agent = ureq::AgentBuilder::new().timeout(timeout).build();

    let mut request = agent
        .post(url)
        .set("Content-Type", "application/json")
        .set("User-Agent", crate::transport::USER_AGENT);
    for (name, value) in headers {
        request = request.set(name, value);
    }

    let body = serde_json::json!({ "query": INTROSPECTION_QUERY });
    let response = match request.send_json(body) {
        Ok(response) => response,
        // Servers commonly report GraphQL errors with a 4xx status.
        Err(ureq::Error::Status(_, response)) => response,
        Err(ureq::Error::Transport(transport)) => {
            return Err(SchemaError::Introspection {
                message: transport.to_string(),
            });
        }
    };

    let json: serde_json::Value = response.into_json().map_err(|e| SchemaError::Introspection {
        message: format!("invalid JSON: {e}"),
    })?;

    tracing::debug!(url, "introspection response received");
    Schema::from_introspection(&json)
}
