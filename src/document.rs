//! Request documents: a minimal GraphQL query AST and its printer.
//!
//! The explorer only ever builds anonymous single-operation queries, so the
//! model is limited to fields, inline fragments, arguments and literal values.
//! [`rewrite_selections`] grafts a new selection set into an earlier request,
//! which is how nested endpoints are reached.

use std::fmt::{self, Write};

use serde::{Deserialize, Serialize};

/// A literal input value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Enum(String),
    List(Vec<Value>),
    Object(Vec<(String, Value)>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            // JSON string escapes are valid GraphQL string escapes.
            Value::String(s) => {
                let quoted = serde_json::to_string(s).map_err(|_| fmt::Error)?;
                f.write_str(&quoted)
            }
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Enum(e) => f.write_str(e),
            Value::List(items) => {
                f.write_char('[')?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_char(']')
            }
            Value::Object(fields) => {
                f.write_char('{')?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_char('}')
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub arguments: Vec<Argument>,
    pub selections: Vec<Selection>,
}

impl Field {
    /// A field without arguments or sub-selections.
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
            selections: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineFragment {
    pub type_condition: String,
    pub selections: Vec<Selection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Selection {
    Field(Field),
    InlineFragment(InlineFragment),
}

impl Selection {
    pub fn field(name: impl Into<String>) -> Self {
        Selection::Field(Field::leaf(name))
    }

    pub fn fragment(type_condition: impl Into<String>, selections: Vec<Selection>) -> Self {
        Selection::InlineFragment(InlineFragment {
            type_condition: type_condition.into(),
            selections,
        })
    }
}

/// An anonymous query operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub selections: Vec<Selection>,
}

impl Document {
    pub fn new(selections: Vec<Selection>) -> Self {
        Self { selections }
    }
}

fn write_block(out: &mut String, selections: &[Selection], depth: usize) {
    if selections.is_empty() {
        return;
    }
    out.push_str(" {\n");
    for selection in selections {
        write_selection(out, selection, depth + 1);
    }
    push_indent(out, depth);
    out.push('}');
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn write_selection(out: &mut String, selection: &Selection, depth: usize) {
    push_indent(out, depth);
    match selection {
        Selection::Field(field) => {
            out.push_str(&field.name);
            if !field.arguments.is_empty() {
                out.push('(');
                for (i, arg) in field.arguments.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    // Writing to a String cannot fail.
                    let _ = write!(out, "{}: {}", arg.name, arg.value);
                }
                out.push(')');
            }
            write_block(out, &field.selections, depth);
        }
        Selection::InlineFragment(fragment) => {
            out.push_str("... on ");
            out.push_str(&fragment.type_condition);
            write_block(out, &fragment.selections, depth);
        }
    }
    out.push('\n');
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::from("{\n");
        for selection in &self.selections {
            write_selection(&mut out, selection, 1);
        }
        out.push('}');
        f.write_str(&out)
    }
}

/// Replace the selection set of every field found at `path`.
///
/// Fields are matched by name, one path segment per nesting level; inline
/// fragments are transparent and do not consume a segment. Only fields at
/// exactly the last segment are rewritten; siblings and non-matching branches
/// are left untouched.
pub fn rewrite_selections(document: &Document, path: &[String], selections: &[Selection]) -> Document {
    let mut rewritten = document.clone();
    if !path.is_empty() {
        rewrite_level(&mut rewritten.selections, path, 0, selections);
    }
    rewritten
}

fn rewrite_level(level: &mut [Selection], path: &[String], depth: usize, replacement: &[Selection]) {
    for selection in level.iter_mut() {
        match selection {
            Selection::Field(field) if field.name == path[depth] => {
                if depth + 1 == path.len() {
                    field.selections = replacement.to_vec();
                } else {
                    rewrite_level(&mut field.selections, path, depth + 1, replacement);
                }
            }
            Selection::Field(_) => {}
            Selection::InlineFragment(fragment) => {
                rewrite_level(&mut fragment.selections, path, depth, replacement);
            }
        }
    }
}
