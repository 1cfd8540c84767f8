//! Exploration priority: how guessable an endpoint is and how much it has
//! already been explored.
//!
//! Lower rank means more interesting. Endpoints whose arguments can be filled
//! from memory, that have few results so far, and that sit close to the root
//! are preferred.

use crate::error::MemoryResult;
use crate::graph::{EndpointGraph, EndpointId};
use crate::memory::{FuzzyMemory, Tokenizer};
use crate::schema::{FieldDef, InputValueDef, Schema, TypeKind};
use crate::synth::input_assoc;

/// Rank contribution of a field whose inputs cannot be guessed at all.
pub const UNGUESSABLE_PENALTY: f64 = 12.0;

const RESULT_WEIGHT: f64 = 4.0;
const SPECIFIC_ERROR_WEIGHT: f64 = 4.0;
const SUCCESS_WEIGHT: f64 = 2.0;
const NON_NULL_WEIGHT: f64 = 8.0;
const DEPTH_WEIGHT: f64 = 7.0;

/// Exploration rank of `e`; always positive.
pub fn rank(graph: &EndpointGraph, e: EndpointId, guessability: f64) -> f64 {
    let penalty = if guessability > 0.0 {
        1.0 / guessability
    } else {
        UNGUESSABLE_PENALTY
    };

    penalty
        + RESULT_WEIGHT * graph.get(e).results().len() as f64
        + SPECIFIC_ERROR_WEIGHT * graph.specific_errors(e).len() as f64
        + SUCCESS_WEIGHT * graph.successful_results(e).len() as f64
        + NON_NULL_WEIGHT * graph.non_null_results(e).len() as f64
        + DEPTH_WEIGHT * graph.path(e).len() as f64
}

/// How reliably the arguments of `field` can be filled.
///
/// 1 for argument-free fields, otherwise the score of the hardest argument.
pub fn field_guessability<T: Tokenizer>(
    schema: &Schema,
    memory: &FuzzyMemory<T>,
    field: &FieldDef,
) -> MemoryResult<f64> {
    if field.args.is_empty() {
        return Ok(1.0);
    }

    let mut lowest = f64::INFINITY;
    for arg in &field.args {
        let score = input_guessability(schema, memory, arg, &[], &[], field)?;
        lowest = lowest.min(score);
    }
    Ok(if lowest.is_finite() { lowest } else { 0.0 })
}

/// Summed evidence that `input` can be filled.
///
/// Defaults and nullability count a little, booleans and enums count fully,
/// scalars count by memory relevance, and input objects by their fields.
/// An input object already on the ancestor chain contributes nothing.
fn input_guessability<T: Tokenizer>(
    schema: &Schema,
    memory: &FuzzyMemory<T>,
    input: &InputValueDef,
    ancestors: &[&str],
    enclosing_types: &[&str],
    field: &FieldDef,
) -> MemoryResult<f64> {
    let mut score = 0.0;

    if input.has_default() {
        score += 0.5;
    }
    if !input.ty.is_non_null() {
        score += 0.25;
    }

    let type_name = input.ty.named_type();
    let Some(named) = schema.get(type_name) else {
        return Ok(score);
    };

    match named.kind {
        _ if type_name == "Boolean" => score += 1.0,
        TypeKind::Enum => score += 1.0,
        TypeKind::Scalar => {
            let assoc = input_assoc(type_name, input, ancestors, field);
            score += memory.query(&assoc)?.iter().map(|r| r.score).sum::<f64>();
        }
        TypeKind::InputObject => {
            if enclosing_types.contains(&type_name) {
                return Ok(score);
            }
            let mut nested = ancestors.to_vec();
            nested.push(&input.name);
            let mut types = enclosing_types.to_vec();
            types.push(type_name);
            for input_field in &named.input_fields {
                score += input_guessability(schema, memory, input_field, &nested, &types, field)?;
            }
        }
        TypeKind::Object | TypeKind::Interface | TypeKind::Union => {}
    }

    Ok(score)
}
