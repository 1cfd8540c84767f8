//! Fuzzy associative memory: recall realistic scalar values by label overlap.
//!
//! Every scalar seen in a response is stored together with an [`Assoc`], a
//! weighted set of labels describing where it came from (`"id"`,
//! `"Customer id"`, `"Customer"`, ...). Argument synthesis later asks for
//! values relevant to its own labels and receives scored candidates.
//!
//! Entries are indexed under every token of every label, so a query only
//! scores entries sharing at least one token with it. Scores are the inner
//! product of both label sets after [`Tokenizer::fuzzify`] expansion.
//!
//! The memory only grows: identical `(value, assoc)` pairs are stored once,
//! nothing is ever evicted.

pub mod tokenize;

use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::error::{MemoryError, MemoryResult};

pub use tokenize::{ExactTokenizer, Tokenizer, WordTokenizer};

/// Ordered label → weight mapping explaining why a value is relevant.
pub type Assoc = IndexMap<String, f64>;

/// Build an [`Assoc`] from borrowed pairs.
pub fn assoc(pairs: &[(&str, f64)]) -> Assoc {
    pairs.iter().map(|(k, w)| (k.to_string(), *w)).collect()
}

/// A remembered scalar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MemoryValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl MemoryValue {
    /// Convert a JSON scalar; `None` for null, booleans and containers.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(MemoryValue::Text(s.clone())),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(MemoryValue::Int(i)),
                None => n.as_f64().map(MemoryValue::Float),
            },
            _ => None,
        }
    }

    /// Integral interpretation, if the value is (or spells) an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MemoryValue::Int(i) => Some(*i),
            MemoryValue::Float(x) if x.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(x) => {
                Some(*x as i64)
            }
            MemoryValue::Float(_) => None,
            MemoryValue::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Numeric interpretation, if the value is (or spells) a finite number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MemoryValue::Int(i) => Some(*i as f64),
            MemoryValue::Float(x) => Some(*x),
            MemoryValue::Text(s) => s.trim().parse::<f64>().ok().filter(|x| x.is_finite()),
        }
    }
}

impl std::fmt::Display for MemoryValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryValue::Int(i) => write!(f, "{i}"),
            MemoryValue::Float(x) => write!(f, "{x}"),
            MemoryValue::Text(s) => f.write_str(s),
        }
    }
}

impl PartialEq for MemoryValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MemoryValue::Int(a), MemoryValue::Int(b)) => a == b,
            (MemoryValue::Float(a), MemoryValue::Float(b)) => a.to_bits() == b.to_bits(),
            (MemoryValue::Text(a), MemoryValue::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for MemoryValue {}

impl Hash for MemoryValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            MemoryValue::Int(i) => i.hash(state),
            MemoryValue::Float(x) => x.to_bits().hash(state),
            MemoryValue::Text(s) => s.hash(state),
        }
    }
}

impl From<&str> for MemoryValue {
    fn from(s: &str) -> Self {
        MemoryValue::Text(s.to_string())
    }
}

impl From<i64> for MemoryValue {
    fn from(i: i64) -> Self {
        MemoryValue::Int(i)
    }
}

impl From<f64> for MemoryValue {
    fn from(x: f64) -> Self {
        MemoryValue::Float(x)
    }
}

/// A stored value with its labels.
#[derive(Debug, Clone)]
pub struct MemoryEntry {
    pub value: MemoryValue,
    pub assoc: Assoc,
}

/// A recalled candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Recall {
    pub value: MemoryValue,
    pub score: f64,
}

/// One value with the summed weights of all labels it was stored under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedEntry {
    pub value: MemoryValue,
    pub assoc: Vec<(String, f64)>,
}

/// Structural identity of a stored entry: value plus label weights sorted by label.
#[derive(Debug, PartialEq, Eq, Hash)]
struct Signature {
    value: MemoryValue,
    labels: Vec<(String, u64)>,
}

impl Signature {
    fn new(value: &MemoryValue, assoc: &Assoc) -> Self {
        let mut labels: Vec<(String, u64)> = assoc
            .iter()
            .map(|(label, weight)| (label.clone(), weight.to_bits()))
            .collect();
        labels.sort();
        Self {
            value: value.clone(),
            labels,
        }
    }
}

/// Associative fuzzy memory.
pub struct FuzzyMemory<T: Tokenizer = WordTokenizer> {
    tokenizer: T,
    /// Entries in insertion order.
    entries: Vec<MemoryEntry>,
    /// Token → indices into `entries`.
    index: HashMap<String, Vec<usize>>,
    /// Signatures of every stored entry.
    guards: HashSet<Signature>,
}

impl Default for FuzzyMemory<WordTokenizer> {
    fn default() -> Self {
        Self::new(WordTokenizer)
    }
}

impl<T: Tokenizer> FuzzyMemory<T> {
    /// Create an empty memory with the given tokenizer.
    pub fn new(tokenizer: T) -> Self {
        Self {
            tokenizer,
            entries: Vec::new(),
            index: HashMap::new(),
            guards: HashSet::new(),
        }
    }

    /// The tokenizer used for indexing and fuzzification.
    pub fn tokenizer(&self) -> &T {
        &self.tokenizer
    }

    /// Number of distinct stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Store a value under the given labels.
    ///
    /// Storing the same value with the same label weights again is a no-op.
    /// Returns whether a new entry was added.
    pub fn store(&mut self, value: MemoryValue, assoc: Assoc) -> MemoryResult<bool> {
        let signature = Signature::new(&value, &assoc);
        if self.guards.contains(&signature) {
            return Ok(false);
        }

        let tokens = self.tokenize_assoc(&assoc)?;
        let slot = self.entries.len();
        for token in tokens {
            self.index.entry(token).or_default().push(slot);
        }

        self.guards.insert(signature);
        self.entries.push(MemoryEntry { value, assoc });
        Ok(true)
    }

    /// Recall every entry sharing a token with `assoc`, scored by relevance.
    ///
    /// Results are ordered by first encounter (query token order, then
    /// insertion order) and only include positive scores.
    pub fn query(&self, assoc: &Assoc) -> MemoryResult<Vec<Recall>> {
        let tokens = self.tokenize_assoc(assoc)?;
        let query = self.fuzzify_assoc(assoc);

        let mut visited = HashSet::new();
        let mut results = Vec::new();

        for token in &tokens {
            let Some(slots) = self.index.get(token) else {
                continue;
            };
            for &slot in slots {
                if !visited.insert(slot) {
                    continue;
                }
                let entry = &self.entries[slot];
                let score = inner_product(&query, &self.fuzzify_assoc(&entry.assoc));
                if score > 0.0 {
                    results.push(Recall {
                        value: entry.value.clone(),
                        score,
                    });
                }
            }
        }

        Ok(results)
    }

    /// Relevance of two label sets: inner product after fuzzification.
    pub fn assoc_score(&self, a: &Assoc, b: &Assoc) -> f64 {
        inner_product(&self.fuzzify_assoc(a), &self.fuzzify_assoc(b))
    }

    /// One record per distinct value, label weights summed across its entries.
    pub fn serialize(&self) -> Vec<SerializedEntry> {
        let mut merged: IndexMap<&MemoryValue, IndexMap<&str, f64>> = IndexMap::new();

        for entry in &self.entries {
            let labels = merged.entry(&entry.value).or_default();
            for (label, weight) in &entry.assoc {
                *labels.entry(label.as_str()).or_insert(0.0) += weight;
            }
        }

        merged
            .into_iter()
            .map(|(value, labels)| SerializedEntry {
                value: value.clone(),
                assoc: labels
                    .into_iter()
                    .map(|(label, weight)| (label.to_string(), weight))
                    .collect(),
            })
            .collect()
    }

    fn tokenize_assoc(&self, assoc: &Assoc) -> MemoryResult<IndexSet<String>> {
        let mut tokens = IndexSet::new();
        for key in assoc.keys() {
            for token in self.tokenizer.tokenize(key) {
                if token.is_empty() {
                    return Err(MemoryError::EmptyToken { key: key.clone() });
                }
                tokens.insert(token);
            }
        }
        Ok(tokens)
    }

    fn fuzzify_assoc(&self, assoc: &Assoc) -> Assoc {
        let mut fuzzy = Assoc::new();
        for (key, weight) in assoc {
            self.tokenizer.fuzzify(key, *weight, &mut fuzzy);
        }
        fuzzy
    }
}

/// Weighted inner product; iterates the smaller map.
fn inner_product(a: &Assoc, b: &Assoc) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .map(|(key, weight)| weight * large.get(key).copied().unwrap_or(0.0))
        .sum()
}

impl<T: Tokenizer> std::fmt::Debug for FuzzyMemory<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FuzzyMemory")
            .field("entries", &self.entries.len())
            .field("tokens", &self.index.len())
            .finish()
    }
}
