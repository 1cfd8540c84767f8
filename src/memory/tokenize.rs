//! Label tokenization and fuzzification for the associative memory.
//!
//! Labels are field names, type names and short phrases like
//! `"customer id"`. Tokenizing them into normalized words lets
//! `customerId`, `customer_ids` and `Customer ID` meet in the same buckets.

use std::sync::LazyLock;

use regex::Regex;

use super::Assoc;

static RE_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s_\-./]+").unwrap());

/// Words whose singular and plural forms coincide.
const UNCOUNTABLE: &[&str] = &[
    "data",
    "equipment",
    "information",
    "media",
    "metadata",
    "news",
    "series",
    "species",
];

const IRREGULAR: &[(&str, &str)] = &[
    ("children", "child"),
    ("criteria", "criterion"),
    ("feet", "foot"),
    ("geese", "goose"),
    ("indices", "index"),
    ("men", "man"),
    ("mice", "mouse"),
    ("people", "person"),
    ("teeth", "tooth"),
    ("women", "woman"),
];

/// Singulars ending in `ie`, whose plurals would otherwise become `-y`.
const IE_SINGULAR: &[&str] = &[
    "calorie", "cookie", "die", "genie", "goalie", "hippie", "lie", "movie", "pie", "rookie", "selfie",
    "tie", "zombie",
];

/// Singulars ending in `use`, whose plurals must keep the `e`.
const USE_SINGULAR: &[&str] = &[
    "abuse", "blouse", "cause", "clause", "excuse", "fuse", "house", "muse", "pause", "ruse", "spouse",
    "use",
];

/// Singulars ending in a silent `e` after `ch`.
const CHE_SINGULAR: &[&str] = &[
    "ache", "avalanche", "cache", "cliche", "creche", "headache", "microfiche", "moustache", "mustache",
    "niche", "psyche", "quiche",
];

/// Strategy for turning labels into index tokens and fuzzy label sets.
///
/// Implementations must never return empty tokens; the memory rejects them.
pub trait Tokenizer {
    /// Split a label into normalized tokens.
    fn tokenize(&self, key: &str) -> Vec<String>;

    /// Add `key` to `target` at full weight, plus its normalized suffixes.
    ///
    /// For a key of `N` tokens, the suffix starting at token `n` (for
    /// `n < N - 1`) is added at `weight / (n + 1.1)` unless already present.
    fn fuzzify(&self, key: &str, weight: f64, target: &mut Assoc) {
        let tokens = self.tokenize(key);

        target.insert(key.to_string(), weight);

        for n in 0..tokens.len().saturating_sub(1) {
            let suffix = tokens[n..].join(" ");
            target.entry(suffix).or_insert(weight / (n as f64 + 1.1));
        }
    }
}

/// Camel-case and separator aware tokenizer with singularization.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    fn tokenize(&self, key: &str) -> Vec<String> {
        RE_SEPARATOR
            .split(key)
            .flat_map(split_camel_case)
            .map(|piece| singularize(&piece.to_lowercase()))
            .filter(|token| !token.is_empty())
            .collect()
    }
}

/// Uses every label verbatim as its single token.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactTokenizer;

impl Tokenizer for ExactTokenizer {
    fn tokenize(&self, key: &str) -> Vec<String> {
        vec![key.to_string()]
    }
}

/// Split before every uppercase character: `customerID` → `customer`, `I`, `D`.
fn split_camel_case(word: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (i, c) in word.char_indices() {
        if c.is_uppercase() && i > start {
            pieces.push(&word[start..i]);
            start = i;
        }
    }
    pieces.push(&word[start..]);
    pieces
}

/// Reduce an English plural to its singular form (lowercase input).
pub fn singularize(word: &str) -> String {
    if UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    if let Some((_, singular)) = IRREGULAR.iter().find(|(plural, _)| *plural == word) {
        return singular.to_string();
    }
    let stem = word.strip_suffix('s').unwrap_or(word);
    if word.ends_with("ies") {
        if IE_SINGULAR.contains(&stem) {
            return stem.to_string();
        }
        if word.len() > 4 {
            return format!("{}y", &word[..word.len() - 3]);
        }
    }
    if word.ends_with("uses") {
        if USE_SINGULAR.contains(&stem) || stem.ends_with("house") {
            return stem.to_string();
        }
        return word[..word.len() - 2].to_string();
    }
    if (word.ends_with("ches") || word.ends_with("shes")) && CHE_SINGULAR.contains(&stem) {
        return stem.to_string();
    }
    if ["sses", "xes", "zzes", "ches", "shes"]
        .iter()
        .any(|suffix| word.ends_with(suffix))
    {
        return word[..word.len() - 2].to_string();
    }
    if word.len() > 1
        && word.ends_with('s')
        && !["ss", "us", "is"].iter().any(|suffix| word.ends_with(suffix))
    {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}
