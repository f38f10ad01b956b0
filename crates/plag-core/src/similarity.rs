//! Token n-grams and set similarity
//!
//! Text is normalized to lower-case alphanumeric tokens, and documents are
//! compared by the Jaccard index of their n-gram sets. Sets are ordered so
//! that every derived count and listing is deterministic.

use std::collections::btree_set::{self, BTreeSet};

/// Lower-case, map every non-alphanumeric char to a space, collapse runs
pub fn normalize(text: &str) -> String {
    let mut mapped = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_alphanumeric() {
            mapped.extend(c.to_lowercase());
        } else {
            mapped.push(' ');
        }
    }
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized tokens of `text`
pub fn tokens(text: &str) -> Vec<String> {
    normalize(text)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// An ordered set of space-joined n-grams
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NgramSet {
    grams: BTreeSet<String>,
}

impl NgramSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sliding windows of `n` tokens over the normalized text
    pub fn from_text(text: &str, n: usize) -> Self {
        Self::from_tokens(&tokens(text), n)
    }

    /// Sliding windows of `n` tokens; fewer than `n` tokens yield an empty set
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S], n: usize) -> Self {
        if n == 0 || tokens.len() < n {
            return Self::new();
        }
        let grams = tokens
            .windows(n)
            .map(|window| join_tokens(window))
            .collect();
        Self { grams }
    }

    pub fn len(&self) -> usize {
        self.grams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grams.is_empty()
    }

    pub fn contains(&self, gram: &str) -> bool {
        self.grams.contains(gram)
    }

    pub fn iter(&self) -> btree_set::Iter<'_, String> {
        self.grams.iter()
    }

    pub fn intersection(&self, other: &NgramSet) -> NgramSet {
        Self {
            grams: self.grams.intersection(&other.grams).cloned().collect(),
        }
    }

    pub fn union(&self, other: &NgramSet) -> NgramSet {
        Self {
            grams: self.grams.union(&other.grams).cloned().collect(),
        }
    }

    pub fn difference(&self, other: &NgramSet) -> NgramSet {
        Self {
            grams: self.grams.difference(&other.grams).cloned().collect(),
        }
    }

    /// In-place union
    pub fn extend(&mut self, other: NgramSet) {
        self.grams.extend(other.grams);
    }

    pub fn intersects(&self, other: &NgramSet) -> bool {
        // Walk the smaller set
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.grams.iter().any(|g| large.grams.contains(g))
    }

    pub fn intersection_len(&self, other: &NgramSet) -> usize {
        self.grams.intersection(&other.grams).count()
    }
}

impl FromIterator<String> for NgramSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            grams: iter.into_iter().collect(),
        }
    }
}

fn join_tokens<S: AsRef<str>>(window: &[S]) -> String {
    window
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Jaccard index `|A ∩ B| / |A ∪ B|`, `0.0` when both sets are empty
pub fn jaccard(a: &NgramSet, b: &NgramSet) -> f64 {
    let shared = a.intersection_len(b);
    let union = a.len() + b.len() - shared;
    if union == 0 {
        0.0
    } else {
        shared as f64 / union as f64
    }
}

/// Split on whitespace that follows `.`, `!` or `?`; empty fragments dropped
pub fn split_sentences(text: &str) -> Vec<&str> {
    let text = text.trim();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut prev = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c.is_whitespace() && matches!(prev, Some('.' | '!' | '?')) {
            if start < i {
                sentences.push(&text[start..i]);
            }
            let mut next_start = i + c.len_utf8();
            while let Some(&(j, d)) = chars.peek() {
                if !d.is_whitespace() {
                    break;
                }
                next_start = j + d.len_utf8();
                chars.next();
            }
            start = next_start;
            prev = None;
            continue;
        }
        prev = Some(c);
    }

    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

/// Round half away from zero to `places` decimals
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
