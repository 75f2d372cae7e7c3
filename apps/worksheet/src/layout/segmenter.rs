//! Content Segmenter — turns raw user text into the stream of placeable units.
//!
//! Chinese text becomes one unit per character; English and pinyin become one unit
//! per lowercase word. Noise is dropped silently: every input string, including
//! the empty string, yields a (possibly empty) unit list.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::Script;

/// One indivisible glyph or word destined for a single cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentUnit {
    pub text: String,
}

impl ContentUnit {
    pub fn new(text: impl Into<String>) -> Self {
        ContentUnit { text: text.into() }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Character classes
// ────────────────────────────────────────────────────────────────────────────

/// CJK Unified Ideographs, basic block as used for practice characters.
pub fn is_ideograph(c: char) -> bool {
    ('\u{4E00}'..='\u{9FA5}').contains(&c)
}

fn is_kept_chinese(c: char) -> bool {
    is_ideograph(c)
        || ('\u{3400}'..='\u{4DBF}').contains(&c) // Extension A
        || ('\u{3000}'..='\u{303F}').contains(&c) // CJK punctuation
        || ('\u{FF01}'..='\u{FF5E}').contains(&c) // full-width forms
        || c.is_ascii_alphanumeric()
}

fn is_kept_pinyin(c: char) -> bool {
    c.is_ascii_lowercase()
        || ('\u{00C0}'..='\u{017F}').contains(&c)
        // ǎ ǐ ǒ ǔ ǖ ǘ ǚ ǜ live in Latin Extended-B
        || ('\u{01CD}'..='\u{01DC}').contains(&c)
        || ('\u{1E00}'..='\u{1EFF}').contains(&c)
}

// ────────────────────────────────────────────────────────────────────────────
// Core functions
// ────────────────────────────────────────────────────────────────────────────

/// Extracts the normalized unit stream for `script` from `raw`.
pub fn segment(raw: &str, script: Script) -> Vec<ContentUnit> {
    match script {
        Script::Chinese => raw
            .chars()
            .filter(|c| !c.is_whitespace() && is_kept_chinese(*c))
            .map(ContentUnit::new)
            .collect(),
        Script::English => segment_words(raw, |c| c.is_ascii_lowercase()),
        Script::Pinyin => segment_words(raw, is_kept_pinyin),
    }
}

/// Lowercases, keeps `keep` characters and whitespace, then splits on whitespace runs.
fn segment_words(raw: &str, keep: impl Fn(char) -> bool) -> Vec<ContentUnit> {
    let cleaned: String = raw
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_whitespace() || keep(*c))
        .collect();

    cleaned.split_whitespace().map(ContentUnit::new).collect()
}

/// Distinct ideographs in first-occurrence order; non-ideograph units are skipped.
pub fn unique_ordered(units: &[ContentUnit]) -> Vec<ContentUnit> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut unique = Vec::new();
    for unit in units {
        if is_single_ideograph(&unit.text) && seen.insert(unit.text.as_str()) {
            unique.push(unit.clone());
        }
    }
    unique
}

fn is_single_ideograph(text: &str) -> bool {
    let mut chars = text.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if is_ideograph(c))
}

/// Joins units back into text that segments to the same units.
pub fn units_to_string(units: &[ContentUnit], script: Script) -> String {
    let texts = units.iter().map(|u| u.text.as_str());
    match script {
        Script::Chinese => texts.collect(),
        Script::English | Script::Pinyin => texts.collect::<Vec<_>>().join(" "),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
