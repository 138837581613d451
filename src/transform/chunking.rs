//! Sentence-bounded chunking for long-form bodies.
//!
//! Bodies longer than the word threshold are split so that each chunk carries at most
//! `threshold` words of its own. A sentence boundary is `.`, `?` or `!` followed by whitespace
//! and an upper-case letter. Adjacent chunks share context: a chunk gets the sentence right
//! before its first sentence and the one right after its last sentence, so relevance ranking
//! still sees local context around a cut. A single sentence longer than the threshold is cut at
//! word boundaries.
//!
//! Chunk boundaries only depend on the sentence sequence, so joining the chunk bodies with a
//! space and chunking again reproduces the same boundaries.

use regex::Regex;
use std::sync::LazyLock;

use super::sanitize::normalize_whitespace;

/// Word threshold applied when configuration does not override it.
pub const DEFAULT_CHUNK_WORD_THRESHOLD: usize = 1000;

static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.?!](\s+)\p{Lu}").expect("valid sentence boundary pattern"));

/// One chunk of body text plus the neighbouring sentences used as overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Sentences owned by this chunk.
    pub body: String,
    /// Sentence immediately preceding the body, absent for the first chunk.
    pub leading_context: Option<String>,
    /// Sentence immediately following the body, absent for the last chunk.
    pub trailing_context: Option<String>,
}

impl TextChunk {
    /// Body with its overlap context, as stored in the provider document.
    pub fn text(&self) -> String {
        [
            self.leading_context.as_deref(),
            Some(self.body.as_str()),
            self.trailing_context.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// Number of words owned by the chunk, excluding overlap.
    pub fn word_count(&self) -> usize {
        count_words(&self.body)
    }
}

/// Split text into sentences on `.`/`?`/`!` followed by whitespace and an upper-case letter.
pub fn split_sentences(text: &str) -> Vec<String> {
    let normalized = normalize_whitespace(text);
    let mut sentences = Vec::new();
    let mut start = 0;

    for caps in SENTENCE_BOUNDARY.captures_iter(&normalized) {
        let Some(gap) = caps.get(1) else {
            continue;
        };
        let sentence = normalized[start..gap.start()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        start = gap.end();
    }

    let tail = normalized[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// Chunk text so each chunk body holds at most `threshold` words.
///
/// Returns an empty vector for blank input and a single context-free chunk when the whole text
/// fits. A zero threshold is treated as one word.
pub fn chunk_text(text: &str, threshold: usize) -> Vec<TextChunk> {
    let threshold = threshold.max(1);
    let units = split_units(text, threshold);
    if units.is_empty() {
        return Vec::new();
    }

    let groups = pack_units(&units, threshold);
    if groups.len() == 1 {
        return vec![TextChunk {
            body: units.join(" "),
            leading_context: None,
            trailing_context: None,
        }];
    }

    groups
        .iter()
        .map(|&(start, end)| TextChunk {
            body: units[start..end].join(" "),
            leading_context: start.checked_sub(1).map(|index| units[index].clone()),
            trailing_context: units.get(end).cloned(),
        })
        .collect()
}

/// Count whitespace-separated words.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Sentences, with any sentence above the threshold cut into threshold-sized word runs.
fn split_units(text: &str, threshold: usize) -> Vec<String> {
    let mut units = Vec::new();
    for sentence in split_sentences(text) {
        if count_words(&sentence) <= threshold {
            units.push(sentence);
            continue;
        }
        let words: Vec<&str> = sentence.split_whitespace().collect();
        units.extend(words.chunks(threshold).map(|piece| piece.join(" ")));
    }
    units
}

/// Greedily pack units into `[start, end)` ranges whose word totals stay within the threshold.
fn pack_units(units: &[String], threshold: usize) -> Vec<(usize, usize)> {
    let mut groups = Vec::new();
    let mut start = 0;
    let mut words = 0;

    for (index, unit) in units.iter().enumerate() {
        let unit_words = count_words(unit);
        if index > start && words + unit_words > threshold {
            groups.push((start, index));
            start = index;
            words = 0;
        }
        words += unit_words;
    }
    groups.push((start, units.len()));
    groups
}
