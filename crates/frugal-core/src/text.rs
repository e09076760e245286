// SPDX-FileCopyrightText: 2026 Frugal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared tokenizer.
//!
//! Word and sentence counts used by the classifier, the cache key
//! normalization, the hashing embedder, and the baseline token count all
//! come from this module so every length-based measurement agrees.

use std::sync::OnceLock;

use tiktoken_rs::CoreBPE;

/// Characters that terminate a sentence.
const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Iterate over whitespace-separated words (Unicode whitespace).
pub fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
}

/// Number of whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    words(text).count()
}

/// Number of non-empty segments between runs of `.`, `!` or `?`.
///
/// Text without any terminator counts as one sentence; blank text counts as zero.
pub fn sentence_count(text: &str) -> usize {
    text.split(SENTENCE_TERMINATORS)
        .filter(|segment| !segment.trim().is_empty())
        .count()
}

/// Lowercase and collapse all whitespace runs to a single space.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in words(text) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.extend(word.chars().flat_map(char::to_lowercase));
    }
    out
}

fn bpe() -> Option<&'static CoreBPE> {
    static BPE: OnceLock<Option<CoreBPE>> = OnceLock::new();
    BPE.get_or_init(|| match tiktoken_rs::cl100k_base() {
        Ok(bpe) => Some(bpe),
        Err(e) => {
            tracing::warn!(error = %e, "cl100k_base unavailable, estimating tokens from length");
            None
        }
    })
    .as_ref()
}

/// Count BPE tokens with the `cl100k_base` encoding.
///
/// Falls back to one token per four characters if the encoding cannot be
/// loaded. The same method is used for every decision.
pub fn count_tokens(text: &str) -> u32 {
    if text.is_empty() {
        return 0;
    }
    let count = match bpe() {
        Some(bpe) => bpe.encode_ordinary(text).len(),
        None => text.chars().count().div_ceil(4),
    };
    u32::try_from(count).unwrap_or(u32::MAX)
}
