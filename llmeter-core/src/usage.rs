//! Token accounting.
//!
//! Providers that report usage are recorded verbatim. For the ones that do
//! not, [`estimate_tokens`] applies a fixed words-to-tokens ratio.

use serde::{Deserialize, Serialize};

const TOKENS_PER_WORD: f64 = 1.5;

/// Token consumption of a single call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Usage with the total derived from the two halves.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }

    /// Usage exactly as a provider reported it, total included.
    pub fn reported(prompt_tokens: u32, completion_tokens: u32, total_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens,
        }
    }

    /// Word-count estimate for providers that return no usage block.
    pub fn estimated(prompt: &str, completion: &str) -> Self {
        Self::new(estimate_tokens(prompt), estimate_tokens(completion))
    }
}

/// `round(words * 1.5)`, ties rounded to even.
pub fn estimate_tokens(text: &str) -> u32 {
    let words = text.split_whitespace().count() as f64;
    (words * TOKENS_PER_WORD).round_ties_even() as u32
}
