//! Location-name normalization and fuzzy corpus matching.
//!
//! OCR output is noisy ("Deepway" may come back as "Oeepway", with stray
//! punctuation), so raw text is first canonicalized into the corpus token
//! form and then fuzzy-matched against every known location id.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::PipelineError;
use crate::graph::corpus::Corpus;

/// Canonicalizes raw text into the corpus token form: apostrophes stripped,
/// non-word runs collapsed to single spaces, words split on spaces and on
/// lower-to-upper transitions, uppercased and joined with underscores.
pub fn canonicalize(raw: &str) -> String {
    static NON_WORD: OnceLock<Regex> = OnceLock::new();
    let non_word = NON_WORD.get_or_init(|| Regex::new(r"\W+").expect("static regex"));

    let stripped = raw.replace('\'', "");
    let spaced = non_word.replace_all(&stripped, " ");

    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_was_lower = false;
    for c in spaced.trim().chars() {
        if c == ' ' || (c.is_uppercase() && prev_was_lower) {
            if !current.is_empty() {
                words.push(current.clone());
                current.clear();
            }
        }
        prev_was_lower = c.is_lowercase();
        if c != ' ' {
            current.extend(c.to_uppercase());
        }
    }
    if !current.is_empty() {
        words.push(current);
    }

    words.join("_")
}

/// Fuzzy-matches raw OCR text against the location corpus.
///
/// Returns the best-scoring location id, or `UnrecognizedLocation` when no
/// candidate reaches the threshold.
pub fn match_location(
    corpus: &Corpus,
    raw: &str,
    threshold: f64,
) -> Result<String, PipelineError> {
    let token = canonicalize(raw);

    let best = corpus
        .ids()
        .map(|id| (id, bigram_similarity(&token, id)))
        .max_by(|a, b| a.1.total_cmp(&b.1));

    match best {
        Some((id, score)) if score >= threshold => Ok(id.to_string()),
        _ => Err(PipelineError::UnrecognizedLocation(raw.trim().to_string())),
    }
}

/// Sorensen-Dice similarity over character bigrams, in [0.0, 1.0].
fn bigram_similarity(a: &str, b: &str) -> f64 {
    let a_grams = bigrams(a);
    let b_grams = bigrams(b);
    if a_grams.is_empty() || b_grams.is_empty() {
        return if a == b { 1.0 } else { 0.0 };
    }

    let mut remaining = b_grams.clone();
    let mut shared = 0usize;
    for gram in &a_grams {
        if let Some(pos) = remaining.iter().position(|g| g == gram) {
            remaining.swap_remove(pos);
            shared += 1;
        }
    }

    2.0 * shared as f64 / (a_grams.len() + b_grams.len()) as f64
}

fn bigrams(s: &str) -> Vec<(char, char)> {
    let chars: Vec<char> = s.chars().collect();
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}
