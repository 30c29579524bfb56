//! Bitap approximate string matching.
//!
//! Scores use the Fuse.js model, so Fuse thresholds apply unchanged: a
//! candidate location scores
//! `errors / pattern_len + |expected - location| / distance`, `0.0` is a
//! perfect match and anything above the threshold is rejected.

use std::collections::HashMap;

pub const DEFAULT_THRESHOLD: f64 = 0.3;
pub const DEFAULT_DISTANCE: usize = 100;

/// Widest pattern a single bitap pass handles; longer queries are chunked.
const MAX_BITS: usize = 32;
const MIN_SCORE: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOptions {
    /// Highest accepted score, in `[0, 1]`.
    pub threshold: f64,
    /// Character offset where a match is expected.
    pub location: usize,
    /// How far from `location` a match may drift before it costs a full error.
    pub distance: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            location: 0,
            distance: DEFAULT_DISTANCE,
        }
    }
}

impl MatchOptions {
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
struct Chunk {
    chars: Vec<char>,
    alphabet: HashMap<char, u32>,
    start: usize,
}

impl Chunk {
    fn new(chars: &[char], start: usize) -> Self {
        let len = chars.len();
        let mut alphabet: HashMap<char, u32> = HashMap::new();
        for (i, c) in chars.iter().enumerate() {
            *alphabet.entry(*c).or_insert(0) |= 1 << (len - i - 1);
        }
        Self {
            chars: chars.to_vec(),
            alphabet,
            start,
        }
    }
}

/// A query compiled for repeated matching against many texts.
#[derive(Debug, Clone)]
pub struct Pattern {
    lowered: String,
    chunks: Vec<Chunk>,
    options: MatchOptions,
}

impl Pattern {
    pub fn new(query: &str, options: MatchOptions) -> Self {
        let lowered = query.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();
        let len = chars.len();

        let mut chunks = Vec::new();
        if len > MAX_BITS {
            let remainder = len % MAX_BITS;
            let end = len - remainder;
            let mut i = 0;
            while i < end {
                chunks.push(Chunk::new(&chars[i..i + MAX_BITS], i));
                i += MAX_BITS;
            }
            if remainder > 0 {
                let start = len - MAX_BITS;
                chunks.push(Chunk::new(&chars[start..], start));
            }
        } else if len > 0 {
            chunks.push(Chunk::new(&chars, 0));
        }

        Self {
            lowered,
            chunks,
            options,
        }
    }

    /// Score `text` against the pattern; `None` when nothing is within the threshold.
    pub fn score(&self, text: &str) -> Option<f64> {
        if self.chunks.is_empty() {
            return None;
        }
        let lowered = text.to_lowercase();
        if lowered == self.lowered {
            return Some(0.0);
        }

        let text: Vec<char> = lowered.chars().collect();
        let mut any_match = false;
        let mut total = 0.0;
        for chunk in &self.chunks {
            let location = self.options.location + chunk.start;
            match bitap(&text, chunk, location, &self.options) {
                Some(score) => {
                    any_match = true;
                    total += score;
                }
                None => total += 1.0,
            }
        }

        any_match.then(|| total / self.chunks.len() as f64)
    }
}

fn compute_score(
    pattern_len: usize,
    errors: usize,
    current: usize,
    expected: usize,
    distance: usize,
) -> f64 {
    let accuracy = errors as f64 / pattern_len as f64;
    let proximity = expected.abs_diff(current);
    if distance == 0 {
        return if proximity > 0 { 1.0 } else { accuracy };
    }
    accuracy + proximity as f64 / distance as f64
}

fn find_from(text: &[char], pattern: &[char], from: usize) -> Option<usize> {
    if pattern.len() > text.len() {
        return None;
    }
    (from..=text.len() - pattern.len()).find(|&i| text[i..i + pattern.len()] == *pattern)
}

/// One bitap pass over `text`; the pattern is at most `MAX_BITS` wide.
fn bitap(text: &[char], chunk: &Chunk, location: usize, options: &MatchOptions) -> Option<f64> {
    let pattern = &chunk.chars;
    let pattern_len = pattern.len();
    let text_len = text.len();
    let expected = location.min(text_len);
    let distance = options.distance;
    let mut threshold = options.threshold;

    // Exact occurrences tighten the threshold before the fuzzy pass.
    let mut from = expected;
    while let Some(index) = find_from(text, pattern, from) {
        threshold = threshold.min(compute_score(pattern_len, 0, index, expected, distance));
        from = index + pattern_len;
    }

    let mut best: Option<f64> = None;
    let mut last_bits: Vec<u32> = Vec::new();
    let mut bin_max = pattern_len + text_len;
    let mask: u32 = 1 << (pattern_len - 1);

    for errors in 0..pattern_len {
        // Binary search for how far from `expected` this error level may reach.
        let mut bin_min = 0;
        let mut bin_mid = bin_max;
        while bin_min < bin_mid {
            let score = compute_score(pattern_len, errors, expected + bin_mid, expected, distance);
            if score <= threshold {
                bin_min = bin_mid;
            } else {
                bin_max = bin_mid;
            }
            bin_mid = (bin_max - bin_min) / 2 + bin_min;
        }
        bin_max = bin_mid;

        let mut start = (expected + 1).saturating_sub(bin_mid).max(1);
        let finish = (expected + bin_mid).min(text_len) + pattern_len;

        let mut bits = vec![0u32; finish + 2];
        bits[finish + 1] = (1u32 << errors) - 1;

        let mut j = finish;
        while j >= start {
            let current = j - 1;
            let char_match = text
                .get(current)
                .and_then(|c| chunk.alphabet.get(c))
                .copied()
                .unwrap_or(0);

            let mut state = ((bits[j + 1] << 1) | 1) & char_match;
            if errors > 0 {
                let prev_next = last_bits.get(j + 1).copied().unwrap_or(0);
                let prev_here = last_bits.get(j).copied().unwrap_or(0);
                state |= ((prev_next | prev_here) << 1) | 1 | prev_next;
            }
            bits[j] = state;

            if state & mask != 0 {
                let score = compute_score(pattern_len, errors, current, expected, distance);
                if score <= threshold {
                    threshold = score;
                    best = Some(score);
                    if current <= expected {
                        break;
                    }
                    start = (2 * expected).saturating_sub(current).max(1);
                }
            }
            j -= 1;
        }

        if compute_score(pattern_len, errors + 1, expected, expected, distance) > threshold {
            break;
        }
        last_bits = bits;
    }

    best.map(|score| score.max(MIN_SCORE))
}

/// Length normalisation for a field: shorter fields weigh a match more.
pub fn field_norm(text: &str) -> f64 {
    let tokens = text.split(' ').filter(|t| !t.is_empty()).count().max(1);
    ((1.0 / (tokens as f64).sqrt()) * 1000.0).round() / 1000.0
}

/// Combine per-field `(score, weight, norm)` triples into one relevance score.
///
/// Only fields that matched should be passed in. Lower is better.
pub fn combine_scores(fields: impl IntoIterator<Item = (f64, f64, f64)>) -> f64 {
    fields
        .into_iter()
        .fold(1.0, |total, (score, weight, norm)| {
            let base = if score == 0.0 { f64::EPSILON } else { score };
            total * base.powf(weight * norm)
        })
}
