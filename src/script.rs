use crate::foundation::error::{NarravidError, NarravidResult};

/// A time-bounded slice of narration text, displayed while `start_time <= t < end_time`.
///
/// Segments produced by [`segment`] partition `[0, duration]` exactly: sorted,
/// contiguous, no gaps, no overlaps.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CaptionSegment {
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
}

impl CaptionSegment {
    pub fn contains(&self, t: f64) -> bool {
        self.start_time <= t && t < self.end_time
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Immutable narration input: the raw text plus the authoritative audio duration.
#[derive(Clone, Debug)]
pub struct NarrationScript {
    pub text: String,
    pub duration: f64,
}

impl NarrationScript {
    pub fn new(text: impl Into<String>, duration: f64) -> NarravidResult<Self> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(NarravidError::validation(
                "narration duration must be a positive, finite number of seconds",
            ));
        }
        Ok(Self {
            text: text.into(),
            duration,
        })
    }

    pub fn segments(&self) -> Vec<CaptionSegment> {
        segment(&self.text, self.duration)
    }
}

/// Split narration text into timed caption segments.
///
/// Sentences are split on terminal punctuation (`.`, `!`, `?`), retaining the
/// terminator. Each sentence's share of `duration` is proportional to its word count;
/// the final segment's `end_time` is forced to exactly `duration` so floating-point
/// drift never leaves a gap at the tail.
///
/// Degenerate inputs never fail: empty text yields one empty-caption segment covering
/// the full duration, and text with no countable words (punctuation only) falls back
/// to equal-length segments.
pub fn segment(text: &str, duration: f64) -> Vec<CaptionSegment> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return vec![CaptionSegment {
            text: String::new(),
            start_time: 0.0,
            end_time: duration,
        }];
    }

    let sentences = split_sentences(trimmed);
    let counts: Vec<usize> = sentences.iter().map(|s| word_count(s)).collect();
    let total_words: usize = counts.iter().sum();
    let n = sentences.len();

    let mut out = Vec::with_capacity(n);
    let mut cursor = 0.0;
    for (i, (sentence, count)) in sentences.into_iter().zip(counts).enumerate() {
        let share = if total_words == 0 {
            duration / n as f64
        } else {
            duration * (count as f64) / (total_words as f64)
        };
        let start_time = cursor;
        // The last segment absorbs accumulated rounding error.
        let end_time = if i + 1 == n { duration } else { cursor + share };
        cursor = end_time;
        out.push(CaptionSegment {
            text: sentence,
            start_time,
            end_time,
        });
    }
    out
}

/// Index of the segment active at `t`, by binary search over the ordered sequence.
/// Returns `None` only when `t` lies outside `[0, duration)`.
pub fn active_caption_index(segments: &[CaptionSegment], t: f64) -> Option<usize> {
    let idx = segments.partition_point(|s| s.end_time <= t);
    match segments.get(idx) {
        Some(s) if s.contains(t) => Some(idx),
        _ => None,
    }
}

/// Sentence boundary = terminal punctuation, but only after at least one word; runs
/// of bare punctuation attach to the neighboring sentence instead of forming their own.
fn split_sentences(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') && current.chars().any(char::is_alphanumeric) {
            out.push(current.trim().to_string());
            current.clear();
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        if tail.chars().any(char::is_alphanumeric) || out.is_empty() {
            out.push(tail.to_string());
        } else if let Some(last) = out.last_mut() {
            last.push(' ');
            last.push_str(tail);
        }
    }
    out
}

fn word_count(sentence: &str) -> usize {
    sentence
        .split_whitespace()
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .count()
}
