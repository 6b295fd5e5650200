//! Narration chunking.
//!
//! Splits a segment's narration into chunks aligned with visual beats.
//! A chunk closes when the narration names something the scene should be
//! showing (and enough words have accumulated to be worth a pause), when
//! the running buffer gets too long to sit under a single visual, or at
//! the end of the narration.

use std::collections::HashSet;

use magi_models::NarrationChunk;

/// Geometry and math terms that signal an on-screen visual.
const VISUAL_LEXICON: &[&str] = &[
    "triangle",
    "circle",
    "square",
    "rectangle",
    "line",
    "arrow",
    "graph",
    "equation",
    "formula",
    "text",
    "label",
    "point",
    "curve",
    "axis",
    "coordinate",
    "angle",
    "side",
    "vertex",
    "area",
    "perimeter",
    "plot",
    "function",
    "variable",
    "number",
    "symbol",
    "diagram",
];

/// Chunk close thresholds, in whitespace-delimited words.
const CUE_CLOSE_MIN_WORDS: usize = 5;
const MAX_BUFFER_WORDS: usize = 15;

/// Splits narration into visually-aligned chunks.
#[derive(Debug, Clone)]
pub struct SegmentChunker {
    words_per_minute: u32,
}

impl SegmentChunker {
    pub fn new(words_per_minute: u32) -> Self {
        Self {
            // Guard against a zero rate from a bad env override.
            words_per_minute: words_per_minute.max(1),
        }
    }

    /// Chunk one segment's narration against its scene description.
    ///
    /// Empty narration produces an empty list. Trailing buffers with no
    /// words are never emitted, so every chunk has a positive duration.
    pub fn chunk(&self, narration: &str, scene_description: &str) -> Vec<NarrationChunk> {
        let sentences = split_sentences(narration);
        if sentences.is_empty() {
            return Vec::new();
        }

        let cues = extract_visual_cues(scene_description);
        let mut chunks = Vec::new();
        let mut buffer = String::new();
        let last = sentences.len() - 1;

        for (i, sentence) in sentences.iter().enumerate() {
            if !buffer.is_empty() {
                buffer.push(' ');
            }
            buffer.push_str(sentence);

            let sentence_lower = sentence.to_lowercase();
            let mentions_visual = cues.iter().any(|cue| sentence_lower.contains(cue.as_str()));
            let buffer_words = buffer.split_whitespace().count();

            let close = (mentions_visual && buffer_words > CUE_CLOSE_MIN_WORDS)
                || buffer_words > MAX_BUFFER_WORDS
                || i == last;

            if close && buffer_words > 0 {
                let text = buffer.trim().to_string();
                let duration = estimate_speaking_duration(&text, self.words_per_minute);
                chunks.push(NarrationChunk::new(text, duration, mentions_visual));
                buffer.clear();
            }
        }

        chunks
    }
}

/// Estimated speaking time for the text at the given rate.
pub fn estimate_speaking_duration(text: &str, words_per_minute: u32) -> f64 {
    let words = text.split_whitespace().count() as f64;
    words / f64::from(words_per_minute) * 60.0
}

/// Split text into sentences on runs of terminal punctuation.
///
/// Terminal punctuation stays attached to its sentence so that the
/// concatenation of all chunks reproduces the narration modulo
/// whitespace. Fragments without any alphanumeric content are dropped.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            while let Some(&next) = chars.peek() {
                if matches!(next, '.' | '!' | '?') {
                    current.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            push_sentence(&mut sentences, &current);
            current.clear();
        }
    }
    push_sentence(&mut sentences, &current);

    sentences
}

fn push_sentence(sentences: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if trimmed.chars().any(char::is_alphanumeric) {
        sentences.push(trimmed.to_string());
    }
}

/// Collect cue terms from a scene description.
///
/// The cue set is the fixed lexicon terms that appear in the description
/// plus every distinct alphabetic token longer than two characters, all
/// lowercased. Matching against narration is by substring, so a cue like
/// "triangle" also fires on "triangles".
fn extract_visual_cues(scene_description: &str) -> HashSet<String> {
    let lower = scene_description.to_lowercase();
    let mut cues = HashSet::new();

    for term in VISUAL_LEXICON {
        if lower.contains(term) {
            cues.insert((*term).to_string());
        }
    }
    for word in lower.split(|c: char| !c.is_ascii_alphabetic()) {
        if word.len() > 2 {
            cues.insert(word.to_string());
        }
    }

    cues
}
