//! Timed scene descriptions and wait-call validation.
//!
//! The timed description is the prompt payload for scene code
//! generation: it restates each narration chunk with its absolute time
//! window and the exact `self.wait(...)` call the generated scene must
//! emit after it. After generation, the scene source is checked back
//! against the `TimingManifest` so drift between the narration plan and
//! the generated pauses is caught before assembly.

use std::fmt;
use std::sync::LazyLock;

use magi_models::{NarrationChunk, TimingManifest};
use regex::Regex;

/// Tolerance when comparing generated wait durations against the plan.
/// Durations are stated to one decimal place in the prompt, so anything
/// beyond half a tenth is a real deviation, not rounding.
pub const WAIT_TOLERANCE_SECS: f64 = 0.05;

static WAIT_CALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"self\.wait\(\s*([0-9]+(?:\.[0-9]+)?)\s*\)").unwrap());

const BANNER: &str = "==================================================";

/// Render the timing-synchronized scene description for one segment.
///
/// The original prose description is superseded here: the generator is
/// steered entirely by per-segment narration text, time windows, and
/// visual directives derived from the chunker's cue detection.
pub fn build_timed_description(_original_description: &str, chunks: &[NarrationChunk]) -> String {
    let mut out = String::from("=== TIMING-SYNCHRONIZED SCENE ===\n\n");

    out.push_str("REQUIRED WAIT CALLS (follow exactly):\n");
    for (i, chunk) in chunks.iter().enumerate() {
        out.push_str(&format!(
            "   self.wait({:.1})  # After segment {}\n",
            chunk.estimated_duration_secs,
            i + 1
        ));
    }
    out.push_str(&format!("\nTotal segments: {}\n", chunks.len()));
    out.push_str(&format!("Total wait calls needed: {}\n\n", chunks.len()));

    let mut current_time = 0.0;
    for (i, chunk) in chunks.iter().enumerate() {
        let duration = chunk.estimated_duration_secs;

        out.push_str(BANNER);
        out.push('\n');
        out.push_str(&format!(
            "SEGMENT {} [{:.1}s - {:.1}s]\n",
            i + 1,
            current_time,
            current_time + duration
        ));
        out.push_str(BANNER);
        out.push('\n');
        out.push_str(&format!("Audio: \"{}\"\n", chunk.text));
        out.push_str(&format!("Duration: {duration:.1} seconds\n"));
        out.push_str(&format!(
            "MANDATORY: End this segment with self.wait({duration:.1})\n\n"
        ));

        if i == 0 {
            out.push_str("Visual: Set up initial scene elements\n");
        } else if chunk.mentions_visual_cue {
            out.push_str("Visual: Show/animate elements mentioned in narration\n");
        } else {
            out.push_str("Visual: Continue previous animation or show supporting elements\n");
        }
        out.push('\n');

        current_time += duration;
    }

    out.push_str(BANNER);
    out.push('\n');
    out.push_str(&format!(
        "THE SCENE MUST CONTAIN EXACTLY {} WAIT CALLS:\n",
        chunks.len()
    ));
    for (i, chunk) in chunks.iter().enumerate() {
        out.push_str(&format!(
            "   Segment {}: self.wait({:.1})\n",
            i + 1,
            chunk.estimated_duration_secs
        ));
    }
    out.push_str(&format!("TOTAL SCENE DURATION: {current_time:.1}s\n"));
    out.push_str("NO OTHER WAIT CALLS ALLOWED!\n");
    out.push_str(BANNER);
    out.push('\n');

    out
}

/// Wait durations found in generated scene source, in order.
pub fn extract_wait_calls(code: &str) -> Vec<f64> {
    WAIT_CALL_RE
        .captures_iter(code)
        .filter_map(|caps| caps.get(1).and_then(|m| m.as_str().parse().ok()))
        .collect()
}

/// Disagreement between the timing plan and generated scene source.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingMismatch {
    pub scene_index: usize,
    /// Planned durations, rounded to the precision stated in the prompt
    pub expected: Vec<f64>,
    /// Durations actually present in the generated source
    pub actual: Vec<f64>,
}

impl fmt::Display for TimingMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scene {} wait calls do not match the timing plan: expected {} calls {:?}, found {} calls {:?}",
            self.scene_index,
            self.expected.len(),
            self.expected,
            self.actual.len(),
            self.actual
        )
    }
}

/// Check generated scene source against its timing manifest.
///
/// The count of wait calls must equal the manifest's entry count, and
/// each duration must match the planned duration to within
/// [`WAIT_TOLERANCE_SECS`] of its one-decimal form.
pub fn validate_wait_calls(code: &str, manifest: &TimingManifest) -> Result<(), TimingMismatch> {
    let actual = extract_wait_calls(code);
    let expected: Vec<f64> = manifest
        .wait_durations()
        .iter()
        .map(|d| (d * 10.0).round() / 10.0)
        .collect();

    let matches = actual.len() == expected.len()
        && expected
            .iter()
            .zip(&actual)
            .all(|(e, a)| (e - a).abs() <= WAIT_TOLERANCE_SECS);

    if matches {
        Ok(())
    } else {
        Err(TimingMismatch {
            scene_index: manifest.scene_index,
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks() -> Vec<NarrationChunk> {
        vec![
            NarrationChunk::new("Opening words.", 3.0, false),
            NarrationChunk::new("Draw the triangle now please.", 2.5, true),
            NarrationChunk::new("And we close.", 1.2, false),
        ]
    }

    #[test]
    fn test_description_header_lists_every_wait() {
        let spec = build_timed_description("a triangle", &chunks());
        assert!(spec.starts_with("=== TIMING-SYNCHRONIZED SCENE ===\n"));
        assert!(spec.contains("self.wait(3.0)  # After segment 1"));
        assert!(spec.contains("self.wait(2.5)  # After segment 2"));
        assert!(spec.contains("self.wait(1.2)  # After segment 3"));
        assert!(spec.contains("Total segments: 3"));
        assert!(spec.contains("Total wait calls needed: 3"));
    }

    #[test]
    fn test_description_time_windows_accumulate() {
        let spec = build_timed_description("", &chunks());
        assert!(spec.contains("SEGMENT 1 [0.0s - 3.0s]"));
        assert!(spec.contains("SEGMENT 2 [3.0s - 5.5s]"));
        assert!(spec.contains("SEGMENT 3 [5.5s - 6.7s]"));
        assert!(spec.contains("TOTAL SCENE DURATION: 6.7s"));
    }

    #[test]
    fn test_description_visual_directives() {
        let spec = build_timed_description("", &chunks());
        assert!(spec.contains("Visual: Set up initial scene elements"));
        assert!(spec.contains("Visual: Show/animate elements mentioned in narration"));
        assert!(spec.contains("Visual: Continue previous animation or show supporting elements"));
    }

    #[test]
    fn test_wait_directive_count_equals_chunk_count() {
        let chunk_list = chunks();
        let spec = build_timed_description("", &chunk_list);
        let mandatory = spec.matches("MANDATORY: End this segment with").count();
        assert_eq!(mandatory, chunk_list.len());
    }

    #[test]
    fn test_empty_chunks_still_render_frame() {
        let spec = build_timed_description("anything", &[]);
        assert!(spec.contains("Total segments: 0"));
        assert!(spec.contains("TOTAL SCENE DURATION: 0.0s"));
    }

    #[test]
    fn test_extract_wait_calls() {
        let code = "self.play(Create(c))\nself.wait(3.0)\nself.wait( 2.5 )\nself.wait(1)\n";
        assert_eq!(extract_wait_calls(code), vec![3.0, 2.5, 1.0]);
    }

    #[test]
    fn test_extract_skips_non_numeric_waits() {
        let code = "self.wait(pause)\nself.wait()\nself.wait(0.8)";
        assert_eq!(extract_wait_calls(code), vec![0.8]);
    }

    #[test]
    fn test_validate_accepts_matching_code() {
        let manifest = TimingManifest::from_chunks(0, &chunks());
        let code = "self.wait(3.0)\nself.wait(2.5)\nself.wait(1.2)";
        assert!(validate_wait_calls(code, &manifest).is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_wait() {
        let manifest = TimingManifest::from_chunks(4, &chunks());
        let code = "self.wait(3.0)\nself.wait(2.5)";
        let mismatch = validate_wait_calls(code, &manifest).unwrap_err();
        assert_eq!(mismatch.scene_index, 4);
        assert_eq!(mismatch.expected.len(), 3);
        assert_eq!(mismatch.actual.len(), 2);
    }

    #[test]
    fn test_validate_rejects_wrong_duration() {
        let manifest = TimingManifest::from_chunks(0, &chunks());
        let code = "self.wait(3.0)\nself.wait(2.0)\nself.wait(1.2)";
        assert!(validate_wait_calls(code, &manifest).is_err());
    }

    #[test]
    fn test_validate_tolerates_plan_rounding() {
        // 17 words at 150 wpm is 6.8s exactly; 16 words is 6.4s. A plan
        // entry of 3.0166... prints as 3.0 and the generated 3.0 must pass.
        let chunk = NarrationChunk::new("seven words and a bit more here", 3.0166, false);
        let manifest = TimingManifest::from_chunks(0, &[chunk]);
        assert!(validate_wait_calls("self.wait(3.0)", &manifest).is_ok());
    }
}
