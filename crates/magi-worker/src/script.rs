//! Script generation and parsing.
//!
//! Two request shapes share one output format: explainer scripts walk a
//! topic through concept scenes, solver scripts walk a problem through
//! solution steps. Both come back as marker-delimited text that parses
//! into ordered narration/scene-description segments.

use magi_ai::{CompletionParams, CompletionService};
use magi_models::{Script, Segment, SophisticationLevel};
use tracing::{info, warn};

use crate::error::{WorkerError, WorkerResult};
use crate::prompts::PromptLibrary;

/// Sizing figures interpolated into a generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptPlan {
    pub duration_minutes: u32,
    pub expected_words: u32,
    pub segment_count: u32,
    pub words_per_segment: u32,
}

impl ScriptPlan {
    /// Explainer sizing: one scene per two minutes, clamped to 3..=8.
    pub fn explainer(duration_minutes: u32, words_per_minute: u32) -> Self {
        let expected_words = duration_minutes * words_per_minute;
        let segment_count = (duration_minutes / 2).clamp(3, 8);
        Self {
            duration_minutes,
            expected_words,
            segment_count,
            words_per_segment: expected_words / segment_count,
        }
    }

    /// Solver sizing: one step per minute plus one, clamped to 3..=8.
    pub fn solver(duration_minutes: u32, words_per_minute: u32) -> Self {
        let expected_words = duration_minutes * words_per_minute;
        let segment_count = (duration_minutes + 1).clamp(3, 8);
        Self {
            duration_minutes,
            expected_words,
            segment_count,
            words_per_segment: expected_words / segment_count,
        }
    }
}

/// Generates and parses scripts through the completion service.
pub struct ScriptGenerator<'a> {
    llm: &'a dyn CompletionService,
    prompts: &'a PromptLibrary,
    words_per_minute: u32,
}

impl<'a> ScriptGenerator<'a> {
    pub fn new(
        llm: &'a dyn CompletionService,
        prompts: &'a PromptLibrary,
        words_per_minute: u32,
    ) -> Self {
        Self {
            llm,
            prompts,
            words_per_minute,
        }
    }

    /// Generate an explainer script for a topic.
    pub async fn explainer(
        &self,
        topic: &str,
        duration_minutes: u32,
        level: SophisticationLevel,
    ) -> WorkerResult<Script> {
        let plan = ScriptPlan::explainer(duration_minutes, self.words_per_minute);
        let system = self.prompts.explainer_system_prompt(topic, level, &plan);
        let user = self.prompts.explainer_user_prompt(topic, level, &plan);

        let raw = self
            .llm
            .complete(&system, &user, CompletionParams::script())
            .await;
        let segments = parse_concepts(&raw);

        if segments.is_empty() {
            warn!(
                topic = %topic,
                raw_chars = raw.len(),
                "No concept segments parsed from generation output"
            );
            return Err(WorkerError::script_generation(
                "no concept segments could be parsed from the generation output",
            ));
        }

        let script = Script::new(topic, duration_minutes, level, segments);
        info!(
            topic = %topic,
            scenes = script.scene_count(),
            words = script.total_words(),
            requested_scenes = plan.segment_count,
            "Explainer script generated"
        );
        Ok(script)
    }

    /// Generate a step-by-step solution script for a problem.
    ///
    /// The returned script's topic is the problem statement prefixed
    /// with "Problem: " so downstream stages treat both kinds alike.
    pub async fn solver(
        &self,
        problem: &str,
        duration_minutes: u32,
        detail_level: SophisticationLevel,
    ) -> WorkerResult<Script> {
        let plan = ScriptPlan::solver(duration_minutes, self.words_per_minute);
        let system = self.prompts.solver_system_prompt(problem, detail_level, &plan);
        let user = self.prompts.solver_user_prompt(problem, detail_level, &plan);

        let raw = self
            .llm
            .complete(&system, &user, CompletionParams::script())
            .await;
        let segments = parse_solution_steps(&raw);

        if segments.is_empty() {
            warn!(
                problem = %problem,
                raw_chars = raw.len(),
                "No solution steps parsed from generation output"
            );
            return Err(WorkerError::script_generation(
                "no solution steps could be parsed from the generation output",
            ));
        }

        let script = Script::new(
            format!("Problem: {problem}"),
            duration_minutes,
            detail_level,
            segments,
        );
        info!(
            problem = %problem,
            steps = script.scene_count(),
            words = script.total_words(),
            requested_steps = plan.segment_count,
            "Solution script generated"
        );
        Ok(script)
    }
}

/// Parse `[NEW CONCEPT] ... [END CONCEPT|| Scene description: ...]]`
/// blocks from explainer output.
///
/// Blocks without an end marker and blocks with empty narration are
/// dropped.
pub fn parse_concepts(raw: &str) -> Vec<Segment> {
    raw.split("[NEW CONCEPT]")
        .skip(1)
        .filter_map(|block| {
            let block = block.trim();
            let (narration, description) = block.split_once("[END CONCEPT|| Scene description:")?;
            let narration = narration.trim();
            if narration.is_empty() {
                return None;
            }
            let description = description.trim().trim_end_matches(']').trim();
            Some(Segment::new(narration, description))
        })
        .collect()
}

/// Parse `[NEW STEP] ... [END STEP|| Scene description: ...]` blocks
/// from solver output.
///
/// A step missing its end marker keeps its narration and gets a stock
/// scene description, so one malformed step does not sink the solution.
pub fn parse_solution_steps(raw: &str) -> Vec<Segment> {
    raw.split("[NEW STEP]")
        .skip(1)
        .filter_map(|block| {
            let block = block.trim();
            if block.is_empty() {
                return None;
            }
            match block.split_once("[END STEP|| Scene description:") {
                Some((narration, description)) => {
                    let narration = narration.trim();
                    if narration.is_empty() {
                        return None;
                    }
                    let description = description.trim().trim_end_matches(']').trim();
                    Some(Segment::new(narration, description))
                }
                None => {
                    let preview: String = block.chars().take(100).collect();
                    Some(Segment::new(
                        block,
                        format!("Show mathematical work for: {preview}..."),
                    ))
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use magi_ai::CompletionParams;

    struct FixedCompletion(String);

    #[async_trait]
    impl CompletionService for FixedCompletion {
        async fn complete(&self, _system: &str, _user: &str, _params: CompletionParams) -> String {
            self.0.clone()
        }
    }

    #[test]
    fn test_explainer_plan_formulas() {
        let plan = ScriptPlan::explainer(5, 150);
        assert_eq!(plan.expected_words, 750);
        assert_eq!(plan.segment_count, 3); // 5 / 2 = 2, clamped up
        assert_eq!(plan.words_per_segment, 250);

        let plan = ScriptPlan::explainer(10, 150);
        assert_eq!(plan.segment_count, 5);
        assert_eq!(plan.words_per_segment, 300);

        let plan = ScriptPlan::explainer(30, 150);
        assert_eq!(plan.segment_count, 8); // clamped down
    }

    #[test]
    fn test_solver_plan_formulas() {
        let plan = ScriptPlan::solver(3, 150);
        assert_eq!(plan.expected_words, 450);
        assert_eq!(plan.segment_count, 4);
        assert_eq!(plan.words_per_segment, 112);

        assert_eq!(ScriptPlan::solver(1, 150).segment_count, 3);
        assert_eq!(ScriptPlan::solver(10, 150).segment_count, 8);
    }

    #[test]
    fn test_parse_concepts_basic() {
        let raw = "\
[NEW CONCEPT]
A circle is all points at one distance.
[END CONCEPT|| Scene description: Show a circle with its radius [duration: 3s]]]
[NEW CONCEPT]
The radius never changes length.
[END CONCEPT|| Scene description: Animate the radius sweeping [duration: 4s]]]";
        let segments = parse_concepts(raw);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].narration, "A circle is all points at one distance.");
        assert!(segments[0].scene_description.starts_with("Show a circle"));
        assert!(!segments[1].scene_description.ends_with(']'));
    }

    #[test]
    fn test_parse_concepts_drops_unterminated_block() {
        let raw = "[NEW CONCEPT]\nNarration without an end marker.\n[NEW CONCEPT]\nGood one.\n[END CONCEPT|| Scene description: axes]]";
        let segments = parse_concepts(raw);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].narration, "Good one.");
    }

    #[test]
    fn test_parse_concepts_empty_output() {
        assert!(parse_concepts("").is_empty());
        assert!(parse_concepts("plain prose, no markers at all").is_empty());
    }

    #[test]
    fn test_parse_steps_fallback_description() {
        let raw = "[NEW STEP]\nSubtract five from both sides to isolate the term.";
        let segments = parse_solution_steps(raw);
        assert_eq!(segments.len(), 1);
        assert!(segments[0]
            .scene_description
            .starts_with("Show mathematical work for: Subtract five"));
    }

    #[test]
    fn test_parse_steps_strips_trailing_brackets() {
        let raw = "[NEW STEP]\nDivide both sides by two.\n[END STEP|| Scene description:\nShow 2x = 8 becoming x = 4 [duration: 5s]\n]";
        let segments = parse_solution_steps(raw);
        assert_eq!(segments.len(), 1);
        assert_eq!(
            segments[0].scene_description,
            "Show 2x = 8 becoming x = 4 [duration: 5s]"
        );
    }

    #[tokio::test]
    async fn test_explainer_generation_parses_script() {
        let llm = FixedCompletion(
            "[NEW CONCEPT]\nFirst idea in words.\n[END CONCEPT|| Scene description: a graph]]\n\
             [NEW CONCEPT]\nSecond idea in words.\n[END CONCEPT|| Scene description: a line]]"
                .to_string(),
        );
        let prompts = PromptLibrary::load(&crate::config::WorkerConfig::default()).unwrap();
        let generator = ScriptGenerator::new(&llm, &prompts, 150);

        let script = generator
            .explainer("Graphs", 5, SophisticationLevel::Beginner)
            .await
            .unwrap();
        assert_eq!(script.scene_count(), 2);
        assert_eq!(script.topic, "Graphs");
    }

    #[tokio::test]
    async fn test_solver_generation_prefixes_topic() {
        let llm = FixedCompletion(
            "[NEW STEP]\nSubtract five.\n[END STEP|| Scene description: the equation]".to_string(),
        );
        let prompts = PromptLibrary::load(&crate::config::WorkerConfig::default()).unwrap();
        let generator = ScriptGenerator::new(&llm, &prompts, 150);

        let script = generator
            .solver("Solve: 2x + 5 = 13", 3, SophisticationLevel::Intermediate)
            .await
            .unwrap();
        assert_eq!(script.topic, "Problem: Solve: 2x + 5 = 13");
        assert_eq!(script.scene_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_generation_is_an_error() {
        let llm = FixedCompletion(String::new());
        let prompts = PromptLibrary::load(&crate::config::WorkerConfig::default()).unwrap();
        let generator = ScriptGenerator::new(&llm, &prompts, 150);

        let err = generator
            .explainer("Anything", 5, SophisticationLevel::Intermediate)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::ScriptGeneration(_)));
    }
}
