//! Prompt templates and the renderer usage reference.
//!
//! All text sent to the language model is assembled here. The renderer
//! usage reference and the code generation task are embedded defaults
//! that operators can replace with on-disk files via
//! `MAGI_KNOWLEDGE_PATH` and `MAGI_PROMPT_PATH`.

use std::fs;

use magi_models::SophisticationLevel;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::script::ScriptPlan;

/// Condensed Manim usage reference handed to the code generator.
const DEFAULT_MANIM_KNOWLEDGE: &str = r#"MANIM USAGE REFERENCE

Scene structure:
- Every scene is a class extending Scene with a construct(self) method.
- self.play(animation, ...) runs animations; self.add(mobject) places objects instantly.
- self.wait(seconds) holds the current frame for the given duration.

Core mobjects:
- Shapes: Circle(), Square(), Triangle(), Rectangle(width=, height=), Line(start, end),
  Arrow(start, end), Dot(point), Polygon(p1, p2, ...).
- Text: Text("plain label") for ordinary text, MathTex(r"x^2 + y^2 = r^2") for formulas.
  Always pass raw strings to MathTex.
- Graphing: Axes(x_range=[a, b, step], y_range=[a, b, step]) with
  axes.plot(lambda x: ..., color=BLUE) and axes.get_graph_label(graph, label).
- NumberPlane() for a full coordinate grid.

Positioning:
- Direction constants: UP, DOWN, LEFT, RIGHT, ORIGIN, UL, UR, DL, DR.
- mobject.shift(UP * 2), mobject.move_to(ORIGIN), mobject.to_edge(LEFT),
  mobject.next_to(other, DOWN, buff=0.5), mobject.scale(0.8).
- Group related objects with VGroup(a, b, c) and arrange with
  group.arrange(RIGHT, buff=0.5).

Animations:
- Create(shape), Write(text), FadeIn(m), FadeOut(m), Transform(a, b),
  ReplacementTransform(a, b), Indicate(m), Circumscribe(m), GrowArrow(arrow).
- Several animations in one call play simultaneously:
  self.play(Create(circle), Write(label)).
- Pass run_time=n to control animation speed: self.play(Create(axes), run_time=2).

Colors: RED, GREEN, BLUE, YELLOW, ORANGE, PURPLE, WHITE, GRAY, set via color= or
mobject.set_color(RED).

Frame limits: the visible frame is roughly 14 units wide and 8 units tall,
centered on ORIGIN. Keep content inside x in [-6.5, 6.5] and y in [-3.5, 3.5].
Fade out or shift away finished content before drawing in the same region.

Common failure causes to avoid:
- MathTex with unescaped backslashes or non-raw strings.
- Referencing a mobject after it was consumed by Transform.
- axes.plot over a range where the function is undefined.
- Overlapping text that was never removed."#;

/// Code generation task instructions appended after the usage reference.
const DEFAULT_CODE_TASK: &str = r#"You are writing a complete Manim scene file from a timing-synchronized scene description.

Rules:
1. Produce one complete, runnable Python file containing exactly one class that extends Scene.
2. Follow the timing plan exactly: emit every self.wait(...) call listed in the description, in order, with the exact durations shown. Never add, remove, or round wait calls.
3. Between wait calls, build the visuals the narration for that segment describes.
4. Use MathTex with raw strings for formulas and Text for plain labels.
5. Keep every element inside the visible frame and remove finished elements before reusing a screen region.
6. The scene is silent video only. Do not use audio, file, or network APIs.
7. Return the complete file in a single fenced code block (```python ... ```), with no prose before or after the fence."#;

/// System prompt template for explainer script generation.
const EXPLAINER_PROMPT_TEMPLATE: &str = r#"You are an expert educational script writer for narrated animated videos. Generate a complete narration script about {topic} at a {level_desc} sophistication level that would be about {duration_minutes} minutes long when read aloud (approximately {expected_words} words total).

### Script Rules:
1. Divide the script into exactly {scene_count} scenes of approximately {words_per_scene} words each.
2. Each scene develops one concept and flows naturally into the next.
3. Mark the beginning of each scene with [NEW CONCEPT].
4. End each scene with [END CONCEPT|| Scene description: ...] using the structure below.
5. Write narration as plain spoken prose. Mathematical expressions should be written in words (e.g., "x squared" instead of "x^2").
6. Name the shapes, graphs, equations, and labels the viewer should see. The narration drives the visuals.

### Scene Description Format:
Each scene description is a sequence of static states and animations with duration estimates:
- Static state N: what is on screen [duration: Ns]
- Animation N: what changes [duration: Ns]

Example:
{scene_example}

Generate a complete script with {scene_count} scenes, each approximately {words_per_scene} words."#;

/// System prompt template for problem-solving script generation.
const SOLVER_PROMPT_TEMPLATE: &str = r#"You are an expert mathematics tutor creating step-by-step problem-solving videos. Generate a structured solution script for the problem: {problem} at a {detail_level_desc} that would be about {duration_minutes} minutes long when read aloud (approximately {expected_words} words total).

### Problem-Solving Rules:
1. Divide the solution into exactly {step_count} solution steps of approximately {words_per_step} words each.
2. Each step should represent one logical solution step (e.g., "subtract 5 from both sides").
3. Mark the beginning of each step with [NEW STEP].
4. End each step with [END STEP|| Scene description: ...] using the structure below.
5. Mathematical expressions should be written in words (e.g., "x squared" instead of "x^2").
6. Always show your work and explain the reasoning for each step.
7. Include verification/checking at the end when appropriate.

### Detail Levels:
- **Basic (1)**: Show main steps only, minimal explanation
- **Standard (2)**: Show all steps with brief explanations
- **Detailed (3)**: Show all steps with full reasoning and alternative approaches

### Scene Description Format:
Each scene should show the mathematical work being done:
- Problem setup or current equation state
- Highlight the operation being performed
- Show the result after the operation
- Duration estimate (e.g., [duration: 12s])

Example for "Solve: 2x + 5 = 13":

[NEW STEP]
Let's start by writing down our equation clearly. We have two x plus five equals thirteen. Our goal is to isolate x on one side of the equation. We can do this by performing the same operation on both sides to maintain equality.

[END STEP|| Scene description:
Static state 1: Show the equation "2x + 5 = 13" centered on screen [duration: 3s]
Animation 1: Highlight the goal "Solve for x" appearing below the equation [duration: 2s]
Static state 2: Display "Strategy: Isolate x by undoing operations" [duration: 4s]
]

Generate a complete solution with {step_count} steps, each approximately {words_per_step} words."#;

/// Detail-level phrasing used in solver prompts.
pub fn detail_level_description(level: SophisticationLevel) -> &'static str {
    match level {
        SophisticationLevel::Beginner => {
            "Basic level - show main steps only with minimal explanation"
        }
        SophisticationLevel::Intermediate => {
            "Standard level - show all steps with brief explanations"
        }
        SophisticationLevel::Advanced => {
            "Detailed level - show all steps with full reasoning and alternative approaches"
        }
    }
}

/// Example scene description interpolated into the explainer template.
fn scene_example(level: SophisticationLevel) -> &'static str {
    match level {
        SophisticationLevel::Beginner => {
            "[NEW CONCEPT]\n\
             A circle is the set of all points that sit at the same distance from a center point. That fixed distance is called the radius. Watch how the radius sweeps around the center to trace out the circle.\n\
             [END CONCEPT|| Scene description:\n\
             Static state 1: Show a single dot labeled \"center\" at the middle of the screen [duration: 2s]\n\
             Animation 1: Draw a line labeled \"radius\" from the center outward, then sweep it around to trace a circle [duration: 5s]\n\
             Static state 2: Show the finished circle with the radius line and both labels [duration: 3s]\n\
             ]]"
        }
        SophisticationLevel::Intermediate => {
            "[NEW CONCEPT]\n\
             The Pythagorean theorem relates the three sides of a right triangle: the square of the hypotenuse equals the sum of the squares of the other two sides. Let's draw a right triangle and label its sides a, b, and c to see the relationship.\n\
             [END CONCEPT|| Scene description:\n\
             Static state 1: Show a right triangle with legs labeled \"a\" and \"b\" and hypotenuse labeled \"c\" [duration: 3s]\n\
             Animation 1: Draw a square on each side of the triangle [duration: 4s]\n\
             Animation 2: Write the equation \"a squared plus b squared equals c squared\" below the figure [duration: 3s]\n\
             ]]"
        }
        SophisticationLevel::Advanced => {
            "[NEW CONCEPT]\n\
             The derivative of a function at a point is the limit of the secant slopes as the second sample point approaches the first. Geometrically, the secant line pivots into the tangent line, and its slope converges to the instantaneous rate of change.\n\
             [END CONCEPT|| Scene description:\n\
             Static state 1: Show axes with the curve f(x) = x squared and two marked points on the curve [duration: 3s]\n\
             Animation 1: Draw the secant line through both points, then slide the second point toward the first while the line pivots [duration: 6s]\n\
             Static state 2: Show the tangent line at the remaining point with the label \"slope = f'(x)\" [duration: 3s]\n\
             ]]"
        }
    }
}

/// Loaded prompt set used for one pipeline run.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    manim_knowledge: String,
    code_task: String,
}

impl PromptLibrary {
    /// Build the library, honoring file overrides from the config.
    pub fn load(config: &WorkerConfig) -> WorkerResult<Self> {
        let manim_knowledge = match &config.knowledge_path {
            Some(path) => fs::read_to_string(path).map_err(|e| {
                WorkerError::config_error(format!(
                    "failed to read knowledge file {}: {e}",
                    path.display()
                ))
            })?,
            None => DEFAULT_MANIM_KNOWLEDGE.to_string(),
        };
        let code_task = match &config.prompt_path {
            Some(path) => fs::read_to_string(path).map_err(|e| {
                WorkerError::config_error(format!(
                    "failed to read prompt file {}: {e}",
                    path.display()
                ))
            })?,
            None => DEFAULT_CODE_TASK.to_string(),
        };
        Ok(Self {
            manim_knowledge,
            code_task,
        })
    }

    /// System prompt for scene code generation and repair.
    pub fn code_system_prompt(&self) -> String {
        format!(
            "This is the full breakdown on how to use manim:\n{}\n\n\
             This is the task we would like you to accomplish with the given information:\n{}",
            self.manim_knowledge, self.code_task
        )
    }

    /// User prompt carrying one scene's timed description.
    pub fn scene_user_prompt(&self, scene_index: usize, timed_spec: &str) -> String {
        format!(
            "Scene description for concept {}:\n{}",
            scene_index + 1,
            timed_spec
        )
    }

    /// User prompt for a repair round after a failed render.
    pub fn repair_prompt(&self, timed_spec: &str, failed_code: &str, error_excerpt: &str) -> String {
        format!(
            "A Manim scene failed to render. Fix the code so it renders successfully.\n\n\
             **SCENE REQUIREMENTS:**\n{timed_spec}\n\n\
             **FAILED CODE:**\n```python\n{failed_code}\n```\n\n\
             **RENDER ERROR:**\n{error_excerpt}\n\n\
             Return the complete corrected file in a single fenced code block. \
             Keep every self.wait(...) call exactly as listed in the requirements."
        )
    }

    /// System prompt for explainer script generation.
    pub fn explainer_system_prompt(
        &self,
        topic: &str,
        level: SophisticationLevel,
        plan: &ScriptPlan,
    ) -> String {
        EXPLAINER_PROMPT_TEMPLATE
            .replace("{topic}", topic)
            .replace("{level_desc}", level.audience_description())
            .replace("{duration_minutes}", &plan.duration_minutes.to_string())
            .replace("{expected_words}", &plan.expected_words.to_string())
            .replace("{scene_count}", &plan.segment_count.to_string())
            .replace("{words_per_scene}", &plan.words_per_segment.to_string())
            .replace("{scene_example}", scene_example(level))
    }

    /// User prompt for explainer script generation.
    pub fn explainer_user_prompt(
        &self,
        topic: &str,
        level: SophisticationLevel,
        plan: &ScriptPlan,
    ) -> String {
        format!(
            "Create a detailed educational script about {} at a {} sophistication level. \
             The script should have exactly {} scenes, each approximately {} words. \
             Target total length: {} words ({} minutes when spoken). \
             Use [NEW CONCEPT] and [END CONCEPT|| Scene description: ...] markers for each scene.",
            topic,
            level.audience_description(),
            plan.segment_count,
            plan.words_per_segment,
            plan.expected_words,
            plan.duration_minutes
        )
    }

    /// System prompt for problem-solving script generation.
    pub fn solver_system_prompt(
        &self,
        problem: &str,
        detail_level: SophisticationLevel,
        plan: &ScriptPlan,
    ) -> String {
        SOLVER_PROMPT_TEMPLATE
            .replace("{problem}", problem)
            .replace("{detail_level_desc}", detail_level_description(detail_level))
            .replace("{duration_minutes}", &plan.duration_minutes.to_string())
            .replace("{expected_words}", &plan.expected_words.to_string())
            .replace("{step_count}", &plan.segment_count.to_string())
            .replace("{words_per_step}", &plan.words_per_segment.to_string())
    }

    /// User prompt for problem-solving script generation.
    pub fn solver_user_prompt(
        &self,
        problem: &str,
        detail_level: SophisticationLevel,
        plan: &ScriptPlan,
    ) -> String {
        format!(
            "Create a detailed step-by-step solution for the problem: {} at a {}. \
             The solution should have exactly {} steps, each approximately {} words. \
             Target total length: {} words ({} minutes when spoken). \
             Use [NEW STEP] and [END STEP|| Scene description: ...] markers for each solution step.",
            problem,
            detail_level_description(detail_level),
            plan.segment_count,
            plan.words_per_segment,
            plan.expected_words,
            plan.duration_minutes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn library() -> PromptLibrary {
        PromptLibrary::load(&WorkerConfig::default()).unwrap()
    }

    #[test]
    fn test_explainer_prompt_fills_placeholders() {
        let plan = ScriptPlan {
            duration_minutes: 5,
            expected_words: 750,
            segment_count: 3,
            words_per_segment: 250,
        };
        let prompt = library().explainer_system_prompt(
            "Pythagorean Theorem",
            SophisticationLevel::Intermediate,
            &plan,
        );
        assert!(prompt.contains("Pythagorean Theorem"));
        assert!(prompt.contains("exactly 3 scenes"));
        assert!(prompt.contains("approximately 250 words"));
        assert!(!prompt.contains("{topic}"));
        assert!(!prompt.contains("{scene_example}"));
    }

    #[test]
    fn test_solver_prompt_fills_placeholders() {
        let plan = ScriptPlan {
            duration_minutes: 3,
            expected_words: 450,
            segment_count: 4,
            words_per_segment: 112,
        };
        let prompt = library().solver_system_prompt(
            "Solve: 2x + 5 = 13",
            SophisticationLevel::Intermediate,
            &plan,
        );
        assert!(prompt.contains("Solve: 2x + 5 = 13"));
        assert!(prompt.contains("exactly 4 solution steps"));
        assert!(prompt.contains("Standard level"));
        assert!(!prompt.contains("{problem}"));
        assert!(!prompt.contains("{step_count}"));
    }

    #[test]
    fn test_code_system_prompt_sections() {
        let prompt = library().code_system_prompt();
        assert!(prompt.starts_with("This is the full breakdown on how to use manim:"));
        assert!(prompt.contains("MANIM USAGE REFERENCE"));
        assert!(prompt.contains("task we would like you to accomplish"));
    }

    #[test]
    fn test_repair_prompt_embeds_code_and_error() {
        let prompt = library().repair_prompt("SPEC TEXT", "print('x')", "NameError: foo");
        assert!(prompt.contains("SPEC TEXT"));
        assert!(prompt.contains("print('x')"));
        assert!(prompt.contains("NameError: foo"));
        assert!(prompt.contains("```python"));
    }

    #[test]
    fn test_knowledge_file_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "CUSTOM KNOWLEDGE BODY").unwrap();

        let config = WorkerConfig {
            knowledge_path: Some(file.path().to_path_buf()),
            ..WorkerConfig::default()
        };
        let library = PromptLibrary::load(&config).unwrap();
        assert!(library.code_system_prompt().contains("CUSTOM KNOWLEDGE BODY"));
    }

    #[test]
    fn test_missing_override_is_config_error() {
        let config = WorkerConfig {
            knowledge_path: Some("/nonexistent/knowledge.txt".into()),
            ..WorkerConfig::default()
        };
        let err = PromptLibrary::load(&config).unwrap_err();
        assert!(matches!(err, WorkerError::ConfigError(_)));
    }

    #[test]
    fn test_scene_user_prompt_is_one_based() {
        let prompt = library().scene_user_prompt(0, "TIMED");
        assert!(prompt.starts_with("Scene description for concept 1:"));
    }
}
