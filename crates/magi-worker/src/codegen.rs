//! Scene code generation with render-repair retry.
//!
//! One scene moves through generate, render, and repair phases. The
//! first generation that yields no code block fails the scene outright.
//! After that, each failed render feeds a repair prompt carrying the
//! broken source and a truncated diagnostic; a repair that returns
//! nothing new ends the cycle early. Every outcome folds into a
//! `SceneRenderResult` so one scene can never abort its siblings.

use std::path::Path;
use std::sync::{Arc, LazyLock};
use std::time::Instant;

use magi_ai::{CompletionParams, CompletionService};
use magi_models::{SceneRenderResult, TimingManifest};
use regex::Regex;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::metrics;
use crate::paths::OutputLayout;
use crate::prompts::PromptLibrary;
use crate::renderer::{extract_scene_class, SceneRenderer};
use crate::timing::validate_wait_calls;

/// Cap on diagnostic text embedded in repair prompts.
const MAX_ERROR_CHARS: usize = 2000;

static CODE_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:python)?[ \t]*\n(.*?)```").unwrap());

/// Everything the generator needs to produce one scene.
#[derive(Debug, Clone)]
pub struct ScenePlan {
    pub manifest: TimingManifest,
    pub timed_spec: String,
}

impl ScenePlan {
    pub fn new(manifest: TimingManifest, timed_spec: impl Into<String>) -> Self {
        Self {
            manifest,
            timed_spec: timed_spec.into(),
        }
    }

    pub fn scene_index(&self) -> usize {
        self.manifest.scene_index
    }
}

/// First fenced code block in model output, trimmed. `None` when the
/// output has no fence or the fence is empty.
pub fn extract_code_block(raw: &str) -> Option<String> {
    CODE_FENCE_RE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|code| !code.is_empty())
}

/// Middle-truncate diagnostic text to roughly `max_chars`, keeping the
/// head and tail. Renderer tracebacks put the setup noise in the middle
/// and the actual exception at the end.
pub fn truncate_error(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    let keep = max_chars / 2;
    let head: String = text.chars().take(keep).collect();
    let tail: String = text.chars().skip(count - keep).collect();
    format!(
        "{head}\n... [{} characters truncated] ...\n{tail}",
        count - 2 * keep
    )
}

/// True when a cancel token exists and has fired.
pub(crate) fn cancel_requested(cancel: Option<&watch::Receiver<bool>>) -> bool {
    cancel.map(|rx| *rx.borrow()).unwrap_or(false)
}

/// Drives the generate-render-repair cycle for single scenes.
#[derive(Clone)]
pub struct SceneGenerator {
    llm: Arc<dyn CompletionService>,
    renderer: Arc<dyn SceneRenderer>,
    prompts: Arc<PromptLibrary>,
    /// Total render attempts per scene (first render plus repairs)
    max_retries: u32,
    /// Escalate timing mismatches from warnings to render failures
    strict_timing: bool,
}

impl SceneGenerator {
    pub fn new(
        llm: Arc<dyn CompletionService>,
        renderer: Arc<dyn SceneRenderer>,
        prompts: Arc<PromptLibrary>,
        max_retries: u32,
        strict_timing: bool,
    ) -> Self {
        Self {
            llm,
            renderer,
            prompts,
            max_retries: max_retries.max(1),
            strict_timing,
        }
    }

    /// Generate, render, and if needed repair one scene.
    pub async fn process(
        &self,
        plan: &ScenePlan,
        layout: &OutputLayout,
        cancel: Option<&watch::Receiver<bool>>,
    ) -> SceneRenderResult {
        let scene_index = plan.scene_index();
        let source_path = layout.scene_source(scene_index);
        let video_dir = layout.video_dir();
        let expected_output = layout.rendered_scene(scene_index);

        let system = self.prompts.code_system_prompt();
        let user = self.prompts.scene_user_prompt(scene_index, &plan.timed_spec);
        let raw = self
            .llm
            .complete(&system, &user, CompletionParams::code())
            .await;

        let Some(mut code) = extract_code_block(&raw) else {
            warn!(scene_index, "Generation produced no usable code block");
            metrics::record_scene_failure();
            return SceneRenderResult::failed(
                scene_index,
                "generation produced no usable code block",
                1,
            );
        };

        for attempt in 1..=self.max_retries {
            if cancel_requested(cancel) {
                return SceneRenderResult::failed(scene_index, "cancelled", attempt);
            }

            // The source file is overwritten on every attempt so the
            // renderer always sees the latest repair.
            if let Err(e) = tokio::fs::write(&source_path, &code).await {
                metrics::record_scene_failure();
                return SceneRenderResult::failed(
                    scene_index,
                    format!("failed to write scene source: {e}"),
                    attempt,
                );
            }

            let error_text = match self
                .render_attempt(&code, &plan.manifest, &source_path, &video_dir, &expected_output)
                .await
            {
                Ok(()) => {
                    info!(scene_index, attempt, "Scene rendered");
                    metrics::record_scene_rendered();
                    return SceneRenderResult::succeeded(scene_index, expected_output, attempt);
                }
                Err(text) => text,
            };

            warn!(
                scene_index,
                attempt,
                "Render attempt failed: {}",
                truncate_error(&error_text, 200)
            );

            if attempt == self.max_retries {
                metrics::record_scene_failure();
                return SceneRenderResult::failed(scene_index, error_text, attempt);
            }

            if cancel_requested(cancel) {
                return SceneRenderResult::failed(scene_index, "cancelled", attempt);
            }

            let excerpt = truncate_error(&error_text, MAX_ERROR_CHARS);
            let repair = self.prompts.repair_prompt(&plan.timed_spec, &code, &excerpt);
            let raw = self
                .llm
                .complete(&system, &repair, CompletionParams::code())
                .await;
            metrics::record_repair_attempt();

            match extract_code_block(&raw) {
                Some(new_code) if new_code != code => code = new_code,
                Some(_) => {
                    warn!(scene_index, attempt, "Repair returned identical code");
                    metrics::record_scene_failure();
                    return SceneRenderResult::failed(
                        scene_index,
                        format!("repair returned identical code; last render error: {excerpt}"),
                        attempt,
                    );
                }
                None => {
                    warn!(scene_index, attempt, "Repair produced no usable code block");
                    metrics::record_scene_failure();
                    return SceneRenderResult::failed(
                        scene_index,
                        format!("repair produced no usable code block; last render error: {excerpt}"),
                        attempt,
                    );
                }
            }
        }

        // The loop always returns on its last attempt.
        metrics::record_scene_failure();
        SceneRenderResult::failed(scene_index, "render attempts exhausted", self.max_retries)
    }

    /// One render attempt. Returns the diagnostic text on failure.
    async fn render_attempt(
        &self,
        code: &str,
        manifest: &TimingManifest,
        source_path: &Path,
        video_dir: &Path,
        expected_output: &Path,
    ) -> Result<(), String> {
        if let Err(mismatch) = validate_wait_calls(code, manifest) {
            metrics::record_timing_mismatch();
            if self.strict_timing {
                return Err(format!("Timing validation failed: {mismatch}"));
            }
            warn!(scene_index = manifest.scene_index, "{}", mismatch);
        }

        let scene_class = extract_scene_class(code);
        let started = Instant::now();
        let outcome = self.renderer.render(source_path, &scene_class, video_dir).await;
        metrics::record_render_duration(started.elapsed().as_secs_f64());

        if !outcome.success {
            return Err(outcome.diagnostic().to_string());
        }
        if !tokio::fs::try_exists(expected_output).await.unwrap_or(false) {
            return Err(format!(
                "renderer exited successfully but produced no file at {}",
                expected_output.display()
            ));
        }
        Ok(())
    }
}
