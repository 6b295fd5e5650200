//! Job pipeline orchestration.
//!
//! One run takes a request through script generation, narration
//! chunking, audio synthesis, parallel scene rendering, assembly, and
//! subtitles, reporting progress milestones along the way. Individual
//! scene failures degrade the output to the surviving scenes; the job
//! itself fails only when no scene rendered, when assembly broke, or
//! when the user cancelled.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use magi_ai::{CompletionService, ElevenLabsClient, LlmClient, SpeechService};
use magi_jobs::ProgressHandle;
use magi_media::{FfmpegMux, MediaMux};
use magi_models::{
    GenerateVideoRequest, JobId, JobKind, NarrationChunk, Script, SolveProblemRequest,
    SophisticationLevel, TimingManifest,
};
use tokio::sync::watch;
use tracing::warn;

use crate::assembler::VideoAssembler;
use crate::audio::generate_scene_audio;
use crate::chunker::SegmentChunker;
use crate::codegen::{cancel_requested, SceneGenerator, ScenePlan};
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::paths::OutputLayout;
use crate::prompts::PromptLibrary;
use crate::renderer::{ManimRenderer, SceneRenderer};
use crate::scheduler::SceneScheduler;
use crate::script::ScriptGenerator;
use crate::subtitles::write_subtitles;
use crate::timing::build_timed_description;

/// Shared collaborators for every pipeline run in this process.
pub struct PipelineContext {
    pub config: WorkerConfig,
    pub llm: Arc<dyn CompletionService>,
    pub tts: Arc<dyn SpeechService>,
    pub renderer: Arc<dyn SceneRenderer>,
    pub mux: Arc<dyn MediaMux>,
    pub prompts: Arc<PromptLibrary>,
}

impl PipelineContext {
    /// Build a context with production collaborators.
    ///
    /// Missing external binaries are reported here, once, instead of on
    /// the first job that needs them.
    pub fn new(config: WorkerConfig) -> WorkerResult<Self> {
        if let Err(e) = magi_media::check_ffmpeg() {
            warn!("{e}; video assembly will fail");
        }
        if let Err(e) = magi_media::check_ffprobe() {
            warn!("{e}; audio durations will fall back to chunker estimates");
        }
        if which::which("manim").is_err() {
            warn!("manim not found in PATH; scene rendering will fail");
        }

        let prompts = Arc::new(PromptLibrary::load(&config)?);
        Ok(Self {
            llm: Arc::new(LlmClient::from_env()),
            tts: Arc::new(ElevenLabsClient::from_env()),
            renderer: Arc::new(ManimRenderer::new(config.render_timeout)),
            mux: Arc::new(FfmpegMux::new()),
            prompts,
            config,
        })
    }

    /// Run an explainer job to its terminal state.
    pub async fn run_explainer_job(
        &self,
        request: &GenerateVideoRequest,
        job_id: JobId,
        progress: &ProgressHandle,
        cancel: Option<&watch::Receiver<bool>>,
    ) {
        let params = JobParams {
            job_id,
            kind: JobKind::Explainer,
            subject: request.topic.clone(),
            level: SophisticationLevel::from_level(request.level).unwrap_or_default(),
            duration_minutes: request.duration,
            words_per_minute: request.wpm,
            dry_run: request.dry_run,
        };
        self.run_job(params, progress, cancel).await;
    }

    /// Run a solver job to its terminal state.
    pub async fn run_solver_job(
        &self,
        request: &SolveProblemRequest,
        job_id: JobId,
        progress: &ProgressHandle,
        cancel: Option<&watch::Receiver<bool>>,
    ) {
        let params = JobParams {
            job_id,
            kind: JobKind::Solver,
            subject: request.problem.clone(),
            level: SophisticationLevel::from_level(request.detail_level).unwrap_or_default(),
            duration_minutes: request.duration,
            words_per_minute: self.config.words_per_minute,
            dry_run: request.dry_run,
        };
        self.run_job(params, progress, cancel).await;
    }

    async fn run_job(
        &self,
        params: JobParams,
        progress: &ProgressHandle,
        cancel: Option<&watch::Receiver<bool>>,
    ) {
        let logger = JobLogger::new(params.job_id, "pipeline");
        let kind = params.kind.as_str();
        let started = Instant::now();
        metrics::record_job_started(kind);
        logger.log_start(&format!("{kind} video for \"{}\"", params.subject));

        match self.execute(&params, progress, cancel).await {
            Ok(artifacts) => {
                metrics::record_job_completed(kind);
                logger.log_completion(&format!(
                    "{}/{} scenes in {:.0}s",
                    artifacts.scenes_succeeded,
                    artifacts.scenes_total,
                    started.elapsed().as_secs_f64()
                ));
                progress.completed(
                    artifacts.video,
                    artifacts.subtitles,
                    artifacts.scenes_succeeded,
                    artifacts.scenes_total,
                );
            }
            Err(e) if e.is_cancelled() => {
                metrics::record_job_cancelled(kind);
                logger.log_warning("Job cancelled");
                progress.cancelled();
            }
            Err(e) => {
                metrics::record_job_failed(kind);
                logger.log_error(&e.to_string());
                progress.failed(e.to_string());
            }
        }
    }

    /// The pipeline phases. Cancellation is checked at every phase
    /// boundary; in-flight scene tasks additionally check it between
    /// their generate, render, and repair steps.
    async fn execute(
        &self,
        params: &JobParams,
        progress: &ProgressHandle,
        cancel: Option<&watch::Receiver<bool>>,
    ) -> WorkerResult<JobArtifacts> {
        progress.progress(0, "Initializing video generation...");
        progress.progress(5, "Generating script...");

        let script_generator = ScriptGenerator::new(
            self.llm.as_ref(),
            &self.prompts,
            params.words_per_minute,
        );
        let script = match params.kind {
            JobKind::Explainer => {
                script_generator
                    .explainer(&params.subject, params.duration_minutes, params.level)
                    .await?
            }
            JobKind::Solver => {
                script_generator
                    .solver(&params.subject, params.duration_minutes, params.level)
                    .await?
            }
        };
        let total = script.scene_count();
        progress.progress(15, format!("Script generated ({total} scenes)"));
        check_cancelled(cancel)?;

        // Output paths key off the script topic, which for solver jobs
        // carries the "Problem: " prefix.
        let layout = Arc::new(OutputLayout::new(&self.config.output_dir, &script.topic));
        layout.ensure_dirs().await?;
        save_script_transcript(&script, &layout).await;

        let chunker = SegmentChunker::new(params.words_per_minute);
        let scene_chunks: Vec<Vec<NarrationChunk>> = script
            .segments
            .iter()
            .map(|segment| chunker.chunk(&segment.narration, &segment.scene_description))
            .collect();

        let mut audio_results = Vec::new();
        for (scene_index, chunks) in scene_chunks.iter().enumerate() {
            check_cancelled(cancel)?;
            let pct = (15 + 10 * scene_index / total.max(1)) as u8;
            progress.progress(
                pct,
                format!("Generating audio for scene {}/{}...", scene_index + 1, total),
            );
            let results = generate_scene_audio(
                self.tts.as_ref(),
                scene_index,
                chunks,
                &layout,
                params.dry_run,
            )
            .await;
            audio_results.extend(results);
        }
        check_cancelled(cancel)?;

        progress.progress(25, format!("Rendering scenes (0/{total})..."));
        let plans: Vec<ScenePlan> = script
            .segments
            .iter()
            .zip(&scene_chunks)
            .enumerate()
            .map(|(scene_index, (segment, chunks))| {
                let manifest = TimingManifest::from_chunks(scene_index, chunks);
                let timed_spec = build_timed_description(&segment.scene_description, chunks);
                ScenePlan::new(manifest, timed_spec)
            })
            .collect();

        let scene_generator = SceneGenerator::new(
            Arc::clone(&self.llm),
            Arc::clone(&self.renderer),
            Arc::clone(&self.prompts),
            self.config.max_retries,
            self.config.strict_timing,
        );
        let results = SceneScheduler::new(self.config.max_workers)
            .render_all(&scene_generator, plans, &layout, cancel, Some(progress))
            .await;
        check_cancelled(cancel)?;

        let scenes_total = results.len() as u32;
        let scenes_succeeded = results.values().filter(|r| r.success).count() as u32;
        if scenes_succeeded == 0 {
            return Err(WorkerError::scene_generation(format!(
                "All {scenes_total} scenes failed to render"
            )));
        }
        if scenes_succeeded < scenes_total {
            warn!(
                scenes_succeeded,
                scenes_total, "Continuing with partial scene set"
            );
        }

        progress.progress(85, "Assembling final video...");
        let video = VideoAssembler::new(Arc::clone(&self.mux))
            .assemble(&results, &audio_results, &layout, params.job_id, cancel)
            .await
            .map_err(|e| match e {
                WorkerError::AssemblyFailed(_) => e,
                other if other.is_cancelled() => other,
                other => WorkerError::assembly_failed(other.to_string()),
            })?;

        progress.progress(95, "Writing subtitles...");
        let successful_chunks: Vec<&[NarrationChunk]> = results
            .values()
            .filter(|r| r.success)
            .map(|r| scene_chunks[r.scene_index].as_slice())
            .collect();
        let subtitle_path = layout.subtitles(params.job_id);
        let subtitles = match write_subtitles(successful_chunks, &subtitle_path).await {
            Ok(()) => Some(subtitle_path),
            Err(e) => {
                warn!("Could not write subtitles: {e}");
                None
            }
        };

        Ok(JobArtifacts {
            video,
            subtitles,
            scenes_succeeded,
            scenes_total,
        })
    }
}

/// Normalized parameters shared by both job kinds.
struct JobParams {
    job_id: JobId,
    kind: JobKind,
    /// Topic for explainers, problem statement for solvers
    subject: String,
    level: SophisticationLevel,
    duration_minutes: u32,
    words_per_minute: u32,
    dry_run: bool,
}

struct JobArtifacts {
    video: PathBuf,
    subtitles: Option<PathBuf>,
    scenes_succeeded: u32,
    scenes_total: u32,
}

fn check_cancelled(cancel: Option<&watch::Receiver<bool>>) -> WorkerResult<()> {
    if cancel_requested(cancel) {
        return Err(WorkerError::Cancelled);
    }
    Ok(())
}

/// Best-effort plain text transcript next to the generated artifacts.
async fn save_script_transcript(script: &Script, layout: &OutputLayout) {
    let mut text = format!("Topic: {}\n\n", script.topic);
    for (i, segment) in script.segments.iter().enumerate() {
        text.push_str(&format!(
            "Scene {}:\n{}\n\nVisuals: {}\n\n",
            i + 1,
            segment.narration,
            segment.scene_description
        ));
    }
    if let Err(e) = tokio::fs::write(layout.script_file(), text).await {
        warn!("Could not save script transcript: {e}");
    }
}
