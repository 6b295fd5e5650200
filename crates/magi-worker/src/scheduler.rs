//! Bounded-concurrency scene rendering.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use magi_jobs::ProgressHandle;
use magi_models::SceneRenderResult;
use tokio::sync::{watch, Semaphore};
use tracing::{info, warn};

use crate::codegen::{SceneGenerator, ScenePlan};
use crate::paths::OutputLayout;

/// Fans scene plans out over a bounded worker pool.
pub struct SceneScheduler {
    max_workers: usize,
}

impl SceneScheduler {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    /// Render every scene with at most `max_workers` in flight.
    ///
    /// Returns one result per plan, keyed by scene index. A panicked
    /// scene task folds into a failed result for its index, so the map
    /// always holds exactly one entry per input plan and iterating it
    /// yields scenes in ascending playback order.
    pub async fn render_all(
        &self,
        generator: &SceneGenerator,
        plans: Vec<ScenePlan>,
        layout: &Arc<OutputLayout>,
        cancel: Option<&watch::Receiver<bool>>,
        progress: Option<&ProgressHandle>,
    ) -> BTreeMap<usize, SceneRenderResult> {
        let total = plans.len();
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let done = Arc::new(AtomicUsize::new(0));

        info!(
            total,
            max_workers = self.max_workers,
            "Scheduling scene renders"
        );

        let mut handles = Vec::with_capacity(total);
        for plan in plans {
            let scene_index = plan.scene_index();
            let generator = generator.clone();
            let layout = Arc::clone(layout);
            let semaphore = Arc::clone(&semaphore);
            let done = Arc::clone(&done);
            let cancel = cancel.cloned();
            let progress = progress.cloned();

            let handle = tokio::spawn(async move {
                let Ok(permit) = semaphore.acquire_owned().await else {
                    return SceneRenderResult::failed(scene_index, "scheduler shut down", 0);
                };
                let _permit = permit;

                let result = generator.process(&plan, &layout, cancel.as_ref()).await;

                let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(progress) = &progress {
                    let pct = (25 + 60 * finished / total) as u8;
                    progress.progress(pct, format!("Rendering scenes ({finished}/{total})..."));
                }
                result
            });
            handles.push((scene_index, handle));
        }

        let mut results = BTreeMap::new();
        for (scene_index, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    warn!(scene_index, "Scene task aborted: {e}");
                    SceneRenderResult::failed(
                        scene_index,
                        format!("scene task aborted: {e}"),
                        0,
                    )
                }
            };
            results.insert(scene_index, result);
        }
        results
    }
}
