//! Application state.

use std::sync::Arc;

use magi_jobs::JobRegistry;
use magi_worker::{PipelineContext, WorkerConfig, WorkerResult};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub registry: JobRegistry,
    pub pipeline: Arc<PipelineContext>,
}

impl AppState {
    /// Create application state with production pipeline collaborators.
    pub fn new(config: ApiConfig) -> WorkerResult<Self> {
        let pipeline = PipelineContext::new(WorkerConfig::from_env())?;
        Ok(Self {
            config,
            registry: JobRegistry::new(),
            pipeline: Arc::new(pipeline),
        })
    }
}
