use std::sync::Arc;

use crate::config::Config;
use progress_service::ProgressService;
use progress_store::{InMemoryProgressStore, ProgressStore};

pub struct AppState {
    pub config: Config,
    pub progress: ProgressService,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::with_store(config, Arc::new(InMemoryProgressStore::new()))
    }

    /// Builds the state around an existing store, e.g. a durable backend.
    pub fn with_store(config: Config, store: Arc<dyn ProgressStore>) -> Self {
        tracing::info!(
            "Progress service ready (threshold scale: {})",
            config.threshold_scale
        );
        let progress = ProgressService::new(store, config.threshold_scale);
        Self { config, progress }
    }
}

pub mod mastery;
pub mod progress_service;
pub mod progress_store;
pub mod question_selector;
