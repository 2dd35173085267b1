//! Application state.

use filehub_core::config::AppConfig;
use filehub_registry::FileService;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Registry and engines.
    pub files: Arc<FileService>,
}

impl AppState {
    pub fn new(config: AppConfig, files: FileService) -> Self {
        Self {
            config: Arc::new(config),
            files: Arc::new(files),
        }
    }
}
