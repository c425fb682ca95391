pub mod dashboard;
pub mod drive;
pub mod error;
pub mod openai_api;
pub mod pipeline;
pub mod settings;
pub mod text_extract;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use crate::error::AppResult;
use crate::settings::{settings_path, AppConfig};

/// Load configuration and serve the dashboard until the process stops.
pub async fn run() -> AppResult<()> {
    log::info!("Settings file: {}", settings_path().display());
    let config = Arc::new(AppConfig::load()?);
    log::info!("Using model {} via {}", config.model, config.api_base_url);
    dashboard::serve(config).await
}
