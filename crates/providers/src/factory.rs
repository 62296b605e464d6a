use std::sync::Arc;
use std::time::Duration;

use orb_core::{Config, Error, Result};
use tracing::info;

use crate::{GeminiProvider, Provider};

/// Text-generation provider from config. Errors when no API key is configured.
pub fn create_provider(config: &Config) -> Result<Arc<dyn Provider>> {
    let api_key = config
        .gemini_api_key()
        .ok_or_else(|| Error::Config("GEMINI_API_KEY not configured".to_string()))?;

    let gemini = &config.providers.gemini;
    info!(model = %gemini.model, "Creating Gemini provider");
    Ok(Arc::new(GeminiProvider::with_options(
        api_key,
        gemini.api_base.as_deref(),
        &gemini.model,
        gemini.proxy.as_deref(),
        Duration::from_secs(gemini.timeout_secs),
    )))
}
