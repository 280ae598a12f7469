pub mod analysis;
pub mod dictionary;
pub mod ollama;
pub mod perplexity;
pub mod prompt;

use std::sync::Arc;

use anyhow::{bail, Result};
use verdict_core::config::Config;
use verdict_core::llm::LlmBackend;

/// Backend selected by `LLM_BACKEND`.
pub fn backend_from_config(config: &Config) -> Result<Arc<dyn LlmBackend>> {
    match config.llm_backend.as_str() {
        "perplexity" => Ok(Arc::new(
            perplexity::PerplexityBackend::new(
                &config.perplexity_base_url,
                &config.perplexity_model,
                &config.perplexity_api_key,
            )
            .with_timeout(config.llm_timeout_s),
        )),
        "ollama" => Ok(Arc::new(
            ollama::OllamaBackend::new(&config.ollama_base_url, &config.ollama_model)
                .with_timeout(config.llm_timeout_s),
        )),
        other => bail!("unknown LLM_BACKEND {other:?} (expected perplexity or ollama)"),
    }
}
