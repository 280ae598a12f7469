use std::time::Duration;

use anyhow::{anyhow, Result};
use serde_json::Value;
use tracing::info;

/// Legal term definitions from an external dictionary service.
pub struct LegalDictionaryClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl LegalDictionaryClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub fn definition_url(&self, term: &str) -> String {
        format!(
            "{}/define/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(term)
        )
    }

    pub async fn define(&self, term: &str) -> Result<Value> {
        if !self.is_configured() {
            return Err(anyhow!("LEGAL_DICTIONARY_API_KEY is not configured"));
        }
        info!(term, "looking up legal definition");
        Ok(self
            .http
            .get(self.definition_url(term))
            .bearer_auth(&self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }
}
