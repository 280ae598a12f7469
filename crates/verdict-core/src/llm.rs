use anyhow::Result;
use async_trait::async_trait;

/// A hosted or local chat model. One prompt in, the model's text out.
///
/// No retries: a failed call is returned to the caller as-is.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String>;
}
