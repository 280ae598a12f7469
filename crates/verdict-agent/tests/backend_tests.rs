// LLM backends against endpoints that cannot answer: failures surface as
// errors (or ERROR assessments) and credentials stay out of the logs.

use async_trait::async_trait;
use tracing_test::traced_test;
use verdict_agent::analysis::{analyze_case, assess_validity};
use verdict_agent::ollama::OllamaBackend;
use verdict_agent::perplexity::PerplexityBackend;
use verdict_core::flowchart::Validity;
use verdict_core::llm::LlmBackend;

const SECRET: &str = "pplx-test-secret-0000";

// Nothing listens on the discard port.
const DEAD_URL: &str = "http://127.0.0.1:9";

// ── helpers ──────────────────────────────────────────────────────────────

struct Canned(&'static str);

#[async_trait]
impl LlmBackend for Canned {
    fn name(&self) -> &str {
        "canned"
    }

    async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
        Ok(self.0.to_string())
    }
}

// =============================================================================
// Unreachable endpoints
// =============================================================================

#[tokio::test]
#[traced_test]
async fn test_perplexity_failure_does_not_log_key() {
    let backend = PerplexityBackend::new(DEAD_URL, "sonar", SECRET).with_timeout(2);
    let err = backend.complete("Is this valid?").await.unwrap_err();
    assert!(!err.to_string().contains(SECRET));
    assert!(logs_contain("calling chat completions API"));
    assert!(!logs_contain(SECRET));
    assert!(!format!("{backend:?}").contains(SECRET));
}

#[tokio::test]
async fn test_perplexity_without_key_fails_fast() {
    let backend = PerplexityBackend::new(DEAD_URL, "sonar", "");
    let err = backend.complete("hello").await.unwrap_err();
    assert!(err.to_string().contains("not configured"));
}

#[tokio::test]
async fn test_ollama_failure_is_an_error() {
    let backend = OllamaBackend::new(DEAD_URL, "llama3.1").with_timeout(2);
    assert!(backend.complete("hello").await.is_err());
}

#[tokio::test]
async fn test_failed_assessment_reports_error() {
    let backend = OllamaBackend::new(DEAD_URL, "llama3.1").with_timeout(2);
    let a = assess_validity(&backend, "Landlord kept the deposit.").await;
    assert_eq!(a.validity, Validity::Error);
    assert!(a.reasoning.starts_with("An error occurred:"));
}

// =============================================================================
// Pass-through of replies
// =============================================================================

#[tokio::test]
async fn test_assessment_reads_canned_reply() {
    let backend = Canned("Validity: VALID\nReasoning: Clear breach of contract.");
    let a = assess_validity(&backend, "Supplier never delivered.").await;
    assert_eq!(a.validity, Validity::Valid);
    assert_eq!(a.reasoning, "Clear breach of contract.");
}

#[tokio::test]
async fn test_analysis_returns_json_when_reply_is_json() {
    let backend = Canned(r#"{"preliminary_judgment": "Likely for plaintiff"}"#);
    let v = analyze_case(&backend, &serde_json::json!({"facts": "x"})).await.unwrap();
    assert_eq!(v["preliminary_judgment"], "Likely for plaintiff");
}

#[tokio::test]
async fn test_analysis_returns_text_when_reply_is_prose() {
    let backend = Canned("The case is weak.");
    let v = analyze_case(&backend, &serde_json::json!({})).await.unwrap();
    assert_eq!(v, serde_json::Value::String("The case is weak.".into()));
}
