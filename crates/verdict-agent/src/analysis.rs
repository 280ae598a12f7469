//! Case analysis and validity assessment over an [`LlmBackend`].
//!
//! Both are pass-throughs: the model's reply is handed back with as little
//! interpretation as possible.

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use verdict_core::flowchart::Validity;
use verdict_core::llm::LlmBackend;

use crate::prompt::{analysis_prompt, validity_prompt};

pub const UNDETERMINED_REASONING: &str = "Unable to determine validity.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assessment {
    pub validity: Validity,
    pub reasoning: String,
}

/// Remove a surrounding markdown code fence, if any.
pub fn strip_fences(text: &str) -> &str {
    let t = text.trim();
    if !t.starts_with("```") {
        return t;
    }
    let nl = match t.find('\n') {
        Some(i) => i,
        None => return t,
    };
    let inner = &t[nl + 1..];
    match inner.strip_suffix("```") {
        Some(body) => body.trim_end(),
        None => inner.trim_end(),
    }
}

/// The reply as JSON when it parses as JSON, otherwise as a JSON string.
pub fn content_to_value(content: String) -> Value {
    match serde_json::from_str::<Value>(strip_fences(&content)) {
        Ok(v) => v,
        Err(_) => Value::String(content),
    }
}

/// Read `Validity:` and `Reasoning:` out of a reply. Anything unexpected
/// leaves the case `INVALID` with a stock reasoning.
pub fn parse_assessment(content: &str) -> Assessment {
    let validity = if content.contains("Validity: VALID") {
        Validity::Valid
    } else {
        Validity::Invalid
    };
    let reasoning = match content.find("Reasoning:") {
        Some(i) => content[i + "Reasoning:".len()..].trim().to_string(),
        None => UNDETERMINED_REASONING.to_string(),
    };
    Assessment {
        validity,
        reasoning,
    }
}

pub async fn analyze_case(backend: &dyn LlmBackend, case_data: &Value) -> Result<Value> {
    let content = backend.complete(&analysis_prompt(case_data)).await?;
    let value = content_to_value(content);
    info!(
        backend = backend.name(),
        structured = !value.is_string(),
        "case analysis complete"
    );
    Ok(value)
}

/// Ask the model whether a case looks valid. A failed call is reported as
/// `ERROR` with the failure as the reasoning.
pub async fn assess_validity(backend: &dyn LlmBackend, description: &str) -> Assessment {
    match backend.complete(&validity_prompt(description)).await {
        Ok(content) => {
            let assessment = parse_assessment(&content);
            info!(backend = backend.name(), validity = %assessment.validity, "validity assessed");
            assessment
        }
        Err(e) => {
            warn!(backend = backend.name(), "validity assessment failed: {e:#}");
            Assessment {
                validity: Validity::Error,
                reasoning: format!("An error occurred: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_reply_is_parsed() {
        let a = parse_assessment("Validity: VALID\nReasoning:  The contract was breached.  ");
        assert_eq!(a.validity, Validity::Valid);
        assert_eq!(a.reasoning, "The contract was breached.");
    }

    #[test]
    fn defaults_when_format_is_ignored() {
        let a = parse_assessment("I think it might be fine.");
        assert_eq!(a.validity, Validity::Invalid);
        assert_eq!(a.reasoning, UNDETERMINED_REASONING);
    }

    #[test]
    fn invalid_does_not_match_valid() {
        let a = parse_assessment("Validity: INVALID\nReasoning: No standing.");
        assert_eq!(a.validity, Validity::Invalid);
        assert_eq!(a.reasoning, "No standing.");
    }

    #[test]
    fn json_replies_are_structured() {
        let v = content_to_value("```json\n{\"confidence_level\": \"Low\"}\n```".into());
        assert_eq!(v["confidence_level"], "Low");
    }

    #[test]
    fn prose_replies_stay_text() {
        let v = content_to_value("Not JSON at all".into());
        assert_eq!(v, Value::String("Not JSON at all".into()));
    }

    #[test]
    fn strip_fences_handles_unclosed_fence() {
        assert_eq!(strip_fences("```\n{}"), "{}");
        assert_eq!(strip_fences("  plain  "), "plain");
    }
}
