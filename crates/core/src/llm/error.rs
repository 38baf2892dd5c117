use crate::llm::Provider;
use serde_json::Value;
use thiserror::Error;

/// Failure talking to, or decoding the output of, the language model.
///
/// Keeps the raw model output so callers can log or surface it.
#[derive(Debug, Clone, Error)]
#[error("LLM error (provider={provider:?}, stage={stage}): {detail}")]
pub struct LlmDiagnosticsError {
    pub provider: Provider,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
    pub raw_response_json: Option<Value>,
}

impl LlmDiagnosticsError {
    /// Transport-level failures (HTTP status, unreadable body) as opposed to
    /// output that could not be turned into an intent.
    pub fn is_transport(&self) -> bool {
        self.stage == "http"
    }
}
