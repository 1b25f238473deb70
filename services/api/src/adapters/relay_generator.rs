//! services/api/src/adapters/relay_generator.rs
//!
//! This module contains the adapter for an HTTP generation endpoint that does the
//! model call on our behalf. It implements the `PromptGenerationService` port.

use async_trait::async_trait;
use promptsmith_core::ports::{GenerationFailure, PromptGenerationService};
use serde_json::{json, Value};
use tracing::debug;

/// An adapter that POSTs `{"input": ...}` to a relay and returns its JSON body.
#[derive(Clone, Debug)]
pub struct RelayGeneratorAdapter {
    client: reqwest::Client,
    url: String,
}

impl RelayGeneratorAdapter {
    /// Creates a new `RelayGeneratorAdapter`.
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }
}

/// Finds a human-readable message in an error body:
/// `{"error": "..."}`, `{"error": {"message": "..."}}`, or `{"message": "..."}`.
pub fn error_message(body: &Value) -> Option<String> {
    let candidates = [
        body.get("error"),
        body.get("error").and_then(|e| e.get("message")),
        body.get("message"),
    ];
    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|m| !m.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl PromptGenerationService for RelayGeneratorAdapter {
    async fn generate(&self, input: &str) -> Result<Value, GenerationFailure> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "input": input }))
            .send()
            .await
            .map_err(|e| GenerationFailure::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationFailure::Transport(e.to_string()))?;
        debug!("Relay answered {} with {} bytes.", status, body.len());

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| error_message(&v));
            return Err(GenerationFailure::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            GenerationFailure::Transport(format!("Relay returned a malformed body: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_shapes() {
        assert_eq!(
            error_message(&json!({ "error": "quota exceeded" })).as_deref(),
            Some("quota exceeded")
        );
        assert_eq!(
            error_message(&json!({ "error": { "message": "bad key" } })).as_deref(),
            Some("bad key")
        );
        assert_eq!(
            error_message(&json!({ "message": "try later" })).as_deref(),
            Some("try later")
        );
        assert_eq!(error_message(&json!({ "error": "  " })), None);
        assert_eq!(error_message(&json!([1])), None);
    }
}
