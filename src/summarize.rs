//! Summarization service client
//!
//! Provides the [`Summarizer`] contract the interview controller invokes once
//! the question queue is exhausted, plus an HTTP implementation against a
//! hosted text-generation endpoint. The service receives a fixed instruction
//! prefix concatenated with the accumulated transcript and returns a
//! bullet-point summary; if the model echoes the prompt, the echo is stripped
//! before the summary is stored.

use crate::error::SummarizeError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument};
use zeroize::Zeroize;

/// Default text-generation endpoint
const DEFAULT_ENDPOINT: &str =
    "https://api-inference.huggingface.co/models/mistralai/Mixtral-8x7B-Instruct-v0.1";

/// Fixed instruction prefix for summary requests
pub const SUMMARY_PROMPT_PREFIX: &str = "Summarize the following conversation in bullet point \
     notes. MAKE SURE TO USE BULLET POINTS; THE TEXT STARTS HERE:";

/// External summarization collaborator
///
/// Resolves exactly once per invocation, success or failure. There is no
/// cancellation path; an abandoned request runs to completion.
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    /// Request a condensed summary of `body`, instructed by `prompt_prefix`
    async fn summarize(&self, prompt_prefix: &str, body: &str) -> Result<String, SummarizeError>;
}

/// Client for a hosted text-generation inference API
pub struct HfInferenceClient {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

/// Request body for the inference API
#[derive(Debug, Serialize)]
struct InferenceRequest {
    inputs: String,
}

/// One generation in the inference API response array
#[derive(Debug, Deserialize)]
struct Generation {
    generated_text: String,
}

impl HfInferenceClient {
    /// Create a client against the default endpoint
    pub fn new(api_key: &str) -> anyhow::Result<Self> {
        Self::with_endpoint(api_key, DEFAULT_ENDPOINT)
    }

    /// Create a client against an explicit endpoint URL
    pub fn with_endpoint(api_key: &str, endpoint: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client for HfInferenceClient")?;

        Ok(Self {
            api_key: api_key.to_string(),
            endpoint: endpoint.to_string(),
            client,
        })
    }

    /// Extract the summary text from the response, stripping a prompt echo
    fn extract_summary(generations: &[Generation], prompt: &str) -> Result<String, SummarizeError> {
        let generated = generations
            .first()
            .map(|g| g.generated_text.as_str())
            .ok_or_else(|| {
                SummarizeError::InvalidResponse("No generations in response".into())
            })?;

        let cleaned = generated.replace(prompt, "");
        let summary = cleaned.trim();
        if summary.is_empty() {
            return Err(SummarizeError::InvalidResponse(
                "Response contained no summary text".into(),
            ));
        }
        Ok(summary.to_string())
    }
}

#[async_trait::async_trait]
impl Summarizer for HfInferenceClient {
    #[instrument(skip(self, prompt_prefix, body), fields(body_len = body.len()))]
    async fn summarize(&self, prompt_prefix: &str, body: &str) -> Result<String, SummarizeError> {
        let prompt = format!("{}\n\n{}", prompt_prefix, body);
        let request_body = InferenceRequest {
            inputs: prompt.clone(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(SummarizeError::Network)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(SummarizeError::ServerError { status, message });
        }

        let generations: Vec<Generation> = response.json().await.map_err(|e| {
            SummarizeError::InvalidResponse(format!("Failed to parse response: {}", e))
        })?;

        let summary = Self::extract_summary(&generations, &prompt)?;
        info!(
            "Summarized transcript ({} -> {} chars)",
            body.len(),
            summary.len()
        );
        Ok(summary)
    }
}

impl Drop for HfInferenceClient {
    fn drop(&mut self) {
        // Clear API key from memory
        self.api_key.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = InferenceRequest {
            inputs: "Summarize this".to_string(),
        };
        let json = serde_json::to_string(&request).expect("Failed to serialize");
        assert_eq!(json, r#"{"inputs":"Summarize this"}"#);
    }

    #[test]
    fn test_response_deserialization() {
        let json = r#"[{"generated_text": "- patient stable\n- transfer at noon"}]"#;
        let generations: Vec<Generation> =
            serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(
            generations[0].generated_text,
            "- patient stable\n- transfer at noon"
        );
    }

    #[test]
    fn test_extract_strips_prompt_echo_and_trims() {
        let prompt = "Summarize: the text";
        let generations = vec![Generation {
            generated_text: format!("{}\n\n  - bullet one\n- bullet two  \n", prompt),
        }];
        let summary = HfInferenceClient::extract_summary(&generations, prompt).unwrap();
        assert_eq!(summary, "- bullet one\n- bullet two");
    }

    #[test]
    fn test_extract_rejects_empty_response() {
        let err = HfInferenceClient::extract_summary(&[], "prompt").unwrap_err();
        assert!(matches!(err, SummarizeError::InvalidResponse(_)));
    }

    #[test]
    fn test_extract_rejects_echo_only_response() {
        let prompt = "Summarize: the text";
        let generations = vec![Generation {
            generated_text: format!("{}  ", prompt),
        }];
        let err = HfInferenceClient::extract_summary(&generations, prompt).unwrap_err();
        assert!(matches!(err, SummarizeError::InvalidResponse(_)));
    }
}
