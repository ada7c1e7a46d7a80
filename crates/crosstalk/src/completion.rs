//! **Completion**: Continue the dialog text with a text-completion model.
//!
//! The controller hands over the encoded transcript; the model writes the next
//! turn. Stop sequences end generation before the model starts speaking for
//! the human.

use crate::codec;
use crate::config::CompletionConfig;
use crate::error::{CrosstalkError, CrosstalkResult};
use crate::word::Transcript;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Instruction placed before the dialog text.
pub const PROMPT_PREAMBLE: &str =
    "Complete the dialog, sometimes the user isn't done speaking so please anticipate that. ";

/// What the controller asks the model for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub stop: Vec<String>,
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Prompt for continuing `transcript`.
    pub fn for_transcript(transcript: &Transcript, max_tokens: u32) -> Self {
        Self {
            prompt: format!("{}\n{}", PROMPT_PREAMBLE, codec::encode(transcript)),
            stop: codec::stop_sequences(),
            max_tokens,
        }
    }
}

/// Backend that continues dialog text. Implement for any completion API.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Return the raw continuation text (may begin with a speaker tag).
    async fn complete(&self, request: &CompletionRequest) -> CrosstalkResult<String>;
}

/// Placeholder completion: always returns the same text. Use for wiring tests.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderCompletion {
    pub response: String,
}

impl PlaceholderCompletion {
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[async_trait]
impl CompletionModel for PlaceholderCompletion {
    async fn complete(&self, _request: &CompletionRequest) -> CrosstalkResult<String> {
        Ok(self.response.clone())
    }
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stop: &'a [String],
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    text: String,
}

/// Production completion backend: OpenAI-compatible `/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompletion {
    /// Base URL without trailing slash (e.g. https://api.openai.com/v1).
    pub base_url: String,
    api_key: String,
    pub model: String,
    client: reqwest::Client,
}

impl OpenAiCompletion {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> CrosstalkResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }

    /// Build from the completion section of the configuration. Requires an API key.
    pub fn from_config(config: &CompletionConfig) -> CrosstalkResult<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| CrosstalkError::Config("completion requires an api_key".to_string()))?;
        Self::new(
            config.api_url.clone(),
            api_key,
            config.model.clone(),
            Duration::from_millis(config.timeout_ms),
        )
    }
}

#[async_trait]
impl CompletionModel for OpenAiCompletion {
    async fn complete(&self, request: &CompletionRequest) -> CrosstalkResult<String> {
        let url = format!("{}/completions", self.base_url.trim_end_matches('/'));
        let body = CompletionBody {
            model: &self.model,
            prompt: &request.prompt,
            stop: &request.stop,
            max_tokens: request.max_tokens,
        };

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CrosstalkError::Transport(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(CrosstalkError::Completion(format!(
                "completion API error {}: {}",
                status, body
            )));
        }

        let parsed: CompletionResponse = res
            .json()
            .await
            .map_err(|e| CrosstalkError::Completion(format!("response parse failed: {}", e)))?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| CrosstalkError::Completion("no choices returned".to_string()))?;
        debug!("Completion: {} chars", text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::word::SpeakerId;

    #[test]
    fn request_carries_preamble_dialog_and_stops() {
        let t = Transcript::from_text("table for two", SpeakerId::Human);
        let req = CompletionRequest::for_transcript(&t, 100);
        assert!(req.prompt.starts_with(PROMPT_PREAMBLE));
        assert!(req.prompt.ends_with("\nSpeaker1: table for two"));
        assert_eq!(req.stop, vec!["\nSpeaker1:", "\nSpeaker2:"]);
        assert_eq!(req.max_tokens, 100);
    }

    #[tokio::test]
    async fn placeholder_returns_fixed_text() {
        let model = PlaceholderCompletion::with_response("Speaker0: Sure.");
        let req = CompletionRequest::for_transcript(&Transcript::new(), 10);
        assert_eq!(model.complete(&req).await.unwrap(), "Speaker0: Sure.");
    }

    #[test]
    fn from_config_requires_key() {
        let config = CompletionConfig::default();
        assert!(matches!(
            OpenAiCompletion::from_config(&config),
            Err(CrosstalkError::Config(_))
        ));
    }
}
