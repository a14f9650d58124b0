//! Chat-completions client for the pipeline stages.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ragpipe_shared::{LlmConfig, RagpipeError, Result};

/// User-Agent string for provider requests.
const USER_AGENT: &str = concat!("ragpipe/", env!("CARGO_PKG_VERSION"));

/// Seam for the model behind the pipeline stages.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Run one system+user exchange and return the assistant text.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// OpenAI-compatible client
// ---------------------------------------------------------------------------

/// Client for OpenAI-compatible chat-completions endpoints (Groq by default).
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiCompatClient {
    /// Build a client, reading the API key from the configured env var.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            RagpipeError::config(format!(
                "LLM API key not found. Set the {} environment variable.",
                config.api_key_env
            ))
        })?;
        Self::with_api_key(config, api_key)
    }

    /// Build a client with an explicit API key (tests, alternate key sources).
    pub fn with_api_key(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| RagpipeError::config(format!("failed to build LLM HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompatClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagpipeError::stage("completion", format!("provider call failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(RagpipeError::stage(
                "completion",
                format!("provider returned {status}: {text}"),
            ));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            RagpipeError::stage("completion", format!("malformed provider response: {e}"))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| RagpipeError::stage("completion", "provider returned no choices"))
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(base_url: &str) -> LlmConfig {
        LlmConfig {
            base_url: base_url.to_string(),
            ..LlmConfig::default()
        }
    }

    #[tokio::test]
    async fn complete_returns_first_choice_content() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/chat/completions"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(
                serde_json::json!({
                    "choices": [
                        {"message": {"role": "assistant", "content": "We open at nine."}}
                    ]
                }),
            ))
            .mount(&server)
            .await;

        let client =
            OpenAiCompatClient::with_api_key(&test_config(&server.uri()), "test-key").unwrap();
        let answer = client.complete("system", "user").await.unwrap();
        assert_eq!(answer, "We open at nine.");
    }

    #[tokio::test]
    async fn non_success_status_becomes_stage_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/chat/completions"))
            .respond_with(
                wiremock::ResponseTemplate::new(429).set_body_string("rate limit exceeded"),
            )
            .mount(&server)
            .await;

        let client =
            OpenAiCompatClient::with_api_key(&test_config(&server.uri()), "test-key").unwrap();
        let err = client.complete("system", "user").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("429"));
        assert!(message.contains("rate limit exceeded"));
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/chat/completions"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let client =
            OpenAiCompatClient::with_api_key(&test_config(&server.uri()), "test-key").unwrap();
        let err = client.complete("system", "user").await.unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }
}
