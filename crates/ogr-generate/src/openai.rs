//! Chat-completions backend.
//!
//! Talks to any OpenAI-compatible chat-completions endpoint. Transport
//! failures retry with exponential backoff up to a bounded attempt count;
//! non-success statuses and empty choice lists surface as distinct errors
//! so the caller can fall back to the offline backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::GeneratorError;
use crate::generator::{GenerateRequest, Generator};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const API_KEY_VAR: &str = "OPENAI_API_KEY";

const SYSTEM_PROMPT: &str = "You are an ontology engineer who drafts OWL 2 DL axioms using \
Turtle syntax. Emit only syntactically valid Turtle with the requested base prefix.";

/// Configuration for the chat-completions backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Base URL, e.g. "https://api.openai.com/v1"
    pub endpoint: String,
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: f64,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum retries on transport errors
    pub max_retries: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            timeout_secs: 120,
            max_retries: 3,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f64,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

/// Remote chat-completions generator.
pub struct OpenAiGenerator {
    config: OpenAiConfig,
    api_key: String,
    client: Client,
}

impl OpenAiGenerator {
    /// Build a client; the API key comes from `OPENAI_API_KEY`.
    pub fn new(config: OpenAiConfig) -> Result<Self, GeneratorError> {
        let api_key = std::env::var(API_KEY_VAR)
            .map_err(|_| GeneratorError::MissingCredential(API_KEY_VAR))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    async fn try_request(&self, prompt: &str) -> Result<String, GeneratorError> {
        let body = ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };
        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.endpoint))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Backend {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(GeneratorError::MalformedResponse(
                "no choices in completion".to_string(),
            ));
        }
        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, request: GenerateRequest) -> Result<String, GeneratorError> {
        let mut last: Option<GeneratorError> = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(2u64.pow(attempt - 1));
                tokio::time::sleep(delay).await;
            }
            match self.try_request(&request.prompt).await {
                Ok(content) => return Ok(content),
                // backend rejections are not transient; fail immediately
                Err(err @ (GeneratorError::Backend { .. } | GeneratorError::MalformedResponse(_))) => {
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max = self.config.max_retries + 1,
                        error = %err,
                        "completion request failed, retrying"
                    );
                    last = Some(err);
                }
            }
        }
        Err(GeneratorError::RetriesExhausted {
            attempts: self.config.max_retries + 1,
            last: last.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
