//! LLM completion transport
//!
//! One uniform contract for every provider: submit a prompt, receive text
//! or an error. Provider credentials and model selection come from the
//! per-job configuration threaded into the client, never from process-wide
//! state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::errors::{AppError, Result};

/// The completion collaborator contract: prompt in, text out, or error
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Supported completion providers.
///
/// OpenAI, DeepSeek, OpenRouter, and SiliconFlow all speak the
/// `chat/completions` shape and differ only in base URL; Anthropic and
/// Google carry their own request/response formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    DeepSeek,
    OpenRouter,
    SiliconFlow,
    Anthropic,
    Google,
}

impl Provider {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "openai" => Ok(Provider::OpenAi),
            "deepseek" => Ok(Provider::DeepSeek),
            "openrouter" => Ok(Provider::OpenRouter),
            "siliconflow" => Ok(Provider::SiliconFlow),
            "anthropic" => Ok(Provider::Anthropic),
            "google" => Ok(Provider::Google),
            other => Err(AppError::Configuration {
                message: format!("Unsupported completion provider: {}", other),
            }),
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::DeepSeek => "https://api.deepseek.com/v1",
            Provider::OpenRouter => "https://openrouter.ai/api/v1",
            Provider::SiliconFlow => "https://api.siliconflow.cn/v1",
            Provider::Anthropic => "https://api.anthropic.com/v1",
            Provider::Google => "https://generativelanguage.googleapis.com/v1",
        }
    }

    fn is_openai_compatible(&self) -> bool {
        matches!(
            self,
            Provider::OpenAi | Provider::DeepSeek | Provider::OpenRouter | Provider::SiliconFlow
        )
    }
}

// chat/completions wire types

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: usize,
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

// Anthropic wire types

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: usize,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    text: String,
}

// Google wire types

#[derive(Serialize)]
struct GoogleRequest {
    contents: Vec<GoogleContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GoogleGenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct GoogleContent {
    parts: Vec<GooglePart>,
}

#[derive(Serialize, Deserialize)]
struct GooglePart {
    text: String,
}

#[derive(Serialize)]
struct GoogleGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: usize,
}

#[derive(Deserialize)]
struct GoogleResponse {
    candidates: Vec<GoogleCandidate>,
}

#[derive(Deserialize)]
struct GoogleCandidate {
    content: GoogleContent,
}

/// HTTP-backed completion client
pub struct HttpCompletionClient {
    config: LlmConfig,
    provider: Provider,
    client: reqwest::Client,
}

impl HttpCompletionClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let provider = Provider::from_name(&config.provider)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self {
            config,
            provider,
            client,
        })
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
    }

    fn api_key(&self) -> Result<&str> {
        self.config.api_key.as_deref().ok_or_else(|| AppError::Configuration {
            message: "Completion API key is not configured".to_string(),
        })
    }

    async fn complete_openai_compatible(&self, prompt: &str) -> Result<String> {
        let endpoint = format!("{}/chat/completions", self.base_url());
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            stream: false,
        };

        let response = self
            .client
            .post(&endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key()?))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Completion {
                message: format!("Completion request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Completion {
                message: format!("Completion API error {}: {}", status, body),
            });
        }

        let chat: ChatResponse = response.json().await.map_err(|e| AppError::Completion {
            message: format!("Failed to parse completion response: {}", e),
        })?;

        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::Completion {
                message: "No content in completion response".to_string(),
            })
    }

    async fn complete_anthropic(&self, prompt: &str) -> Result<String> {
        let endpoint = format!("{}/messages", self.base_url());
        let request = AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(&endpoint)
            .header("x-api-key", self.api_key()?)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Completion {
                message: format!("Completion request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Completion {
                message: format!("Completion API error {}: {}", status, body),
            });
        }

        let parsed: AnthropicResponse = response.json().await.map_err(|e| AppError::Completion {
            message: format!("Failed to parse completion response: {}", e),
        })?;

        parsed
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| AppError::Completion {
                message: "No content in completion response".to_string(),
            })
    }

    async fn complete_google(&self, prompt: &str) -> Result<String> {
        let endpoint = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url(),
            self.config.model,
            self.api_key()?
        );
        let request = GoogleRequest {
            contents: vec![GoogleContent {
                parts: vec![GooglePart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GoogleGenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_tokens,
            },
        };

        let response = self
            .client
            .post(&endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Completion {
                message: format!("Completion request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Completion {
                message: format!("Completion API error {}: {}", status, body),
            });
        }

        let parsed: GoogleResponse = response.json().await.map_err(|e| AppError::Completion {
            message: format!("Failed to parse completion response: {}", e),
        })?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| AppError::Completion {
                message: "No content in completion response".to_string(),
            })
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        metrics::counter!("scribe_completion_requests_total").increment(1);
        let started = std::time::Instant::now();

        let result = if self.provider.is_openai_compatible() {
            self.complete_openai_compatible(prompt).await
        } else {
            match self.provider {
                Provider::Anthropic => self.complete_anthropic(prompt).await,
                Provider::Google => self.complete_google(prompt).await,
                _ => unreachable!("openai-compatible providers handled above"),
            }
        };

        metrics::histogram!("scribe_completion_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        if result.is_err() {
            metrics::counter!("scribe_completion_errors_total").increment(1);
        }
        result
    }
}
