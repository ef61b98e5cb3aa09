//! HTTP transports for the oracle.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{Oracle, OracleRequest};
use crate::error::{Error, Result};

/// Which wire protocol to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleProvider {
    /// Anthropic messages API.
    Anthropic,
    /// Any OpenAI-compatible chat-completions endpoint.
    OpenAi,
}

impl OracleProvider {
    fn default_base_url(&self) -> &'static str {
        match self {
            Self::Anthropic => "https://api.anthropic.com",
            Self::OpenAi => "https://api.openai.com",
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            Self::Anthropic => "claude-3-5-sonnet-20241022",
            Self::OpenAi => "gpt-4o",
        }
    }
}

impl std::fmt::Display for OracleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anthropic => write!(f, "anthropic"),
            Self::OpenAi => write!(f, "openai"),
        }
    }
}

/// Configuration for [`HttpOracle`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportConfig {
    pub provider: OracleProvider,
    #[serde(skip_serializing, default)]
    pub api_key: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl TransportConfig {
    pub fn new(provider: OracleProvider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            model: None,
            base_url: None,
            timeout_secs: 120,
            max_tokens: 4096,
            temperature: 0.2,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .map(|u| u.trim_end_matches('/'))
            .unwrap_or_else(|| self.provider.default_base_url())
    }
}

fn build_http_client(timeout_secs: u64) -> Result<Client> {
    let timeout = Duration::from_secs(timeout_secs);

    // Proxy auto-detection can panic in some sandboxes; retry without a proxy.
    match catch_unwind(AssertUnwindSafe(|| Client::builder().timeout(timeout).build())) {
        Ok(Ok(client)) => Ok(client),
        Ok(Err(_)) | Err(_) => Client::builder()
            .no_proxy()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e))),
    }
}

/// Oracle backed by a hosted LLM API.
pub struct HttpOracle {
    config: TransportConfig,
    http: Client,
}

impl HttpOracle {
    const ANTHROPIC_VERSION: &'static str = "2023-06-01";

    pub fn new(config: TransportConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::Config(format!("missing API key for {}", config.provider)));
        }
        let http = build_http_client(config.timeout_secs)?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    async fn post(&self, url: &str, request: reqwest::RequestBuilder) -> Result<String> {
        let response = request
            .header("content-type", "application/json")
            .send()
            .await
            .map_err(|e| Error::Oracle(format!("HTTP request to {} failed: {}", url, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Oracle(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("{}: {}", status, body));
            return Err(Error::oracle_api(self.config.provider.to_string(), message));
        }
        Ok(body)
    }

    async fn generate_anthropic(&self, request: &OracleRequest) -> Result<String> {
        let api_request = AnthropicRequest {
            model: self.config.model(),
            max_tokens: self.config.max_tokens,
            system: &request.system_instruction,
            temperature: self.config.temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.user_prompt,
            }],
        };
        let url = format!("{}/v1/messages", self.config.base_url());
        let builder = self
            .http
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", Self::ANTHROPIC_VERSION)
            .json(&api_request);
        let body = self.post(&url, builder).await?;

        let api_response: AnthropicResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Oracle(format!("Failed to parse response: {}", e)))?;
        Ok(api_response
            .content
            .into_iter()
            .filter_map(|c| c.text)
            .collect::<Vec<_>>()
            .join(""))
    }

    async fn generate_openai(&self, request: &OracleRequest) -> Result<String> {
        let api_request = OpenAiRequest {
            model: self.config.model(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_instruction,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
        };
        let url = format!("{}/v1/chat/completions", self.config.base_url());
        let builder = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&api_request);
        let body = self.post(&url, builder).await?;

        let api_response: OpenAiResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Oracle(format!("Failed to parse response: {}", e)))?;
        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Oracle("No choices in response".to_string()))
    }
}

#[async_trait]
impl Oracle for HttpOracle {
    #[instrument(skip(self, request), fields(provider = %self.config.provider))]
    async fn generate(&self, request: &OracleRequest) -> Result<String> {
        let text = match self.config.provider {
            OracleProvider::Anthropic => self.generate_anthropic(request).await?,
            OracleProvider::OpenAi => self.generate_openai(request).await?,
        };
        if text.trim().is_empty() {
            return Err(Error::Oracle("empty response".to_string()));
        }
        debug!("Oracle returned {} chars", text.len());
        Ok(text)
    }

    fn name(&self) -> String {
        format!("{}:{}", self.config.provider, self.config.model())
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    temperature: f64,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

/// Error envelope shared by both providers.
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}
