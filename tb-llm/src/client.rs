use crate::error::{LlmError, Result};
use crate::openai::OpenAiClient;
use crate::types::{ChatMessage, ChatResponse, ModelInfo, SamplingParams, StreamChunk, ToolDefinition};
use futures_util::Stream;
use std::pin::Pin;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000/v1";

#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Resolved through `GET /models` when `None`.
    pub model: Option<String>,
    /// No request timeout when `None`.
    pub timeout: Option<Duration>,
    pub sampling: SamplingParams,
    pub stream_include_usage: bool,
}

impl Default for LlmClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: None,
            timeout: None,
            sampling: SamplingParams::default(),
            stream_include_usage: true,
        }
    }
}

#[derive(Clone)]
pub struct LlmClient {
    inner: OpenAiClient,
    model: String,
    sampling: SamplingParams,
    stream_include_usage: bool,
}

impl LlmClient {
    /// Builds the client and resolves the model id, asking the server when none is configured.
    #[tracing::instrument(level = "debug", skip_all, fields(base_url = %config.base_url))]
    pub async fn connect(config: LlmClientConfig) -> Result<Self> {
        let mut client = Self::new(&config)?;
        if client.model.is_empty() {
            let models = client.list_models().await?;
            let first = models.into_iter().next().ok_or(LlmError::NoModels)?;
            tracing::info!(model = %first.id, "resolved model from server");
            client.model = first.id;
        }
        Ok(client)
    }

    /// Builds the client without contacting the server. The model id stays empty unless
    /// configured, so only `list_models` is meaningful until one is set.
    pub fn new(config: &LlmClientConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(LlmError::Config("base_url must not be empty".to_string()));
        }
        // The completion endpoint is always reached directly, whatever HTTP(S)_PROXY says.
        let mut builder = reqwest::Client::builder().no_proxy();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| LlmError::Config(format!("http client build failed: {e}")))?;

        Ok(Self {
            inner: OpenAiClient::new(http, config.base_url.trim(), config.api_key.as_deref()),
            model: config
                .model
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
            sampling: config.sampling,
            stream_include_usage: config.stream_include_usage,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn sampling(&self) -> SamplingParams {
        self.sampling
    }

    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        self.inner.list_models().await
    }

    #[tracing::instrument(level = "info", skip_all, fields(model = %self.model))]
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatResponse> {
        self.inner
            .chat(&self.model, self.sampling, messages, tools)
            .await
    }

    #[tracing::instrument(level = "info", skip_all, fields(model = %self.model))]
    pub async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>> {
        self.inner
            .chat_stream(
                &self.model,
                self.sampling,
                messages,
                tools,
                self.stream_include_usage,
            )
            .await
    }
}

/// Tool names must match `^[a-zA-Z0-9_-]{1,64}$` on OpenAI-compatible servers.
pub fn validate_tool_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 64 {
        return Err(LlmError::Config(format!(
            "tool name {name:?} must be 1..=64 characters"
        )));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(LlmError::Config(format!(
            "tool name {name:?} contains invalid character {bad:?}"
        )));
    }
    Ok(())
}
