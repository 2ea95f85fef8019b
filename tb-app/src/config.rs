//! toolbench configuration loader.
//!
//! Layering: built-in defaults, then `~/.toolbench/config.toml` (or `--config`), then
//! `TOOLBENCH_*` environment variables, then command-line flags.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tb_llm::{LlmClientConfig, SamplingParams};
use tb_tools::WttrConfig;

pub const DEFAULT_PROMPT: &str = "What's the weather like in Boston today? Output a reasoning before act, then use the tools to help you.";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolbenchConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key")]
    pub api_key: Option<String>,
    /// Resolved from `GET /models` when unset.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Completion request timeout; unbounded when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_stream_include_usage")]
    pub stream_include_usage: bool,
}

fn default_base_url() -> String {
    tb_llm::DEFAULT_BASE_URL.to_string()
}

fn default_api_key() -> Option<String> {
    Some("None".to_string())
}

fn default_top_p() -> f64 {
    SamplingParams::default().top_p
}

fn default_max_tokens() -> u32 {
    SamplingParams::default().max_tokens
}

fn default_stream_include_usage() -> bool {
    true
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: default_api_key(),
            model: None,
            temperature: SamplingParams::default().temperature,
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
            timeout_secs: None,
            stream_include_usage: default_stream_include_usage(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// Maximum completion requests per run; 0 means unbounded.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
}

fn default_prompt() -> String {
    DEFAULT_PROMPT.to_string()
}

fn default_max_rounds() -> usize {
    16
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            max_rounds: default_max_rounds(),
        }
    }
}

impl RunConfig {
    pub fn round_limit(&self) -> Option<usize> {
        (self.max_rounds > 0).then_some(self.max_rounds)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub weather: WeatherConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_weather_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default = "default_weather_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_weather_endpoint() -> String {
    tb_tools::DEFAULT_WTTR_ENDPOINT.to_string()
}

fn default_weather_timeout_secs() -> u64 {
    tb_tools::DEFAULT_WTTR_TIMEOUT.as_secs()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            endpoint: default_weather_endpoint(),
            proxy: None,
            timeout_secs: default_weather_timeout_secs(),
        }
    }
}

impl ToolbenchConfig {
    /// Loads `path` when given (it must exist), otherwise the default path when present,
    /// otherwise built-in defaults. Environment overrides are applied and the result validated.
    pub async fn load(path: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut cfg = match path {
            Some(path) => Self::read(&path).await?,
            None => {
                let path = default_config_path();
                if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                    Self::read(&path).await?
                } else {
                    tracing::debug!(path = %path.display(), "no config file, using defaults");
                    Self::default()
                }
            }
        };

        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    async fn read(path: &Path) -> anyhow::Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| anyhow::anyhow!("read config {}: {e}", path.display()))?;
        let cfg: ToolbenchConfig = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("parse config {}: {e}", path.display()))?;
        tracing::debug!(path = %path.display(), "config file loaded");
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("TOOLBENCH_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = get("TOOLBENCH_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get("TOOLBENCH_MODEL") {
            self.llm.model = Some(v);
        }
        if let Some(v) = get("TOOLBENCH_WEATHER_ENDPOINT") {
            self.tools.weather.endpoint = v;
        }
        if let Some(v) = get("TOOLBENCH_WEATHER_PROXY") {
            self.tools.weather.proxy = Some(v);
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.llm.base_url.trim().is_empty() {
            return Err(anyhow::anyhow!("llm.base_url is required"));
        }
        if self.llm.max_tokens == 0 {
            return Err(anyhow::anyhow!("llm.max_tokens must be > 0"));
        }
        if !(self.llm.top_p > 0.0 && self.llm.top_p <= 1.0) {
            return Err(anyhow::anyhow!(
                "llm.top_p must be in (0, 1], got {}",
                self.llm.top_p
            ));
        }
        if self.llm.temperature < 0.0 {
            return Err(anyhow::anyhow!(
                "llm.temperature must be >= 0, got {}",
                self.llm.temperature
            ));
        }
        if self.llm.timeout_secs == Some(0) {
            return Err(anyhow::anyhow!(
                "llm.timeout_secs must be > 0 when set; omit it for no timeout"
            ));
        }
        if self.run.prompt.trim().is_empty() {
            return Err(anyhow::anyhow!("run.prompt must not be empty"));
        }
        if self.tools.weather.endpoint.trim().is_empty() {
            return Err(anyhow::anyhow!("tools.weather.endpoint is required"));
        }
        if self.tools.weather.timeout_secs == 0 {
            return Err(anyhow::anyhow!("tools.weather.timeout_secs must be > 0"));
        }
        Ok(())
    }

    pub fn llm_client_config(&self) -> LlmClientConfig {
        LlmClientConfig {
            base_url: self.llm.base_url.clone(),
            api_key: self.llm.api_key.clone(),
            model: self.llm.model.clone(),
            timeout: self.llm.timeout_secs.map(Duration::from_secs),
            sampling: SamplingParams {
                temperature: self.llm.temperature,
                top_p: self.llm.top_p,
                max_tokens: self.llm.max_tokens,
            },
            stream_include_usage: self.llm.stream_include_usage,
        }
    }

    pub fn wttr_config(&self) -> WttrConfig {
        WttrConfig {
            endpoint: self.tools.weather.endpoint.clone(),
            proxy: self.tools.weather.proxy.clone(),
            timeout: Duration::from_secs(self.tools.weather.timeout_secs),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".toolbench").join("config.toml")
}
