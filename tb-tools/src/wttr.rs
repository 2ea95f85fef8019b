use crate::error::{Result, ToolError};
use crate::traits::{Tool, ToolOutput, ToolSpec, decode_arguments};
use crate::weather::{
    WEATHER_TOOL_DESCRIPTION, WEATHER_TOOL_NAME, WeatherArgs, weather_parameters_schema,
};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use std::time::{Duration, Instant};

pub const DEFAULT_WTTR_ENDPOINT: &str = "https://wttr.in";
pub const DEFAULT_WTTR_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct WttrConfig {
    pub endpoint: String,
    /// Forward proxy for every request. Without one the tool connects directly and ignores
    /// proxy environment variables.
    pub proxy: Option<String>,
    pub timeout: Duration,
}

impl Default for WttrConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_WTTR_ENDPOINT.to_string(),
            proxy: None,
            timeout: DEFAULT_WTTR_TIMEOUT,
        }
    }
}

/// Live weather from wttr.in's one-line text format (`?format=3`).
pub struct WttrWeatherTool {
    http: reqwest::Client,
    endpoint: Url,
}

impl WttrWeatherTool {
    pub fn new(config: &WttrConfig) -> Result<Self> {
        let endpoint = Url::parse(config.endpoint.trim()).map_err(|e| {
            ToolError::Config(format!("invalid weather endpoint {:?}: {e}", config.endpoint))
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(ToolError::Config(format!(
                "weather endpoint {endpoint} cannot carry a path"
            )));
        }

        let mut builder = reqwest::Client::builder().timeout(config.timeout);
        builder = match config.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(proxy) => builder.proxy(
                reqwest::Proxy::all(proxy)
                    .map_err(|e| ToolError::Config(format!("invalid proxy {proxy:?}: {e}")))?,
            ),
            None => builder.no_proxy(),
        };
        let http = builder
            .build()
            .map_err(|e| ToolError::Config(format!("http client build failed: {e}")))?;

        Ok(Self { http, endpoint })
    }

    /// `{endpoint}/{city}?format=3&{m|u}`
    pub fn request_url(&self, args: &WeatherArgs) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&args.city);
        }
        url.set_query(Some(&format!("format=3&{}", args.unit.wttr_param())));
        url
    }
}

#[async_trait]
impl Tool for WttrWeatherTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: WEATHER_TOOL_NAME.to_string(),
            description: WEATHER_TOOL_DESCRIPTION.to_string(),
            parameters_schema: weather_parameters_schema(),
        }
    }

    #[tracing::instrument(level = "info", skip_all)]
    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput> {
        let args: WeatherArgs = decode_arguments(WEATHER_TOOL_NAME, arguments)?;
        let url = self.request_url(&args);

        let started = Instant::now();
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            tracing::warn!(
                %url,
                status = status.as_u16(),
                latency_ms = started.elapsed().as_millis() as u64,
                "weather endpoint returned non-success status"
            );
            return Ok(ToolOutput::Failure(format!(
                "Failed to fetch weather (status {})",
                status.as_u16()
            )));
        }

        let body = response.text().await?;
        let elapsed = started.elapsed();
        tracing::debug!(
            %url,
            latency_ms = elapsed.as_millis() as u64,
            body_len = body.len(),
            "weather endpoint answered"
        );
        Ok(ToolOutput::Success(format!(
            "{}  (API call took {:.3}s)",
            body.trim(),
            elapsed.as_secs_f64()
        )))
    }
}
