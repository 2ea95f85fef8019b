use crate::config::ToolbenchConfig;
use crate::driver::RequestMode;
use anyhow::Context;
use std::sync::Arc;
use tb_tools::{MockWeatherTool, Tool, ToolRegistry, WttrWeatherTool};

/// Which demo to run: request mode plus the weather tool behind `get_current_weather`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Buffered requests, in-process mock weather.
    Local,
    /// Streaming requests, wttr.in weather.
    Stream,
    /// Buffered requests, wttr.in weather.
    Live,
}

impl Variant {
    pub fn name(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Stream => "stream",
            Self::Live => "live",
        }
    }

    pub fn mode(self) -> RequestMode {
        match self {
            Self::Stream => RequestMode::Streaming,
            Self::Local | Self::Live => RequestMode::Buffered,
        }
    }

    pub fn build_registry(self, cfg: &ToolbenchConfig) -> anyhow::Result<ToolRegistry> {
        let tool: Arc<dyn Tool> = match self {
            Self::Local => Arc::new(MockWeatherTool),
            Self::Stream | Self::Live => {
                Arc::new(WttrWeatherTool::new(&cfg.wttr_config()).context("weather tool")?)
            }
        };
        let registry = ToolRegistry::new()
            .with(tool)
            .context("register weather tool")?;
        tracing::debug!(
            variant = self.name(),
            tools = ?registry.names().collect::<Vec<_>>(),
            "tool registry built"
        );
        Ok(registry)
    }
}
