//! Local tools the conversation driver can run on the model's behalf.

mod error;
mod mock_weather;
mod registry;
mod traits;
mod weather;
mod wttr;

pub use error::{Result, ToolError};
pub use mock_weather::MockWeatherTool;
pub use registry::ToolRegistry;
pub use traits::{Tool, ToolOutput, ToolSpec, to_llm_tool_def};
pub use weather::{
    TemperatureUnit, WEATHER_TOOL_DESCRIPTION, WEATHER_TOOL_NAME, WeatherArgs,
    weather_parameters_schema,
};
pub use wttr::{DEFAULT_WTTR_ENDPOINT, DEFAULT_WTTR_TIMEOUT, WttrConfig, WttrWeatherTool};
