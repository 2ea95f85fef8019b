use crate::error::Result;
use crate::traits::{Tool, ToolOutput, ToolSpec, decode_arguments};
use crate::weather::{WEATHER_TOOL_DESCRIPTION, WEATHER_TOOL_NAME, weather_parameters_schema};
use async_trait::async_trait;
use serde::Deserialize;

/// Canned weather report; never touches the network.
pub struct MockWeatherTool;

/// Looser than `WeatherArgs`: any unit string is echoed back unchanged.
#[derive(Debug, Deserialize)]
struct ReportArgs {
    city: String,
    state: String,
    unit: String,
}

impl MockWeatherTool {
    pub fn report(city: &str, state: &str, unit: &str) -> String {
        format!("The weather in {city}, {state} is 85 degrees {unit}. Partly cloudy, highs in the 90's.")
    }
}

#[async_trait]
impl Tool for MockWeatherTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: WEATHER_TOOL_NAME.to_string(),
            description: WEATHER_TOOL_DESCRIPTION.to_string(),
            parameters_schema: weather_parameters_schema(),
        }
    }

    #[tracing::instrument(level = "info", skip_all)]
    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput> {
        let args: ReportArgs = decode_arguments(WEATHER_TOOL_NAME, arguments)?;
        Ok(ToolOutput::Success(Self::report(
            &args.city,
            &args.state,
            &args.unit,
        )))
    }
}
