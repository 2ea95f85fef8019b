//! Shared argument schema for the `get_current_weather` tools.

use serde::Deserialize;
use std::fmt;

pub const WEATHER_TOOL_NAME: &str = "get_current_weather";
pub const WEATHER_TOOL_DESCRIPTION: &str = "Get the current weather in a given location";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Celsius => "celsius",
            Self::Fahrenheit => "fahrenheit",
        }
    }

    /// wttr.in unit switch: `m` for metric, `u` for USCS.
    pub fn wttr_param(self) -> &'static str {
        match self {
            Self::Celsius => "m",
            Self::Fahrenheit => "u",
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WeatherArgs {
    pub city: String,
    pub state: String,
    pub unit: TemperatureUnit,
}

pub fn weather_parameters_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "city": { "type": "string", "description": "City name" },
            "state": { "type": "string", "description": "State abbreviation" },
            "unit": {
                "type": "string",
                "description": "Temperature unit",
                "enum": ["celsius", "fahrenheit"]
            }
        },
        "required": ["city", "state", "unit"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_decode_from_model_payload() {
        let args: WeatherArgs = serde_json::from_str(
            r#"{"city": "Boston", "state": "MA", "unit": "celsius"}"#,
        )
        .expect("decode args");
        assert_eq!(
            args,
            WeatherArgs {
                city: "Boston".to_string(),
                state: "MA".to_string(),
                unit: TemperatureUnit::Celsius,
            }
        );
    }

    #[test]
    fn unknown_unit_is_rejected() {
        let err = serde_json::from_str::<WeatherArgs>(
            r#"{"city": "Boston", "state": "MA", "unit": "kelvin"}"#,
        )
        .expect_err("kelvin is not in the enum");
        assert!(err.to_string().contains("kelvin"));
    }

    #[test]
    fn unit_maps_to_wttr_switch() {
        assert_eq!(TemperatureUnit::Celsius.wttr_param(), "m");
        assert_eq!(TemperatureUnit::Fahrenheit.wttr_param(), "u");
    }

    #[test]
    fn schema_enum_matches_unit_variants() {
        let schema = weather_parameters_schema();
        let values: Vec<&str> = schema["properties"]["unit"]["enum"]
            .as_array()
            .expect("enum array")
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(
            values,
            vec![
                TemperatureUnit::Celsius.as_str(),
                TemperatureUnit::Fahrenheit.as_str()
            ]
        );
    }
}
