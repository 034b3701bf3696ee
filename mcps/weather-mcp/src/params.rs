//! Parameter types for Weather MCP tools

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct QueryWeatherParams {
    #[schemars(description = "City name in English (e.g. Beijing, Tokyo, Paris, New York)")]
    pub city: String,

    #[schemars(description = "Temperature units: 'metric' for Celsius (default) or 'imperial' for Fahrenheit")]
    pub units: Option<String>,

    #[schemars(description = "Language code for the weather description (default 'en')")]
    pub lang: Option<String>,
}
