//! Weather lookup handler
//!
//! Failures the model can act on (bad city, missing key, upstream errors)
//! come back as readable text rather than protocol errors.

use mcp_common::{text_success, CallToolResult, McpError};

use crate::params::QueryWeatherParams;
use crate::types::WeatherResponse;

const DEFAULT_API_BASE: &str = "https://api.openweathermap.org/data/2.5/weather";

pub async fn query_weather(
    http: &reqwest::Client,
    params: QueryWeatherParams,
) -> Result<CallToolResult, McpError> {
    let api_key = match std::env::var("OPENWEATHER_API_KEY") {
        Ok(key) if !key.is_empty() => key,
        _ => {
            return Ok(text_success(
                "OPENWEATHER_API_KEY is not set; weather lookups are disabled",
            ))
        }
    };

    let base_url =
        std::env::var("OPENWEATHER_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
    let units = params.units.as_deref().unwrap_or("metric");
    let lang = params.lang.as_deref().unwrap_or("en");

    tracing::debug!(city = %params.city, units, "querying weather");

    let response = match http
        .get(&base_url)
        .query(&[
            ("q", params.city.as_str()),
            ("appid", api_key.as_str()),
            ("units", units),
            ("lang", lang),
        ])
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => return Ok(text_success(format!("Weather request failed: {}", e))),
    };

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Ok(text_success(format!(
            "Weather lookup failed ({}): {}. Check that the city name is in English.",
            status, body
        )));
    }

    match response.json::<WeatherResponse>().await {
        Ok(data) => Ok(text_success(format_report(&data, units))),
        Err(e) => Ok(text_success(format!(
            "Could not parse weather response: {}",
            e
        ))),
    }
}

fn format_report(data: &WeatherResponse, units: &str) -> String {
    let unit_symbol = if units == "imperial" { "°F" } else { "°C" };
    let description = data
        .weather
        .first()
        .map(|w| w.description.as_str())
        .unwrap_or("unknown");
    let location = match &data.sys.country {
        Some(country) => format!("{}, {}", data.name, country),
        None => data.name.clone(),
    };
    let visibility = data
        .visibility
        .map(|v| format!("{} m", v))
        .unwrap_or_else(|| "n/a".to_string());

    format!(
        "Weather for {}\n\
         Conditions: {}\n\
         Temperature: {:.1}{} (feels like {:.1}{})\n\
         Humidity: {}%\n\
         Wind: {} m/s\n\
         Pressure: {} hPa\n\
         Visibility: {}",
        location,
        description,
        data.main.temp,
        unit_symbol,
        data.main.feels_like,
        unit_symbol,
        data.main.humidity,
        data.wind.speed,
        data.main.pressure,
        visibility,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_includes_the_essentials() {
        let data: WeatherResponse = serde_json::from_str(
            r#"{
                "name": "Tokyo",
                "sys": {"country": "JP"},
                "main": {"temp": 21.5, "feels_like": 22.0, "humidity": 60, "pressure": 1013},
                "weather": [{"description": "scattered clouds"}],
                "wind": {"speed": 3.2},
                "visibility": 10000
            }"#,
        )
        .unwrap();

        let report = format_report(&data, "metric");
        assert!(report.contains("Tokyo, JP"));
        assert!(report.contains("scattered clouds"));
        assert!(report.contains("21.5°C"));
        assert!(report.contains("10000 m"));
    }

    #[test]
    fn report_tolerates_missing_optionals() {
        let data: WeatherResponse = serde_json::from_str(
            r#"{
                "name": "Nowhere",
                "sys": {},
                "main": {"temp": 0.0, "feels_like": -2.0, "humidity": 80, "pressure": 990}
            }"#,
        )
        .unwrap();

        let report = format_report(&data, "metric");
        assert!(report.contains("Weather for Nowhere"));
        assert!(report.contains("unknown"));
        assert!(report.contains("n/a"));
    }
}
