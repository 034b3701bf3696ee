//! OpenWeather response types (the fields the report uses)

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct WeatherResponse {
    pub name: String,
    pub sys: WeatherSys,
    pub main: WeatherMain,
    #[serde(default)]
    pub weather: Vec<WeatherCondition>,
    #[serde(default)]
    pub wind: WeatherWind,
    pub visibility: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WeatherSys {
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WeatherMain {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: i64,
    pub pressure: i64,
}

#[derive(Debug, Deserialize)]
pub struct WeatherCondition {
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct WeatherWind {
    #[serde(default)]
    pub speed: f64,
}
