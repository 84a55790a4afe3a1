//! Current-conditions lookup: free-text location -> coordinates -> forecast

use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use crate::config::Config;
use crate::error::{Result, SyncError};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Raw current conditions as reported by the forecast service
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Conditions {
    #[serde(rename = "temperature_2m")]
    pub temperature_c: f64,
    pub weather_code: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub temperature_f: i64,
    pub description: &'static str,
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<Coordinates>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: Conditions,
}

const WEATHER_CODES: &[(i64, &str)] = &[
    (0, "Clear sky"),
    (1, "Mainly clear"),
    (2, "Partly cloudy"),
    (3, "Overcast"),
    (45, "Foggy"),
    (48, "Depositing rime fog"),
    (51, "Light drizzle"),
    (53, "Moderate drizzle"),
    (55, "Dense drizzle"),
    (61, "Slight rain"),
    (63, "Moderate rain"),
    (65, "Heavy rain"),
    (71, "Slight snow"),
    (73, "Moderate snow"),
    (75, "Heavy snow"),
    (95, "Thunderstorm"),
];

/// English description of a WMO weather code
pub fn describe_weather_code(code: i64) -> &'static str {
    WEATHER_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, description)| *description)
        .unwrap_or("Unknown")
}

/// Convert and round to the nearest whole degree, halves rounding up
pub fn celsius_to_fahrenheit(celsius: f64) -> i64 {
    (celsius * 9.0 / 5.0 + 32.0 + 0.5).floor() as i64
}

/// First match of a geocoding response body
pub fn parse_geocoding(body: &str) -> Result<Coordinates> {
    let response: GeocodingResponse = serde_json::from_str(body).map_err(|e| SyncError::Remote {
        status: 200,
        message: format!("Unexpected geocoding response: {}", e),
    })?;

    response
        .results
        .into_iter()
        .next()
        .ok_or_else(|| SyncError::NotFound("Location not found".to_string()))
}

pub fn parse_forecast(body: &str) -> Result<Conditions> {
    let response: ForecastResponse = serde_json::from_str(body).map_err(|e| SyncError::Remote {
        status: 200,
        message: format!("Unexpected forecast response: {}", e),
    })?;
    Ok(response.current)
}

pub struct WeatherClient {
    client: Client,
    geocoding_url: String,
    forecast_url: String,
}

impl WeatherClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;

        Ok(Self {
            client,
            geocoding_url: config.geocoding_api_url.trim_end_matches('/').to_string(),
            forecast_url: config.forecast_api_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String> {
        let url = Url::parse_with_params(url, query).map_err(|e| SyncError::Remote {
            status: 0,
            message: format!("Invalid url {}: {}", url, e),
        })?;
        debug!(%url, "weather request");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SyncError::from_status(
                status.as_u16(),
                crate::backend::google::error_message(status.as_u16(), &body),
            ));
        }
        Ok(body)
    }

    pub async fn geocode(&self, location: &str) -> Result<Coordinates> {
        let url = format!("{}/search", self.geocoding_url);
        let query = [
            ("name", location.to_string()),
            ("count", "1".to_string()),
            ("language", "en".to_string()),
            ("format", "json".to_string()),
        ];

        parse_geocoding(&self.get_text(&url, &query).await?)
    }

    pub async fn current(&self, coordinates: Coordinates) -> Result<Conditions> {
        let url = format!("{}/forecast", self.forecast_url);
        let query = [
            ("latitude", coordinates.latitude.to_string()),
            ("longitude", coordinates.longitude.to_string()),
            ("current", "temperature_2m,weather_code".to_string()),
        ];

        parse_forecast(&self.get_text(&url, &query).await?)
    }

    pub async fn lookup(&self, location: &str) -> Result<WeatherReport> {
        let coordinates = self.geocode(location).await?;
        let conditions = self.current(coordinates).await?;

        Ok(WeatherReport {
            temperature_f: celsius_to_fahrenheit(conditions.temperature_c),
            description: describe_weather_code(conditions.weather_code),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_celsius_to_fahrenheit() {
        assert_eq!(celsius_to_fahrenheit(0.0), 32);
        assert_eq!(celsius_to_fahrenheit(100.0), 212);
        assert_eq!(celsius_to_fahrenheit(-40.0), -40);
        assert_eq!(celsius_to_fahrenheit(21.3), 70);
    }

    #[test]
    fn test_weather_codes() {
        assert_eq!(describe_weather_code(0), "Clear sky");
        assert_eq!(describe_weather_code(48), "Depositing rime fog");
        assert_eq!(describe_weather_code(95), "Thunderstorm");
        assert_eq!(describe_weather_code(999), "Unknown");
        assert_eq!(describe_weather_code(2), "Partly cloudy");
    }

    #[test]
    fn test_geocoding_without_results_is_not_found() {
        let err = parse_geocoding(r#"{"generationtime_ms":0.5}"#).unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
    }
}
