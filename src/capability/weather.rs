//! Weather capability: geocode a location and fetch its forecast.

use super::{Capability, CapabilityDescriptor, CapabilityKind, InvocationOutcome, TurnContext};
use crate::config::Settings;
use crate::error::{LaerError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

pub const NAME: &str = "get_weather";

/// Direct capability backed by Open-Meteo-compatible endpoints.
pub struct WeatherCapability {
    http: reqwest::Client,
    geocoding_url: String,
    forecast_url: String,
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodingResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    name: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentWeather,
    daily: DailyForecast,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature_2m: f64,
}

#[derive(Debug, Deserialize)]
struct DailyForecast {
    time: Vec<String>,
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
    #[serde(default)]
    precipitation_probability_max: Vec<Option<f64>>,
}

impl WeatherCapability {
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: reqwest::Client::new(),
            geocoding_url: settings.weather.geocoding_url.clone(),
            forecast_url: settings.weather.forecast_url.clone(),
        }
    }

    async fn geocode(&self, location: &str) -> Result<GeocodingResult> {
        debug!("Geocoding '{}'", location);

        let response: GeocodingResponse = self
            .http
            .get(&self.geocoding_url)
            .query(&[("name", location), ("count", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| LaerError::Weather(format!("no match for location '{}'", location)))
    }

    async fn forecast(&self, place: &GeocodingResult, days: u8) -> Result<ForecastResponse> {
        let response = self
            .http
            .get(&self.forecast_url)
            .query(&[
                ("latitude", place.latitude.to_string()),
                ("longitude", place.longitude.to_string()),
                ("current", "temperature_2m".to_string()),
                (
                    "daily",
                    "temperature_2m_max,temperature_2m_min,precipitation_probability_max"
                        .to_string(),
                ),
                ("forecast_days", days.to_string()),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response)
    }

    fn summarize(place: &GeocodingResult, forecast: &ForecastResponse) -> String {
        let mut summary = match &place.country {
            Some(country) => format!(
                "Weather for {}, {}: currently {:.0}°C.",
                place.name, country, forecast.current.temperature_2m
            ),
            None => format!(
                "Weather for {}: currently {:.0}°C.",
                place.name, forecast.current.temperature_2m
            ),
        };

        for (i, date) in forecast.daily.time.iter().enumerate() {
            let max = forecast.daily.temperature_2m_max.get(i);
            let min = forecast.daily.temperature_2m_min.get(i);
            if let (Some(max), Some(min)) = (max, min) {
                summary.push_str(&format!("\n{}: {:.0}°C to {:.0}°C", date, min, max));
                if let Some(Some(rain)) = forecast.daily.precipitation_probability_max.get(i) {
                    summary.push_str(&format!(", {:.0}% chance of rain", rain));
                }
            }
        }

        summary
    }
}

#[async_trait]
impl Capability for WeatherCapability {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            name: NAME.to_string(),
            description: "Look up the current weather and forecast for a named \
                place. Use this whenever the user asks about weather conditions."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "location": {
                        "type": "string",
                        "description": "City or place name, e.g. 'Oslo'"
                    },
                    "days": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 7,
                        "description": "Forecast days to include (default: 3)"
                    }
                },
                "required": ["location"]
            }),
            kind: CapabilityKind::Direct,
        }
    }

    async fn execute(&self, args: Value, _ctx: &TurnContext) -> InvocationOutcome {
        let location = args["location"].as_str().unwrap_or_default().to_string();
        let days = args["days"].as_u64().unwrap_or(3) as u8;

        info!("Weather lookup for '{}' ({} days)", location, days);

        let place = match self.geocode(&location).await {
            Ok(place) => place,
            Err(e) => return InvocationOutcome::failure(NAME, e.to_string()),
        };

        match self.forecast(&place, days).await {
            Ok(forecast) => {
                let summary = Self::summarize(&place, &forecast);

                let mut data = Map::new();
                data.insert("location".to_string(), Value::from(place.name.clone()));
                data.insert("latitude".to_string(), Value::from(place.latitude));
                data.insert("longitude".to_string(), Value::from(place.longitude));
                data.insert(
                    "current_temperature".to_string(),
                    Value::from(forecast.current.temperature_2m),
                );

                InvocationOutcome::success_with(NAME, summary, data)
            }
            Err(e) => InvocationOutcome::failure(
                NAME,
                format!("forecast for '{}' unavailable: {}", location, e),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::schema;

    #[test]
    fn test_descriptor_bounds_days() {
        let settings = Settings::default();
        let capability = WeatherCapability::new(&settings);
        let descriptor = capability.descriptor();

        assert!(schema::validate(
            &descriptor.input_schema,
            &json!({ "location": "Oslo", "days": 3 })
        )
        .is_ok());

        let err = schema::validate(
            &descriptor.input_schema,
            &json!({ "location": "Oslo", "days": 10 }),
        )
        .unwrap_err();
        assert_eq!(err.field, "days");
    }

    #[test]
    fn test_summarize_formats_forecast() {
        let place = GeocodingResult {
            name: "Oslo".to_string(),
            latitude: 59.91,
            longitude: 10.75,
            country: Some("Norway".to_string()),
        };
        let forecast = ForecastResponse {
            current: CurrentWeather {
                temperature_2m: 4.2,
            },
            daily: DailyForecast {
                time: vec!["2026-02-01".to_string(), "2026-02-02".to_string()],
                temperature_2m_max: vec![5.0, 7.0],
                temperature_2m_min: vec![-1.0, 0.0],
                precipitation_probability_max: vec![Some(40.0), None],
            },
        };

        let summary = WeatherCapability::summarize(&place, &forecast);
        assert!(summary.starts_with("Weather for Oslo, Norway: currently 4°C."));
        assert!(summary.contains("2026-02-01: -1°C to 5°C, 40% chance of rain"));
        assert!(summary.contains("2026-02-02: 0°C to 7°C"));
    }
}
