use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{config::WeatherSettings, error::ApiError, model::WeatherReport};

use super::WeatherProvider;

const CURRENT_WEATHER_PATH: &str = "/data/2.5/weather";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: Option<String>,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(settings: &WeatherSettings) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(settings.timeout)
            .build()
            .context("Failed to build OpenWeather HTTP client")?;

        Ok(Self {
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn fetch_current(&self, api_key: &str, city: &str) -> Result<WeatherReport, ApiError> {
        let url = format!("{}{}", self.base_url, CURRENT_WEATHER_PATH);
        debug!(city, "requesting current weather");

        let res = self
            .http
            .get(&url)
            .query(&[("q", city), ("appid", api_key), ("units", "metric")])
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        let status = res.status();
        let body = res.text().await.map_err(ApiError::from_transport)?;
        debug!(%status, "OpenWeather responded");

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::CityNotFound { city: city.to_string() });
        }

        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        parse_current(city, &body)
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    country: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    dt: Option<i64>,
    sys: OwSys,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current_weather(&self, city: &str) -> Result<WeatherReport, ApiError> {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("OpenWeather API key is not configured");
            return Err(ApiError::MissingCredential);
        };

        let result = self.fetch_current(api_key, city).await;
        if let Err(err) = &result {
            warn!(city, error = %err, "weather lookup failed");
        }
        result
    }
}

fn parse_current(city: &str, body: &str) -> Result<WeatherReport, ApiError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ApiError::MalformedResponse(format!("body is not valid JSON: {e}")))?;

    // A 2xx with a non-200 `cod` should not happen, but the payload allows it.
    if !is_success_code(value.get("cod")) {
        let reason = value
            .get("message")
            .map(|m| match m {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "Unknown error.".to_string());

        return Err(ApiError::Unavailable { city: city.to_string(), reason });
    }

    let parsed: OwCurrentResponse =
        serde_json::from_value(value).map_err(|e| ApiError::MalformedResponse(e.to_string()))?;

    let description = parsed
        .weather
        .into_iter()
        .next()
        .map(|w| w.description)
        .ok_or_else(|| {
            ApiError::MalformedResponse("response contained no weather conditions".to_string())
        })?;

    Ok(WeatherReport {
        city: parsed.name,
        country: parsed.sys.country,
        temperature_c: parsed.main.temp,
        feels_like_c: parsed.main.feels_like,
        description,
        humidity_pct: parsed.main.humidity,
        wind_speed_mps: parsed.wind.speed,
        observed_at: parsed.dt.and_then(unix_to_utc),
    })
}

/// OpenWeather sends `cod` as a number on success and as a string on errors.
fn is_success_code(cod: Option<&Value>) -> bool {
    match cod {
        Some(Value::Number(n)) => n.as_i64() == Some(200),
        Some(Value::String(s)) => s.trim() == "200",
        _ => false,
    }
}

fn error_message(status: StatusCode, body: &str) -> String {
    let provider_message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_owned));

    provider_message
        .filter(|m| !m.trim().is_empty())
        .or_else(|| (!body.trim().is_empty()).then(|| truncate_body(body)))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown status").to_string())
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}
