// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! OpenWeatherMap 5-day / 3-hour forecast, trimmed to what a runner needs

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::models::Coordinate;
use crate::providers::{decode_json, require_credential, ForecastProvider, ProviderError};

const PROVIDER: &str = "OpenWeatherMap";

/// Forecast for one place: a city header and one entry per 3-hour step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub city: CityInfo,
    pub entries: Vec<ForecastEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityInfo {
    pub name: Option<String>,
    /// Offset from UTC in seconds
    pub timezone: i64,
    /// Unix timestamps
    pub sunrise: Option<i64>,
    pub sunset: Option<i64>,
    /// RFC 3339 in the city's own offset
    pub sunrise_local: Option<String>,
    pub sunset_local: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    pub humidity: Option<f64>,
    pub weather: WeatherLabel,
    pub wind: Wind,
    /// Probability of precipitation, 0 to 1
    pub pop: Option<f64>,
    /// Rain volume over the last 3 hours in mm, 0 when absent
    pub rain: f64,
    pub dt: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherLabel {
    pub main: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: Option<f64>,
    pub deg: Option<f64>,
    pub gust: Option<f64>,
}

fn local_time(timestamp: Option<i64>, offset_secs: i64) -> Option<String> {
    let offset = FixedOffset::east_opt(i32::try_from(offset_secs).ok()?)?;
    let utc = DateTime::from_timestamp(timestamp?, 0)?;
    Some(utc.with_timezone(&offset).to_rfc3339())
}

/// Keep temperature, humidity, weather label, wind, precipitation and time
/// from a raw forecast response
///
/// Missing fields become `None`; a missing `rain.3h` is 0 and a missing
/// timezone is UTC.
pub fn filter_forecast(data: &Value) -> ForecastSummary {
    let city = &data["city"];
    let timezone = city["timezone"].as_i64().unwrap_or(0);
    let sunrise = city["sunrise"].as_i64();
    let sunset = city["sunset"].as_i64();

    let entries = data["list"]
        .as_array()
        .map(|list| list.iter().map(filter_entry).collect())
        .unwrap_or_default();

    ForecastSummary {
        city: CityInfo {
            name: city["name"].as_str().map(str::to_string),
            timezone,
            sunrise,
            sunset,
            sunrise_local: local_time(sunrise, timezone),
            sunset_local: local_time(sunset, timezone),
        },
        entries,
    }
}

fn filter_entry(entry: &Value) -> ForecastEntry {
    let main = &entry["main"];
    let label = &entry["weather"][0];
    let wind = &entry["wind"];
    let text = |v: &Value| v.as_str().map(str::to_string);

    ForecastEntry {
        temp: main["temp"].as_f64(),
        feels_like: main["feels_like"].as_f64(),
        humidity: main["humidity"].as_f64(),
        weather: WeatherLabel {
            main: text(&label["main"]),
            description: text(&label["description"]),
        },
        wind: Wind {
            speed: wind["speed"].as_f64(),
            deg: wind["deg"].as_f64(),
            gust: wind["gust"].as_f64(),
        },
        pop: entry["pop"].as_f64(),
        rain: entry["rain"]["3h"].as_f64().unwrap_or(0.0),
        dt: entry["dt"].as_i64(),
    }
}

/// Forecast client for the OpenWeatherMap `data/2.5/forecast` endpoint
pub struct WeatherService {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    units: String,
}

impl WeatherService {
    pub fn with_base_url(
        client: Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        units: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            units: units.into(),
        }
    }
}

#[async_trait]
impl ForecastProvider for WeatherService {
    async fn forecast(&self, at: Coordinate) -> Result<ForecastSummary, ProviderError> {
        let api_key = require_credential(
            &self.api_key,
            "No OpenWeatherMap API key configured (WEATHER_API_KEY)",
        )?;

        info!("Fetching forecast at {}", at);
        let url = format!("{}/data/2.5/forecast", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", at.lat.to_string()),
                ("lon", at.lon.to_string()),
                ("appid", api_key.to_string()),
                ("units", self.units.clone()),
            ])
            .send()
            .await?;

        let raw: Value = decode_json(PROVIDER, response).await?;
        let summary = filter_forecast(&raw);
        debug!(entries = summary.entries.len(), city = ?summary.city.name, "Forecast received");
        Ok(summary)
    }
}
