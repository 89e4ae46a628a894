// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Configuration management for the MCP server
//!
//! Configuration comes from a TOML file when one exists, otherwise from the
//! process environment (after reading a `.env` file). Every tool receives the
//! loaded [`Config`] explicitly; nothing is read from the environment at call
//! time.

pub mod itinerary_config;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;

pub use itinerary_config::{ItinerarySettings, SeriesSettings};

use crate::constants::{endpoints, env_config};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub endpoints: EndpointConfig,
    #[serde(default)]
    pub itinerary: ItinerarySettings,
    #[serde(default)]
    pub series: SeriesSettings,
    #[serde(default)]
    pub weather: WeatherSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    /// Line-delimited JSON-RPC over TCP
    pub tcp_port: u16,
    /// JSON-RPC over HTTP POST
    pub http_port: u16,
    /// Per-request timeout applied to every outbound provider call
    pub request_timeout_secs: u64,
    /// User agent sent to the providers (Nominatim requires one)
    pub user_agent: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            tcp_port: env_config::DEFAULT_MCP_PORT,
            http_port: env_config::DEFAULT_HTTP_PORT,
            request_timeout_secs: 20,
            user_agent: format!("chathletique-mcp/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// API credentials. `Debug` never prints the secret values.
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct Credentials {
    pub strava_access_token: Option<String>,
    pub ors_api_key: Option<String>,
    pub google_maps_api_key: Option<String>,
    pub openweather_api_key: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Credentials")
            .field("strava_access_token", &mask(&self.strava_access_token))
            .field("ors_api_key", &mask(&self.ors_api_key))
            .field("google_maps_api_key", &mask(&self.google_maps_api_key))
            .field("openweather_api_key", &mask(&self.openweather_api_key))
            .finish()
    }
}

/// Base URLs of the external services, overridable so tests can point the
/// clients at a mock server
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub strava_api_base: String,
    pub ors_api_base: String,
    pub google_routes_url: String,
    pub nominatim_base: String,
    pub openweather_base: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            strava_api_base: endpoints::STRAVA_API_BASE.to_string(),
            ors_api_base: endpoints::ORS_API_BASE.to_string(),
            google_routes_url: endpoints::GOOGLE_ROUTES_URL.to_string(),
            nominatim_base: endpoints::NOMINATIM_BASE.to_string(),
            openweather_base: endpoints::OPENWEATHER_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WeatherSettings {
    /// OpenWeatherMap `units` parameter: `standard`, `metric` or `imperial`
    pub units: String,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            units: "metric".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: Option<String>) -> Result<Self> {
        let config_path = path.unwrap_or_else(|| {
            dirs::config_dir()
                .map(|p| p.join("chathletique-mcp/config.toml"))
                .unwrap_or_else(|| "config.toml".into())
                .to_string_lossy()
                .to_string()
        });

        let config = if Path::new(&config_path).exists() {
            let content = fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            dotenv::dotenv().ok();
            Self::from_env()
        };

        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();

        config.credentials = Credentials {
            strava_access_token: non_empty_var(env_config::STRAVA_ACCESS_TOKEN),
            ors_api_key: non_empty_var(env_config::ORS_KEY),
            google_maps_api_key: non_empty_var(env_config::GOOGLE_MAP_API_KEY),
            openweather_api_key: non_empty_var(env_config::WEATHER_API_KEY),
        };

        if let Some(port) = non_empty_var("MCP_PORT").and_then(|p| p.parse().ok()) {
            config.server.tcp_port = port;
        }
        if let Some(port) = non_empty_var("HTTP_PORT").and_then(|p| p.parse().ok()) {
            config.server.http_port = port;
        }
        if let Some(meters_per_km) = non_empty_var("ITINERARY_METERS_PER_KM").and_then(|v| v.parse().ok()) {
            config.itinerary.meters_per_km = meters_per_km;
        }

        config
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.tcp_port != 0 && self.server.tcp_port == self.server.http_port {
            bail!(
                "server.tcp_port and server.http_port must differ (both are {})",
                self.server.tcp_port
            );
        }
        self.itinerary.validate()?;
        self.series.validate()?;
        if !matches!(self.weather.units.as_str(), "standard" | "metric" | "imperial") {
            bail!("weather.units must be standard, metric or imperial");
        }
        Ok(())
    }

    /// Loggable summary: which credentials are present, never their values
    pub fn summary(&self) -> serde_json::Value {
        json!({
            "server": {
                "host": self.server.host,
                "tcp_port": self.server.tcp_port,
                "http_port": self.server.http_port,
            },
            "credentials": {
                "strava": self.credentials.strava_access_token.is_some(),
                "openrouteservice": self.credentials.ors_api_key.is_some(),
                "google_routes": self.credentials.google_maps_api_key.is_some(),
                "openweather": self.credentials.openweather_api_key.is_some(),
            },
            "itinerary": {
                "meters_per_km": self.itinerary.meters_per_km,
                "max_seed_attempts": self.itinerary.max_seed_attempts,
                "bisection_iterations": self.itinerary.bisection_iterations,
            }
        })
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let parent = Path::new(path).parent().context("Invalid config path")?;
        fs::create_dir_all(parent)?;

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;

        Ok(())
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
