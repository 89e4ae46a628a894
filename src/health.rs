// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Health check endpoints
//!
//! The server starts without credentials; each missing one only disables
//! the tools that depend on it, so it is reported as `degraded` rather than
//! failing the whole service.

use serde::{Deserialize, Serialize};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::config::Config;
use crate::constants::protocol;

/// Overall health status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub service: ServiceInfo,
    pub checks: Vec<ComponentHealth>,
    /// Unix seconds
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Individual component health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub message: String,
    /// Tools that need this component
    pub tools: Vec<String>,
}

struct CredentialCheck {
    name: &'static str,
    configured: bool,
    tools: &'static [&'static str],
}

/// Reports which tool families are usable with the loaded configuration
pub struct HealthChecker {
    start_time: Instant,
    credentials: Vec<CredentialCheck>,
}

impl HealthChecker {
    pub fn new(config: &Config) -> Self {
        let credentials = &config.credentials;
        Self {
            start_time: Instant::now(),
            credentials: vec![
                CredentialCheck {
                    name: "strava",
                    configured: credentials.strava_access_token.is_some(),
                    tools: &[
                        "get_user_stats",
                        "get_last_runs",
                        "create_segment_itinerary",
                        "get_activity_series",
                    ],
                },
                CredentialCheck {
                    name: "openrouteservice",
                    configured: credentials.ors_api_key.is_some(),
                    tools: &["create_itinerary"],
                },
                CredentialCheck {
                    name: "google_routes",
                    configured: credentials.google_maps_api_key.is_some(),
                    tools: &["create_segment_itinerary"],
                },
                CredentialCheck {
                    name: "openweather",
                    configured: credentials.openweather_api_key.is_some(),
                    tools: &["get_weather_prediction"],
                },
            ],
        }
    }

    fn service_info(&self) -> ServiceInfo {
        ServiceInfo {
            name: protocol::server_name(),
            version: protocol::SERVER_VERSION.to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    fn timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    /// Service liveness plus one check per credential
    pub fn health(&self) -> HealthResponse {
        let checks: Vec<ComponentHealth> = self
            .credentials
            .iter()
            .map(|check| ComponentHealth {
                name: check.name.to_string(),
                status: if check.configured {
                    HealthStatus::Healthy
                } else {
                    HealthStatus::Degraded
                },
                message: if check.configured {
                    "Credential configured".to_string()
                } else {
                    "Credential missing; dependent tools will fail".to_string()
                },
                tools: check.tools.iter().map(|t| t.to_string()).collect(),
            })
            .collect();

        let status = if checks.iter().all(|c| c.status == HealthStatus::Healthy) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        HealthResponse {
            status,
            service: self.service_info(),
            checks,
            timestamp: Self::timestamp(),
        }
    }

    /// Liveness only
    pub fn liveness(&self) -> HealthResponse {
        HealthResponse {
            status: HealthStatus::Healthy,
            service: self.service_info(),
            checks: Vec::new(),
            timestamp: Self::timestamp(),
        }
    }
}

/// Health check routes for the HTTP transport
pub mod middleware {
    use super::*;
    use std::sync::Arc;
    use warp::{Filter, Reply};

    use crate::constants::routes as paths;

    /// `GET /health` and `GET /live`
    pub fn routes(
        health_checker: Arc<HealthChecker>,
    ) -> impl Filter<Extract = (impl Reply,), Error = warp::Rejection> + Clone {
        let checker = health_checker.clone();
        let health = warp::path(paths::HEALTH)
            .and(warp::path::end())
            .and(warp::get())
            .map(move || warp::reply::json(&checker.health()));

        let live = warp::path("live")
            .and(warp::path::end())
            .and(warp::get())
            .map(move || warp::reply::json(&health_checker.liveness()));

        health.or(live).unify()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_missing_credentials_degrade() {
        let checker = HealthChecker::new(&Config::default());
        let response = checker.health();

        assert_eq!(response.status, HealthStatus::Degraded);
        assert_eq!(response.checks.len(), 4);
        assert!(response
            .checks
            .iter()
            .all(|c| c.status == HealthStatus::Degraded));
    }

    #[test]
    fn test_all_credentials_healthy() {
        let mut config = Config::default();
        config.credentials.strava_access_token = Some("t".into());
        config.credentials.ors_api_key = Some("k".into());
        config.credentials.google_maps_api_key = Some("k".into());
        config.credentials.openweather_api_key = Some("k".into());

        let response = HealthChecker::new(&config).health();
        assert_eq!(response.status, HealthStatus::Healthy);
        assert_eq!(response.service.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_health_route() {
        let checker = Arc::new(HealthChecker::new(&Config::default()));
        let filter = middleware::routes(checker);

        let response = warp::test::request()
            .method("GET")
            .path("/health")
            .reply(&filter)
            .await;

        assert_eq!(response.status(), 200);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["status"], "degraded");
    }
}
