// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! External service seams
//!
//! Each capability the tools need from the outside world is a small async
//! trait, so the refiners and tools can be driven by in-memory stubs in tests
//! and by the HTTP clients below in production.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

use crate::intelligence::weather::ForecastSummary;
use crate::models::{
    Activity, ActivityStreams, AthleteStats, BoundingBox, Coordinate, Route, RouteSummary, Segment,
};

pub mod google_routes;
pub mod openrouteservice;
pub mod strava;

/// Failure of a call to an external provider
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} API returned status {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Failed to decode {provider} response: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },

    #[error("{0}")]
    MissingCredential(String),

    #[error("{provider} returned no route")]
    NoRoute { provider: &'static str },

    #[error("No location found for '{0}'")]
    PlaceNotFound(String),
}

impl ProviderError {
    /// Name of the provider that answered, when the failure came from one
    pub fn provider(&self) -> Option<&'static str> {
        match self {
            ProviderError::Status { provider, .. }
            | ProviderError::Decode { provider, .. }
            | ProviderError::NoRoute { provider } => Some(*provider),
            _ => None,
        }
    }
}

/// Parameters of one round-trip generation request
#[derive(Debug, Clone, PartialEq)]
pub struct RoundTripRequest {
    pub origin: Coordinate,
    /// Requested loop length in meters
    pub length_m: f64,
    /// Number of generated waypoints
    pub points: u32,
    /// Variation seed
    pub seed: u32,
    /// Routing profile, e.g. `foot-walking`
    pub profile: String,
}

/// A router able to generate a loop of approximate length from one point
#[async_trait]
pub trait RoundTripRouter: Send + Sync {
    async fn round_trip(&self, request: &RoundTripRequest) -> Result<Route, ProviderError>;
}

/// A router computing a path through an ordered list of waypoints
#[async_trait]
pub trait WaypointRouter: Send + Sync {
    async fn route_through(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        waypoints: &[Coordinate],
    ) -> Result<RouteSummary, ProviderError>;
}

/// Popular segments inside a bounding box
#[async_trait]
pub trait SegmentExplorer: Send + Sync {
    async fn explore_segments(&self, bounds: &BoundingBox) -> Result<Vec<Segment>, ProviderError>;
}

/// The athlete's activity history
#[async_trait]
pub trait ActivityProvider: Send + Sync {
    async fn get_athlete_stats(&self) -> Result<AthleteStats, ProviderError>;

    /// Most recent activities first
    async fn get_activities(&self, limit: usize) -> Result<Vec<Activity>, ProviderError>;

    async fn get_activity_streams(
        &self,
        activity_id: u64,
        resolution: &str,
        series_type: &str,
    ) -> Result<ActivityStreams, ProviderError>;

    fn provider_name(&self) -> &'static str;
}

/// Forward geocoding of a free-form place name
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, place: &str) -> Result<Coordinate, ProviderError>;
}

/// Short-range weather forecast at a position
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    async fn forecast(&self, at: Coordinate) -> Result<ForecastSummary, ProviderError>;
}

/// Shared HTTP client with the configured user agent and per-request timeout
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, ProviderError> {
    Ok(Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()?)
}

/// Turn a non-success response into [`ProviderError::Status`], keeping the body
/// since most providers explain the rejection there
pub(crate) async fn ensure_success(
    provider: &'static str,
    response: Response,
) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        provider,
        status: status.as_u16(),
        body,
    })
}

pub(crate) async fn decode_json<T: DeserializeOwned>(
    provider: &'static str,
    response: Response,
) -> Result<T, ProviderError> {
    let bytes = ensure_success(provider, response).await?.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ProviderError::Decode {
        provider,
        message: e.to_string(),
    })
}

pub(crate) fn require_credential<'a>(
    value: &'a Option<String>,
    message: &str,
) -> Result<&'a str, ProviderError> {
    value
        .as_deref()
        .ok_or_else(|| ProviderError::MissingCredential(message.to_string()))
}
