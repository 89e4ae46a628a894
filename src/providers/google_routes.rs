// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Google Routes API client (`directions/v2:computeRoutes`)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{decode_json, require_credential, ProviderError, WaypointRouter};
use crate::constants::endpoints;
use crate::models::{Coordinate, RouteSummary};

const PROVIDER: &str = "Google Routes";

pub struct GoogleRoutesClient {
    client: Client,
    url: String,
    api_key: Option<String>,
    travel_mode: String,
}

impl GoogleRoutesClient {
    pub fn with_url(
        client: Client,
        url: impl Into<String>,
        api_key: Option<String>,
        travel_mode: impl Into<String>,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            api_key,
            travel_mode: travel_mode.into().to_uppercase(),
        }
    }
}

#[async_trait]
impl WaypointRouter for GoogleRoutesClient {
    async fn route_through(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        waypoints: &[Coordinate],
    ) -> Result<RouteSummary, ProviderError> {
        let api_key = require_credential(
            &self.api_key,
            "No Google Maps API key configured (GOOGLE_MAP_API_KEY)",
        )?;

        let body = ComputeRoutesRequest {
            origin: Waypoint::from(origin),
            destination: Waypoint::from(destination),
            intermediates: waypoints.iter().copied().map(Waypoint::from).collect(),
            travel_mode: &self.travel_mode,
        };

        debug!(waypoints = waypoints.len(), "Computing route");

        let response = self
            .client
            .post(&self.url)
            .header("X-Goog-Api-Key", api_key)
            .header("X-Goog-FieldMask", endpoints::GOOGLE_ROUTES_FIELD_MASK)
            .json(&body)
            .send()
            .await?;

        let routes: ComputeRoutesResponse = decode_json(PROVIDER, response).await?;
        let route = routes
            .routes
            .into_iter()
            .next()
            .ok_or(ProviderError::NoRoute { provider: PROVIDER })?;

        Ok(RouteSummary {
            distance_m: route.distance_meters,
            duration: route.duration,
            encoded_polyline: route.polyline.map(|p| p.encoded_polyline),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ComputeRoutesRequest<'a> {
    origin: Waypoint,
    destination: Waypoint,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    intermediates: Vec<Waypoint>,
    travel_mode: &'a str,
}

#[derive(Debug, Serialize)]
struct Waypoint {
    location: Location,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Location {
    lat_lng: LatLng,
}

#[derive(Debug, Serialize)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

impl From<Coordinate> for Waypoint {
    fn from(c: Coordinate) -> Self {
        Waypoint {
            location: Location {
                lat_lng: LatLng {
                    latitude: c.lat,
                    longitude: c.lon,
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ComputeRoutesResponse {
    #[serde(default)]
    routes: Vec<ApiRoute>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiRoute {
    // proto3 JSON drops zero values
    #[serde(default)]
    distance_meters: f64,
    duration: Option<String>,
    polyline: Option<ApiPolyline>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPolyline {
    encoded_polyline: String,
}
