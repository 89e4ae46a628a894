// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! openrouteservice directions client, used for round-trip generation

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{decode_json, require_credential, ProviderError, RoundTripRequest, RoundTripRouter};
use crate::models::{Coordinate, Route};

const PROVIDER: &str = "openrouteservice";

pub struct OpenRouteServiceClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenRouteServiceClient {
    pub fn with_base_url(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl RoundTripRouter for OpenRouteServiceClient {
    async fn round_trip(&self, request: &RoundTripRequest) -> Result<Route, ProviderError> {
        let api_key = require_credential(
            &self.api_key,
            "No openrouteservice API key configured (ORS_KEY)",
        )?;

        let url = format!("{}/v2/directions/{}/geojson", self.base_url, request.profile);
        let body = DirectionsRequest {
            coordinates: vec![request.origin.to_lon_lat()],
            options: DirectionsOptions {
                round_trip: RoundTripOptions {
                    length: request.length_m,
                    points: request.points,
                    seed: request.seed,
                },
            },
        };

        debug!(
            seed = request.seed,
            length_m = request.length_m,
            points = request.points,
            "Requesting round trip"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", api_key)
            .json(&body)
            .send()
            .await?;

        let collection: FeatureCollection = decode_json(PROVIDER, response).await?;
        let feature = collection
            .features
            .into_iter()
            .next()
            .ok_or(ProviderError::NoRoute { provider: PROVIDER })?;

        let coordinates = feature
            .geometry
            .coordinates
            .iter()
            .filter_map(|position| match position.as_slice() {
                // a third value is elevation when requested
                [lon, lat, ..] => Some(Coordinate::from_lon_lat([*lon, *lat])),
                _ => None,
            })
            .collect();

        Ok(Route {
            coordinates,
            distance_m: feature.properties.summary.distance,
            duration_s: feature.properties.summary.duration,
        })
    }
}

#[derive(Debug, Serialize)]
struct DirectionsRequest {
    coordinates: Vec<[f64; 2]>,
    options: DirectionsOptions,
}

#[derive(Debug, Serialize)]
struct DirectionsOptions {
    round_trip: RoundTripOptions,
}

#[derive(Debug, Serialize)]
struct RoundTripOptions {
    length: f64,
    points: u32,
    seed: u32,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Vec<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct Properties {
    summary: Summary,
}

#[derive(Debug, Deserialize)]
struct Summary {
    // omitted by the API for zero-length routes
    #[serde(default)]
    distance: f64,
    duration: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = DirectionsRequest {
            coordinates: vec![Coordinate::new(48.8566, 2.3522).to_lon_lat()],
            options: DirectionsOptions {
                round_trip: RoundTripOptions {
                    length: 11000.0,
                    points: 5,
                    seed: 3,
                },
            },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["coordinates"][0][0], 2.3522);
        assert_eq!(json["coordinates"][0][1], 48.8566);
        assert_eq!(json["options"]["round_trip"]["length"], 11000.0);
        assert_eq!(json["options"]["round_trip"]["points"], 5);
        assert_eq!(json["options"]["round_trip"]["seed"], 3);
    }

    #[test]
    fn test_summary_distance_defaults_to_zero() {
        let summary: Summary = serde_json::from_str("{}").unwrap();
        assert_eq!(summary.distance, 0.0);
        assert!(summary.duration.is_none());
    }
}
