// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Place-name geocoding through Nominatim (OpenStreetMap)

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::constants::{endpoints, limits};
use crate::models::Coordinate;
use crate::providers::{decode_json, Geocoder, ProviderError};

const PROVIDER: &str = "Nominatim";

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    // Nominatim returns coordinates as strings
    lat: String,
    lon: String,
    display_name: Option<String>,
}

#[derive(Debug)]
struct CacheEntry {
    position: Coordinate,
    stored_at: Instant,
}

/// Forward geocoder with an in-memory TTL cache keyed on the normalized
/// place name
pub struct LocationService {
    client: Client,
    base_url: String,
    cache: RwLock<HashMap<String, CacheEntry>>,
    cache_duration: Duration,
}

impl LocationService {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, endpoints::NOMINATIM_BASE)
    }

    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache: RwLock::new(HashMap::new()),
            cache_duration: Duration::from_secs(limits::GEOCODE_CACHE_SECS),
        }
    }

    pub fn with_cache_duration(mut self, cache_duration: Duration) -> Self {
        self.cache_duration = cache_duration;
        self
    }

    fn cache_key(place: &str) -> String {
        place.trim().to_lowercase()
    }

    async fn cached(&self, key: &str) -> Option<Coordinate> {
        let cache = self.cache.read().await;
        cache
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < self.cache_duration)
            .map(|entry| entry.position)
    }

    /// Total and expired entry counts
    pub async fn cache_stats(&self) -> (usize, usize) {
        let cache = self.cache.read().await;
        let expired = cache
            .values()
            .filter(|entry| entry.stored_at.elapsed() >= self.cache_duration)
            .count();
        (cache.len(), expired)
    }
}

#[async_trait]
impl Geocoder for LocationService {
    async fn geocode(&self, place: &str) -> Result<Coordinate, ProviderError> {
        let key = Self::cache_key(place);
        if let Some(position) = self.cached(&key).await {
            debug!("Using cached position for '{}'", key);
            return Ok(position);
        }

        info!("Geocoding '{}'", place);
        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("q", place), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        let places: Vec<NominatimPlace> = decode_json(PROVIDER, response).await?;
        let first = places
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::PlaceNotFound(place.to_string()))?;

        let parse = |value: &str| {
            value.parse::<f64>().map_err(|e| ProviderError::Decode {
                provider: PROVIDER,
                message: format!("invalid coordinate '{}': {}", value, e),
            })
        };
        let position = Coordinate::new(parse(&first.lat)?, parse(&first.lon)?);
        debug!(
            place = %place,
            resolved = ?first.display_name,
            position = %position,
            "Geocoded place"
        );

        let mut cache = self.cache.write().await;
        cache.retain(|_, entry| entry.stored_at.elapsed() < self.cache_duration);
        cache.insert(
            key,
            CacheEntry {
                position,
                stored_at: Instant::now(),
            },
        );

        Ok(position)
    }
}
