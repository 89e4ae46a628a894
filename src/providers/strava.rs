// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info};

use super::{decode_json, require_credential, ActivityProvider, ProviderError, SegmentExplorer};
use crate::constants::{endpoints, errors};
use crate::models::{
    Activity, ActivityStreams, AthleteStats, BoundingBox, Coordinate, RunTotals, Segment,
};

const PROVIDER: &str = "Strava";

/// Stream types requested for activity series
const STREAM_KEYS: &str = "time,distance,velocity_smooth,heartrate";

/// Segment `points` are encoded at five decimal places
const POLYLINE_PRECISION: u32 = 5;

pub struct StravaProvider {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl StravaProvider {
    pub fn new(client: Client, access_token: Option<String>) -> Self {
        Self::with_base_url(client, endpoints::STRAVA_API_BASE, access_token)
    }

    /// Point the provider at another API root (used with mock servers)
    pub fn with_base_url(
        client: Client,
        base_url: impl Into<String>,
        access_token: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token,
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let token = require_credential(&self.access_token, errors::MSG_MISSING_STRAVA_TOKEN)?;
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Strava request");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        decode_json(PROVIDER, response).await
    }

    pub async fn get_athlete_id(&self) -> Result<u64, ProviderError> {
        let athlete: StravaAthlete = self.get("/athlete", &[]).await?;
        Ok(athlete.id)
    }
}

#[async_trait]
impl ActivityProvider for StravaProvider {
    async fn get_athlete_stats(&self) -> Result<AthleteStats, ProviderError> {
        let athlete_id = self.get_athlete_id().await?;
        let stats: StravaAthleteStats = self
            .get(&format!("/athletes/{}/stats", athlete_id), &[])
            .await?;

        Ok(AthleteStats {
            recent_run_totals: stats.recent_run_totals.into(),
            ytd_run_totals: stats.ytd_run_totals.into(),
            all_run_totals: stats.all_run_totals.into(),
        })
    }

    async fn get_activities(&self, limit: usize) -> Result<Vec<Activity>, ProviderError> {
        let activities: Vec<StravaActivity> = self
            .get("/athlete/activities", &[("per_page", limit.to_string())])
            .await?;

        info!("Fetched {} Strava activities", activities.len());
        Ok(activities.into_iter().map(Activity::from).collect())
    }

    async fn get_activity_streams(
        &self,
        activity_id: u64,
        resolution: &str,
        series_type: &str,
    ) -> Result<ActivityStreams, ProviderError> {
        let mut streams: HashMap<String, StravaStream> = self
            .get(
                &format!("/activities/{}/streams", activity_id),
                &[
                    ("keys", STREAM_KEYS.to_string()),
                    ("key_by_type", "true".to_string()),
                    ("resolution", resolution.to_string()),
                    ("series_type", series_type.to_string()),
                ],
            )
            .await?;

        let mut take = |key: &str| streams.remove(key).map(|s| s.data);
        Ok(ActivityStreams {
            time: take("time"),
            distance: take("distance"),
            velocity_smooth: take("velocity_smooth"),
            heartrate: take("heartrate"),
        })
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

#[async_trait]
impl SegmentExplorer for StravaProvider {
    async fn explore_segments(&self, bounds: &BoundingBox) -> Result<Vec<Segment>, ProviderError> {
        let response: StravaExploreResponse = self
            .get(
                "/segments/explore",
                &[
                    ("bounds", bounds.to_query()),
                    ("activity_type", "running".to_string()),
                ],
            )
            .await?;

        let segments = response
            .segments
            .into_iter()
            .map(Segment::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(bounds = %bounds.to_query(), count = segments.len(), "Explored segments");
        Ok(segments)
    }
}

#[derive(Debug, Deserialize)]
struct StravaAthlete {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct StravaActivity {
    id: u64,
    name: String,
    #[serde(rename = "type")]
    activity_type: String,
    start_date: DateTime<Utc>,
    start_date_local: Option<String>,
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    moving_time: u64,
    #[serde(default)]
    elapsed_time: u64,
    average_speed: Option<f64>,
    max_speed: Option<f64>,
    average_heartrate: Option<f64>,
    max_heartrate: Option<f64>,
    total_elevation_gain: Option<f64>,
    start_latlng: Option<Vec<f64>>, // [latitude, longitude], empty without GPS
}

impl From<StravaActivity> for Activity {
    fn from(strava: StravaActivity) -> Self {
        let start = match strava.start_latlng.as_deref() {
            Some([lat, lon, ..]) => Some(Coordinate::new(*lat, *lon)),
            _ => None,
        };

        Activity {
            id: strava.id,
            name: strava.name,
            activity_type: strava.activity_type,
            start_date: strava.start_date,
            start_date_local: strava.start_date_local,
            distance_m: strava.distance,
            moving_time_s: strava.moving_time,
            elapsed_time_s: strava.elapsed_time,
            average_speed: strava.average_speed,
            max_speed: strava.max_speed,
            average_heartrate: strava.average_heartrate,
            max_heartrate: strava.max_heartrate,
            total_elevation_gain: strava.total_elevation_gain,
            start,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StravaAthleteStats {
    recent_run_totals: StravaTotals,
    ytd_run_totals: StravaTotals,
    all_run_totals: StravaTotals,
}

#[derive(Debug, Deserialize)]
struct StravaTotals {
    #[serde(default)]
    count: u64,
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    moving_time: u64,
    #[serde(default)]
    elapsed_time: u64,
    #[serde(default)]
    elevation_gain: f64,
}

impl From<StravaTotals> for RunTotals {
    fn from(totals: StravaTotals) -> Self {
        RunTotals {
            count: totals.count,
            distance: totals.distance,
            moving_time: totals.moving_time,
            elapsed_time: totals.elapsed_time,
            elevation_gain: totals.elevation_gain,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StravaStream {
    data: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct StravaExploreResponse {
    #[serde(default)]
    segments: Vec<StravaExploredSegment>,
}

#[derive(Debug, Deserialize)]
struct StravaExploredSegment {
    id: u64,
    name: String,
    distance: f64,
    points: String,
    start_latlng: Vec<f64>,
    end_latlng: Vec<f64>,
}

impl TryFrom<StravaExploredSegment> for Segment {
    type Error = ProviderError;

    fn try_from(segment: StravaExploredSegment) -> Result<Self, Self::Error> {
        let endpoint = |latlng: &[f64], which: &str| match latlng {
            [lat, lon, ..] => Ok(Coordinate::new(*lat, *lon)),
            _ => Err(ProviderError::Decode {
                provider: PROVIDER,
                message: format!("segment {} has no {} position", segment.id, which),
            }),
        };
        let start = endpoint(&segment.start_latlng, "start")?;
        let end = endpoint(&segment.end_latlng, "end")?;

        let points = decode_points(&segment.points).map_err(|e| ProviderError::Decode {
            provider: PROVIDER,
            message: format!("segment {} polyline: {}", segment.id, e),
        })?;

        Ok(Segment {
            id: segment.id,
            name: segment.name,
            distance_m: segment.distance,
            points,
            start,
            end,
        })
    }
}

/// Encoded polyline to coordinates; the decoder yields lon/lat pairs
fn decode_points(encoded: &str) -> Result<Vec<Coordinate>, String> {
    let line = polyline::decode_polyline(encoded, POLYLINE_PRECISION).map_err(|e| e.to_string())?;
    Ok(line.into_iter().map(|c| Coordinate::new(c.y, c.x)).collect())
}
