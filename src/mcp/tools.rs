// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tool implementations behind `tools/call`
//!
//! Every tool receives a [`ToolContext`] holding the settings and provider
//! handles it may use; nothing is read from the process environment here.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{Config, ItinerarySettings, SeriesSettings};
use crate::constants::{errors, json_fields, limits, tools};
use crate::intelligence::{self, clean_streams, CleanSeries, LocationService, Sampling, WeatherService};
use crate::itinerary::bisection::explore_run_segments;
use crate::itinerary::seed::SeedPlan;
use crate::itinerary::{
    downsample, google_maps_directions_link, refine_by_bisection, refine_by_seed, Refinement,
};
use crate::logging::AppLogger;
use crate::models::{Activity, Coordinate};
use crate::providers::google_routes::GoogleRoutesClient;
use crate::providers::openrouteservice::OpenRouteServiceClient;
use crate::providers::strava::StravaProvider;
use crate::providers::{
    build_http_client, ActivityProvider, ForecastProvider, Geocoder, ProviderError,
    RoundTripRouter, SegmentExplorer, WaypointRouter,
};

/// Failure of a tool call, mapped onto a JSON-RPC error by the server
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Failed to serialize tool result: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ToolError {
    pub fn code(&self) -> i32 {
        match self {
            ToolError::InvalidParams(_) => errors::ERROR_INVALID_PARAMS,
            ToolError::Provider(_) | ToolError::NotFound(_) | ToolError::Serialization(_) => {
                errors::ERROR_INTERNAL_ERROR
            }
            ToolError::UnknownTool(_) => errors::ERROR_METHOD_NOT_FOUND,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::InvalidParams(_) => "invalid_params",
            ToolError::Provider(_) => "provider_error",
            ToolError::NotFound(_) => "not_found",
            ToolError::UnknownTool(_) => "unknown_tool",
            ToolError::Serialization(_) => "internal_error",
        }
    }

    pub fn data(&self) -> Value {
        json!({ "kind": self.kind() })
    }
}

/// Settings and provider handles shared by every tool call
#[derive(Clone)]
pub struct ToolContext {
    pub itinerary: ItinerarySettings,
    pub series: SeriesSettings,
    pub activities: Arc<dyn ActivityProvider>,
    pub segments: Arc<dyn SegmentExplorer>,
    pub round_trips: Arc<dyn RoundTripRouter>,
    pub waypoints: Arc<dyn WaypointRouter>,
    pub geocoder: Arc<dyn Geocoder>,
    pub forecasts: Arc<dyn ForecastProvider>,
}

impl ToolContext {
    /// Build the HTTP-backed providers. Missing credentials are only
    /// reported when a tool needs them.
    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        let client = build_http_client(
            &config.server.user_agent,
            Duration::from_secs(config.server.request_timeout_secs),
        )?;
        let credentials = &config.credentials;
        let endpoints = &config.endpoints;

        let strava = Arc::new(StravaProvider::with_base_url(
            client.clone(),
            &endpoints.strava_api_base,
            credentials.strava_access_token.clone(),
        ));

        Ok(Self {
            itinerary: config.itinerary.clone(),
            series: config.series.clone(),
            activities: strava.clone(),
            segments: strava,
            round_trips: Arc::new(OpenRouteServiceClient::with_base_url(
                client.clone(),
                &endpoints.ors_api_base,
                credentials.ors_api_key.clone(),
            )),
            waypoints: Arc::new(GoogleRoutesClient::with_url(
                client.clone(),
                &endpoints.google_routes_url,
                credentials.google_maps_api_key.clone(),
                &config.itinerary.travel_mode,
            )),
            geocoder: Arc::new(LocationService::with_base_url(
                client.clone(),
                &endpoints.nominatim_base,
            )),
            forecasts: Arc::new(WeatherService::with_base_url(
                client,
                &endpoints.openweather_base,
                credentials.openweather_api_key.clone(),
                &config.weather.units,
            )),
        })
    }
}

/// Run one tool by name
pub async fn call_tool(ctx: &ToolContext, name: &str, args: &Value) -> Result<Value, ToolError> {
    let start = Instant::now();
    let result = match name {
        tools::GET_USER_STATS => get_user_stats(ctx).await,
        tools::GET_LAST_RUNS => get_last_runs(ctx, args).await,
        tools::CREATE_ITINERARY => create_itinerary(ctx, args).await,
        tools::CREATE_SEGMENT_ITINERARY => create_segment_itinerary(ctx, args).await,
        tools::GET_WEATHER_PREDICTION => get_weather_prediction(ctx, args).await,
        tools::GET_ACTIVITY_SERIES => get_activity_series(ctx, args).await,
        other => Err(ToolError::UnknownTool(other.to_string())),
    };

    if let Err(ToolError::Provider(e)) = &result {
        AppLogger::log_provider_failure(e.provider().unwrap_or("unknown"), name, &e.to_string());
    }
    AppLogger::log_mcp_tool_call(name, result.is_ok(), start.elapsed().as_millis() as u64);
    result
}

// Argument helpers. Absent and null arguments both mean "use the default".

fn optional_f64(args: &Value, field: &str) -> Result<Option<f64>, ToolError> {
    match args.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_f64()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| ToolError::InvalidParams(format!("'{}' must be a number", field))),
    }
}

fn optional_u64(args: &Value, field: &str) -> Result<Option<u64>, ToolError> {
    match args.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_u64().map(Some).ok_or_else(|| {
            ToolError::InvalidParams(format!("'{}' must be a non-negative integer", field))
        }),
    }
}

fn optional_str<'a>(args: &'a Value, field: &str) -> Result<Option<&'a str>, ToolError> {
    match args.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_str()
            .map(Some)
            .ok_or_else(|| ToolError::InvalidParams(format!("'{}' must be a string", field))),
    }
}

fn bounded_count(
    value: Option<u64>,
    field: &str,
    default: usize,
    max: usize,
) -> Result<usize, ToolError> {
    match value {
        None => Ok(default),
        Some(n) if n >= 1 && n <= max as u64 => Ok(n as usize),
        Some(n) => Err(ToolError::InvalidParams(format!(
            "'{}' must be between 1 and {} (got {})",
            field, max, n
        ))),
    }
}

fn one_of<'a>(
    value: Option<&'a str>,
    field: &str,
    default: &'a str,
    allowed: &[&str],
) -> Result<&'a str, ToolError> {
    let value = value.unwrap_or(default);
    if allowed.contains(&value) {
        Ok(value)
    } else {
        Err(ToolError::InvalidParams(format!(
            "'{}' must be one of {}",
            field,
            allowed.join(", ")
        )))
    }
}

/// Starting place and distance shared by both itinerary tools
fn itinerary_request(
    args: &Value,
    settings: &ItinerarySettings,
) -> Result<(String, f64), ToolError> {
    let place = optional_str(args, json_fields::STARTING_PLACE)?
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(&settings.default_starting_place)
        .to_string();

    // short or non-positive distances are clamped later, never refused
    let distance_km =
        optional_f64(args, json_fields::DISTANCE_KM)?.unwrap_or(settings.default_distance_km);
    if distance_km > settings.max_distance_km {
        return Err(ToolError::InvalidParams(format!(
            "'{}' must be at most {} (got {})",
            json_fields::DISTANCE_KM,
            settings.max_distance_km,
            distance_km
        )));
    }
    Ok((place, distance_km))
}

async fn geocode(ctx: &ToolContext, place: &str) -> Result<Coordinate, ToolError> {
    match ctx.geocoder.geocode(place).await {
        Ok(position) => Ok(position),
        Err(ProviderError::PlaceNotFound(place)) => {
            Err(ToolError::NotFound(format!("no location found for '{}'", place)))
        }
        Err(e) => Err(e.into()),
    }
}

fn position_json(position: Coordinate) -> Value {
    json!({ "lat": position.lat, "lon": position.lon })
}

async fn get_user_stats(ctx: &ToolContext) -> Result<Value, ToolError> {
    let stats = ctx.activities.get_athlete_stats().await?;
    Ok(serde_json::to_value(stats)?)
}

#[derive(Debug, Serialize)]
struct RunSummary {
    id: u64,
    name: String,
    #[serde(rename = "type")]
    activity_type: String,
    start_date_local: Option<String>,
    distance_m: f64,
    moving_time_s: u64,
    average_speed: Option<f64>,
    max_speed: Option<f64>,
    average_heartrate: Option<f64>,
    max_heartrate: Option<f64>,
    total_elevation_gain: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    average_pace_min_per_km: Option<f64>,
}

impl From<&Activity> for RunSummary {
    fn from(activity: &Activity) -> Self {
        Self {
            id: activity.id,
            name: activity.name.clone(),
            activity_type: activity.activity_type.clone(),
            start_date_local: activity.start_date_local.clone(),
            distance_m: activity.distance_m,
            moving_time_s: activity.moving_time_s,
            average_speed: activity.average_speed,
            max_speed: activity.max_speed,
            average_heartrate: activity.average_heartrate,
            max_heartrate: activity.max_heartrate,
            total_elevation_gain: activity.total_elevation_gain,
            average_pace_min_per_km: activity.average_pace_min_per_km(),
        }
    }
}

async fn get_last_runs(ctx: &ToolContext, args: &Value) -> Result<Value, ToolError> {
    let limit = bounded_count(
        optional_u64(args, json_fields::LIMIT)?,
        json_fields::LIMIT,
        limits::DEFAULT_LAST_RUNS_LIMIT,
        limits::MAX_ACTIVITIES_FETCH,
    )?;

    let activities = ctx.activities.get_activities(limit).await?;
    let runs: Vec<RunSummary> = activities
        .iter()
        .filter(|a| a.is_run())
        .map(RunSummary::from)
        .collect();

    info!("{} runs among {} activities", runs.len(), activities.len());
    Ok(json!({ "count": runs.len(), "runs": runs }))
}

async fn create_itinerary(ctx: &ToolContext, args: &Value) -> Result<Value, ToolError> {
    let settings = &ctx.itinerary;
    let (place, requested_km) = itinerary_request(args, settings)?;
    let origin = geocode(ctx, &place).await?;
    let plan = SeedPlan::new(requested_km, settings);

    let refinement = refine_by_seed(ctx.round_trips.as_ref(), origin, requested_km, settings).await;
    let status = refinement.outcome();
    let (route, attempts) = match refinement {
        Refinement::Converged { value, attempts } => (value, attempts),
        Refinement::BestEffort { value, attempts, .. } => (value, attempts),
        Refinement::ProviderError(e) => return Err(e.into()),
        Refinement::NotFound(reason) => return Err(ToolError::NotFound(reason.to_string())),
    };

    let waypoints = downsample(&route.coordinates, plan.distance_km);
    let link = google_maps_directions_link(origin, &waypoints);

    Ok(json!({
        "link": link,
        "status": status,
        "starting_place": place,
        "start": position_json(origin),
        "distance_km": plan.distance_km,
        "target_m": plan.target_m,
        "tolerance_m": plan.tolerance_m,
        "achieved_distance_m": route.distance_m,
        "attempts": attempts,
        "waypoints": waypoints.len(),
    }))
}

async fn create_segment_itinerary(ctx: &ToolContext, args: &Value) -> Result<Value, ToolError> {
    let settings = &ctx.itinerary;
    let (place, requested_km) = itinerary_request(args, settings)?;
    let origin = geocode(ctx, &place).await?;

    let distance_km = settings.effective_distance_km(requested_km);
    let target_m = distance_km * limits::METERS_PER_KILOMETER;

    let segments = explore_run_segments(ctx.segments.as_ref(), origin, target_m).await?;
    info!("{} candidate segments around {}", segments.len(), origin);

    let mut rng = StdRng::from_entropy();
    let refinement = refine_by_bisection(
        ctx.waypoints.as_ref(),
        origin,
        &segments,
        target_m,
        settings,
        &mut rng,
    )
    .await;

    let status = refinement.outcome();
    let (found, attempts) = match refinement {
        Refinement::Converged { value, attempts } | Refinement::BestEffort { value, attempts, .. } => {
            (value, attempts)
        }
        Refinement::ProviderError(e) => return Err(e.into()),
        Refinement::NotFound(reason) => return Err(ToolError::NotFound(reason.to_string())),
    };

    let link = google_maps_directions_link(origin, &found.path);
    Ok(json!({
        "link": link,
        "status": status,
        "starting_place": place,
        "start": position_json(origin),
        "distance_km": distance_km,
        "target_m": target_m,
        "achieved_distance_m": found.distance_m,
        "attempts": attempts,
        "segment": { "id": found.segment_id, "name": found.segment_name },
    }))
}

async fn get_weather_prediction(ctx: &ToolContext, args: &Value) -> Result<Value, ToolError> {
    let place = optional_str(args, json_fields::PLACE_NAME)?
        .map(str::trim)
        .filter(|p| !p.is_empty());

    let (position, location) = match place {
        Some(place) => {
            let position = geocode(ctx, place).await?;
            (position, json!({ "source": "place", "place_name": place }))
        }
        None => {
            let sample = ctx.itinerary.home_location_sample;
            let activities = ctx.activities.get_activities(sample).await?;
            let home = intelligence::home_location(&activities, sample).ok_or_else(|| {
                ToolError::NotFound(
                    "no recent activity with a recorded start position".to_string(),
                )
            })?;
            (
                home.position,
                json!({ "source": "home", "sample_size": home.sample_size }),
            )
        }
    };

    let forecast = ctx.forecasts.forecast(position).await?;
    Ok(json!({
        "position": position_json(position),
        "location": location,
        "forecast": forecast,
    }))
}

#[derive(Debug, Serialize)]
struct ActivitySeries {
    id: u64,
    name: String,
    start_date: String,
    #[serde(flatten)]
    series: CleanSeries,
}

async fn get_activity_series(ctx: &ToolContext, args: &Value) -> Result<Value, ToolError> {
    let count = match optional_u64(args, json_fields::NUMBER_OF_ACTIVITY)? {
        Some(n) => bounded_count(
            Some(n),
            json_fields::NUMBER_OF_ACTIVITY,
            1,
            ctx.series.max_activities,
        )?,
        None => {
            return Err(ToolError::InvalidParams(format!(
                "'{}' is required",
                json_fields::NUMBER_OF_ACTIVITY
            )))
        }
    };
    let resolution = one_of(
        optional_str(args, json_fields::RESOLUTION)?,
        json_fields::RESOLUTION,
        "high",
        &["low", "medium", "high"],
    )?;
    let series_type = one_of(
        optional_str(args, json_fields::SERIES_TYPE)?,
        json_fields::SERIES_TYPE,
        "time",
        &["time", "distance"],
    )?;
    let sampling = match optional_u64(args, json_fields::SLICE_STEP)? {
        None => Sampling::Resampled,
        Some(0) => {
            return Err(ToolError::InvalidParams(format!(
                "'{}' must be at least 1",
                json_fields::SLICE_STEP
            )))
        }
        Some(step) => Sampling::Decimated(step as usize),
    };

    let activities = ctx.activities.get_activities(count).await?;
    let mut series = Vec::new();
    let mut skipped = Vec::new();

    for activity in &activities {
        match ctx
            .activities
            .get_activity_streams(activity.id, resolution, series_type)
            .await
        {
            Ok(streams) => series.push(ActivitySeries {
                id: activity.id,
                name: activity.name.clone(),
                start_date: activity.start_date.to_rfc3339(),
                series: clean_streams(&streams, &ctx.series, sampling),
            }),
            Err(e) => {
                warn!(
                    "Skipping activity {} ({}): {} streams unavailable: {}",
                    activity.id,
                    activity.name,
                    ctx.activities.provider_name(),
                    e
                );
                skipped.push(json!({ "id": activity.id, "name": activity.name, "error": e.to_string() }));
            }
        }
    }

    Ok(json!({ "activities": series, "skipped": skipped }))
}
