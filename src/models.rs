// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Data Models
//!
//! Core data structures shared by the providers, the itinerary refiners and
//! the MCP tools.
//!
//! ## Core Models
//!
//! - [`Coordinate`]: A latitude/longitude pair in decimal degrees
//! - [`BoundingBox`]: A rectangular search area for the segment explorer
//! - [`Route`]: A routed polyline with its provider-reported length
//! - [`Segment`]: A popular running segment snapshot
//! - [`Activity`]: A single activity summary from the activity tracker
//! - [`AthleteStats`]: Run totals over several time windows
//! - [`ActivityStreams`]: Raw per-sample time series of an activity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::limits::{METERS_PER_KILOMETER, SECONDS_PER_MINUTE};

/// A geographic position in decimal degrees
///
/// No range validation is performed: out-of-range values are handed to the
/// external providers, which are free to reject them.
///
/// # Examples
///
/// ```rust
/// use chathletique_mcp::models::Coordinate;
///
/// let opera = Coordinate::new(48.8566, 2.3522);
/// assert_eq!(opera.to_string(), "48.8566,2.3522");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Build a coordinate from a GeoJSON `[lon, lat]` position
    pub fn from_lon_lat(position: [f64; 2]) -> Self {
        Self {
            lat: position[1],
            lon: position[0],
        }
    }

    /// GeoJSON `[lon, lat]` position
    pub fn to_lon_lat(self) -> [f64; 2] {
        [self.lon, self.lat]
    }

    /// Shift both axes by the given number of degrees
    pub fn offset(self, dlat: f64, dlon: f64) -> Self {
        Self {
            lat: self.lat + dlat,
            lon: self.lon + dlon,
        }
    }

    /// Arithmetic mean of a set of positions, `None` when the set is empty
    pub fn mean(positions: &[Coordinate]) -> Option<Self> {
        if positions.is_empty() {
            return None;
        }
        let n = positions.len() as f64;
        let (lat_sum, lon_sum) = positions
            .iter()
            .fold((0.0, 0.0), |(lat, lon), p| (lat + p.lat, lon + p.lon));
        Some(Self::new(lat_sum / n, lon_sum / n))
    }
}

/// Formats as `"lat,lon"` using the shortest representation that round-trips,
/// keeping a trailing `.0` on whole degrees (`48.0,2.0`).
impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?},{:?}", self.lat, self.lon)
    }
}

/// A rectangular area, in the `[south, west, north, east]` order the
/// segment explorer expects
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Comma separated `south,west,north,east`
    pub fn to_query(&self) -> String {
        format!("{},{},{},{}", self.south, self.west, self.north, self.east)
    }

    pub fn contains(&self, point: Coordinate) -> bool {
        point.lat >= self.south
            && point.lat <= self.north
            && point.lon >= self.west
            && point.lon <= self.east
    }
}

/// A routed path as reported by a routing provider
///
/// `distance_m` is the provider's own figure and is treated as ground truth;
/// the polyline length is never recomputed locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Ordered polyline, origin first
    pub coordinates: Vec<Coordinate>,
    /// Provider-reported length in meters
    pub distance_m: f64,
    /// Provider-reported duration in seconds
    pub duration_s: Option<f64>,
}

/// Distance summary of a waypoint-routed request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub distance_m: f64,
    /// Duration as returned by the provider (e.g. `"1834s"`)
    pub duration: Option<String>,
    pub encoded_polyline: Option<String>,
}

/// A popular running segment, read once per bounding box and never mutated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: u64,
    pub name: String,
    /// Nominal length in meters
    pub distance_m: f64,
    /// Decoded interior polyline
    pub points: Vec<Coordinate>,
    pub start: Coordinate,
    pub end: Coordinate,
}

/// Summary of a single activity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: u64,
    pub name: String,
    /// Provider activity type (`Run`, `Ride`, ...)
    pub activity_type: String,
    /// When the activity started (UTC)
    pub start_date: DateTime<Utc>,
    /// Local wall-clock start time as reported by the provider
    pub start_date_local: Option<String>,
    /// Distance in meters
    pub distance_m: f64,
    /// Moving time in seconds
    pub moving_time_s: u64,
    /// Elapsed time in seconds
    pub elapsed_time_s: u64,
    /// Average speed in meters per second
    pub average_speed: Option<f64>,
    /// Maximum speed in meters per second
    pub max_speed: Option<f64>,
    pub average_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    /// Elevation gain in meters
    pub total_elevation_gain: Option<f64>,
    /// Start position, when the activity has GPS data
    pub start: Option<Coordinate>,
}

impl Activity {
    pub fn is_run(&self) -> bool {
        self.activity_type == "Run"
    }

    /// Average pace in minutes per kilometer, `None` for a stationary activity
    pub fn average_pace_min_per_km(&self) -> Option<f64> {
        match self.average_speed {
            Some(speed) if speed > 0.0 => Some(METERS_PER_KILOMETER / speed / SECONDS_PER_MINUTE),
            _ => None,
        }
    }
}

/// Aggregated run totals over one time window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunTotals {
    pub count: u64,
    /// Meters
    pub distance: f64,
    /// Seconds
    pub moving_time: u64,
    /// Seconds
    pub elapsed_time: u64,
    /// Meters
    pub elevation_gain: f64,
}

/// Run totals for the recent (4 weeks), year-to-date and all-time windows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AthleteStats {
    pub recent_run_totals: RunTotals,
    pub ytd_run_totals: RunTotals,
    pub all_run_totals: RunTotals,
}

/// Parallel per-sample series of one activity
///
/// Every series is optional: devices without a heart-rate strap, or manual
/// activities, simply omit them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityStreams {
    /// Seconds since start
    pub time: Option<Vec<f64>>,
    /// Meters since start
    pub distance: Option<Vec<f64>>,
    /// Meters per second
    pub velocity_smooth: Option<Vec<f64>>,
    /// Beats per minute
    pub heartrate: Option<Vec<f64>>,
}
