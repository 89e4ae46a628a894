// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Policy knobs for the itinerary refiners and the activity series cleaner

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::constants::limits;

/// Route-length refiner parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ItinerarySettings {
    /// Starting place used when a tool call omits one
    pub default_starting_place: String,
    /// Loop length used when a tool call omits one
    pub default_distance_km: f64,
    /// Requested distances below this are rounded up
    pub min_distance_km: f64,
    /// Requested distances above this are refused
    pub max_distance_km: f64,
    /// Conversion from requested kilometers to the round-trip length sent
    /// to the router. Round-trip generators undershoot, hence > 1000.
    pub meters_per_km: f64,
    /// Half-width of the acceptance band per requested kilometer
    pub tolerance_m_per_km: f64,
    /// Hard cap on round-trip requests for one refinement
    pub max_seed_attempts: u32,
    /// Routing profile for round trips
    pub profile: String,
    /// Travel mode for waypoint routing
    pub travel_mode: String,
    /// Initial synthetic waypoint offset, in degrees on both axes
    pub bisection_initial_step_deg: f64,
    /// Routing requests per accepted segment
    pub bisection_iterations: u32,
    /// Half-width of the (strict) acceptance band for segment loops
    pub bisection_tolerance_m: f64,
    /// Number of recent activities averaged into the home location
    pub home_location_sample: usize,
}

impl Default for ItinerarySettings {
    fn default() -> Self {
        Self {
            default_starting_place: "Opéra, Paris".to_string(),
            default_distance_km: 10.0,
            min_distance_km: 3.0,
            max_distance_km: limits::MAX_ITINERARY_KM,
            meters_per_km: 1100.0,
            tolerance_m_per_km: 50.0,
            max_seed_attempts: 100,
            profile: "foot-walking".to_string(),
            travel_mode: "WALK".to_string(),
            bisection_initial_step_deg: 0.1,
            bisection_iterations: 10,
            bisection_tolerance_m: 100.0,
            home_location_sample: 20,
        }
    }
}

impl ItinerarySettings {
    /// Requested distance floored to the supported minimum
    pub fn effective_distance_km(&self, requested_km: f64) -> f64 {
        requested_km.max(self.min_distance_km)
    }

    /// Round-trip length in whole meters requested from the router
    pub fn target_meters(&self, distance_km: f64) -> f64 {
        (distance_km * self.meters_per_km).trunc()
    }

    /// Acceptance half-width for a loop of `distance_km`
    pub fn tolerance_meters(&self, distance_km: f64) -> f64 {
        self.tolerance_m_per_km * distance_km
    }

    /// Waypoint count for round-trip generation; more points give a rounder loop
    pub fn round_trip_points(&self, distance_km: f64) -> u32 {
        (distance_km / 2.0).ceil().max(1.0) as u32
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_distance_km <= 0.0 {
            bail!("itinerary.min_distance_km must be positive");
        }
        if !(self.max_distance_km >= self.min_distance_km && self.max_distance_km.is_finite()) {
            bail!("itinerary.max_distance_km must be finite and at least min_distance_km");
        }
        if self.meters_per_km <= 0.0 {
            bail!("itinerary.meters_per_km must be positive");
        }
        if self.tolerance_m_per_km < 0.0 || self.bisection_tolerance_m <= 0.0 {
            bail!("itinerary tolerances must not be negative");
        }
        if self.max_seed_attempts == 0 || self.bisection_iterations == 0 {
            bail!("itinerary attempt budgets must be at least 1");
        }
        if self.bisection_initial_step_deg <= 0.0 {
            bail!("itinerary.bisection_initial_step_deg must be positive");
        }
        Ok(())
    }
}

/// Heart-rate and speed series cleaning parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesSettings {
    /// Uniform resampling rate
    pub resample_hz: f64,
    /// Moving-average window in seconds
    pub smooth_win_s: f64,
    /// Percentile trimmed at each tail before clipping
    pub winsor_pct: f64,
    /// Below this speed the athlete is considered paused
    pub min_speed_kmh: f64,
    pub hr_min: f64,
    pub hr_max: f64,
    pub speed_max_kmh: f64,
    /// Upper bound on activities processed per call
    pub max_activities: usize,
}

impl Default for SeriesSettings {
    fn default() -> Self {
        Self {
            resample_hz: 1.0,
            smooth_win_s: 5.0,
            winsor_pct: 0.5,
            min_speed_kmh: 0.5,
            hr_min: 30.0,
            hr_max: 220.0,
            speed_max_kmh: 50.0,
            max_activities: 20,
        }
    }
}

impl SeriesSettings {
    pub fn validate(&self) -> Result<()> {
        if self.resample_hz <= 0.0 {
            bail!("series.resample_hz must be positive");
        }
        if !(0.0..50.0).contains(&self.winsor_pct) {
            bail!("series.winsor_pct must be in [0, 50)");
        }
        if self.hr_min >= self.hr_max {
            bail!("series.hr_min must be below series.hr_max");
        }
        Ok(())
    }
}
