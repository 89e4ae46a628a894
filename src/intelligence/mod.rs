// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Intelligence Module
//!
//! Post-processing of provider data for the coaching tools.
//!
//! This module includes:
//! - Place-name geocoding with a cache
//! - Forecast fetching and filtering
//! - Heart-rate and speed stream cleaning
//! - The athlete's approximate home position

use serde::Serialize;

pub mod location;
pub mod streams;
pub mod weather;

pub use location::LocationService;
pub use streams::{clean_streams, CleanSeries, Sampling};
pub use weather::{filter_forecast, ForecastSummary, WeatherService};

use crate::models::{Activity, Coordinate};

/// Approximate home position derived from recent activity starts
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HomeLocation {
    pub position: Coordinate,
    /// Activities with a recorded start that went into the mean
    pub sample_size: usize,
}

/// Arithmetic mean of the start positions of the first `sample` activities
///
/// Activities without GPS are skipped. Returns `None` when no position is
/// left to average.
pub fn home_location(activities: &[Activity], sample: usize) -> Option<HomeLocation> {
    let starts: Vec<Coordinate> = activities
        .iter()
        .take(sample)
        .filter_map(|activity| activity.start)
        .collect();

    Coordinate::mean(&starts).map(|position| HomeLocation {
        position,
        sample_size: starts.len(),
    })
}
