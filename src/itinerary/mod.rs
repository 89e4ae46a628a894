// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Itinerary planning
//!
//! Distance-targeted loop generation on top of black-box routing providers.
//! Two route-length refiners share the same shape: ask a provider for a
//! candidate, compare the reported length to a tolerance band, perturb one
//! parameter and retry within a fixed budget.
//!
//! - [`seed::refine_by_seed`] perturbs the round-trip generator's seed.
//! - [`bisection::refine_by_bisection`] extends a popular segment with a
//!   synthetic waypoint and halves its offset step until the loop fits.
//!
//! Both return a [`Refinement`], which keeps "converged", "close enough",
//! "provider failed" and "nothing found" apart.

use serde::Serialize;
use std::fmt;

use crate::models::Coordinate;
use crate::providers::ProviderError;

pub mod bisection;
pub mod bounds;
pub mod deep_link;
pub mod sampling;
pub mod seed;

pub use bisection::{refine_by_bisection, refine_segment};
pub use bounds::bounds_for_run;
pub use deep_link::google_maps_directions_link;
pub use sampling::downsample;
pub use seed::refine_by_seed;

/// Outcome of a route-length refinement
///
/// `attempts` counts the routing requests spent on the returned value.
#[derive(Debug)]
pub enum Refinement<T> {
    /// Within the tolerance band
    Converged { value: T, attempts: u32 },
    /// Budget exhausted; the last candidate is returned as-is
    BestEffort {
        value: T,
        achieved_distance_m: f64,
        attempts: u32,
    },
    /// A provider call failed and the refinement stopped
    ProviderError(ProviderError),
    /// No candidate could be produced
    NotFound(NotFoundReason),
}

impl<T> Refinement<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Refinement::Converged { value, .. } | Refinement::BestEffort { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, Refinement::Converged { .. })
    }

    pub fn attempts(&self) -> Option<u32> {
        match self {
            Refinement::Converged { attempts, .. } | Refinement::BestEffort { attempts, .. } => {
                Some(*attempts)
            }
            _ => None,
        }
    }

    /// Short label for logs and tool output
    pub fn outcome(&self) -> &'static str {
        match self {
            Refinement::Converged { .. } => "converged",
            Refinement::BestEffort { .. } => "best_effort",
            Refinement::ProviderError(_) => "provider_error",
            Refinement::NotFound(_) => "not_found",
        }
    }
}

/// Why a refinement produced nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundReason {
    /// Every explored segment failed the approach-distance filter
    NoCandidateSegments,
    /// Every candidate used up its iteration budget
    BudgetExhausted,
    /// Route length stopped tracking the waypoint offset on some candidate
    /// and no other candidate converged
    NonMonotonic,
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            NotFoundReason::NoCandidateSegments => "no segment is at a suitable distance from the start",
            NotFoundReason::BudgetExhausted => "no candidate reached the target distance within the iteration budget",
            NotFoundReason::NonMonotonic => "route length did not respond monotonically to the waypoint offset",
        };
        f.write_str(text)
    }
}

/// A loop through a popular segment, closed by a synthetic waypoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentLoop {
    /// Start and end of the loop
    pub origin: Coordinate,
    /// Segment start, quarter point, three-quarter point, segment end,
    /// synthetic waypoint
    pub path: Vec<Coordinate>,
    /// Round-trip length reported by the router
    pub distance_m: f64,
    pub segment_id: u64,
    pub segment_name: String,
}

/// Inclusive acceptance band used by the seed variant
pub(crate) fn within_band(distance_m: f64, target_m: f64, tolerance_m: f64) -> bool {
    distance_m >= target_m - tolerance_m && distance_m <= target_m + tolerance_m
}
