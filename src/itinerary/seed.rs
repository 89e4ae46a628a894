// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Seed-perturbation refiner

use tracing::debug;

use super::{within_band, NotFoundReason, Refinement};
use crate::config::ItinerarySettings;
use crate::logging::AppLogger;
use crate::models::{Coordinate, Route};
use crate::providers::{RoundTripRequest, RoundTripRouter};

/// Values derived from a requested distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeedPlan {
    /// Requested distance after clamping to the minimum
    pub distance_km: f64,
    /// Length requested from the round-trip generator
    pub target_m: f64,
    /// Half-width of the inclusive acceptance band
    pub tolerance_m: f64,
    /// Generated waypoint count
    pub points: u32,
}

impl SeedPlan {
    pub fn new(requested_km: f64, settings: &ItinerarySettings) -> Self {
        let distance_km = settings.effective_distance_km(requested_km);
        Self {
            distance_km,
            target_m: settings.target_meters(distance_km),
            tolerance_m: settings.tolerance_meters(distance_km),
            points: settings.round_trip_points(distance_km),
        }
    }
}

/// Request round trips with seeds 0, 1, 2, ... until one falls inside the
/// band, at most `settings.max_seed_attempts` times.
///
/// When the budget runs out the last route is returned as
/// [`Refinement::BestEffort`]. A provider error stops the search.
pub async fn refine_by_seed<R>(
    router: &R,
    origin: Coordinate,
    target_km: f64,
    settings: &ItinerarySettings,
) -> Refinement<Route>
where
    R: RoundTripRouter + ?Sized,
{
    let plan = SeedPlan::new(target_km, settings);
    let mut last: Option<Route> = None;

    for seed in 0..settings.max_seed_attempts {
        let request = RoundTripRequest {
            origin,
            length_m: plan.target_m,
            points: plan.points,
            seed,
            profile: settings.profile.clone(),
        };

        let route = match router.round_trip(&request).await {
            Ok(route) => route,
            Err(e) => {
                AppLogger::log_refinement("seed", "provider_error", seed, None, plan.target_m);
                return Refinement::ProviderError(e);
            }
        };

        debug!(
            seed,
            distance_m = route.distance_m,
            target_m = plan.target_m,
            tolerance_m = plan.tolerance_m,
            "Round trip candidate"
        );

        if within_band(route.distance_m, plan.target_m, plan.tolerance_m) {
            AppLogger::log_refinement("seed", "converged", seed + 1, Some(route.distance_m), plan.target_m);
            return Refinement::Converged {
                value: route,
                attempts: seed + 1,
            };
        }
        last = Some(route);
    }

    match last {
        Some(route) => {
            AppLogger::log_refinement(
                "seed",
                "best_effort",
                settings.max_seed_attempts,
                Some(route.distance_m),
                plan.target_m,
            );
            Refinement::BestEffort {
                achieved_distance_m: route.distance_m,
                value: route,
                attempts: settings.max_seed_attempts,
            }
        }
        None => Refinement::NotFound(NotFoundReason::BudgetExhausted),
    }
}
