// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Segment-anchored refiner
//!
//! A popular segment is turned into a loop from the runner's start by
//! appending one synthetic waypoint past the segment end. The waypoint is
//! moved diagonally by a halving step until the loop length lands within
//! the tolerance of the target.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use tracing::{debug, warn};

use super::{bounds_for_run, NotFoundReason, Refinement, SegmentLoop};
use crate::config::ItinerarySettings;
use crate::logging::AppLogger;
use crate::models::{Coordinate, Segment};
use crate::providers::{ProviderError, SegmentExplorer, WaypointRouter};

/// Start, quarter point, three-quarter point and end of a segment
///
/// A segment without decoded points yields only its endpoints.
pub fn segment_path(segment: &Segment) -> Vec<Coordinate> {
    let n = segment.points.len();
    if n == 0 {
        return vec![segment.start, segment.end];
    }
    vec![
        segment.start,
        segment.points[n / 4],
        segment.points[3 * n / 4],
        segment.end,
    ]
}

/// A segment is worth extending when reaching it costs strictly between a
/// third and a half of the loop.
pub fn within_approach_window(approach_m: f64, target_m: f64) -> bool {
    approach_m > target_m / 3.0 && approach_m < target_m / 2.0
}

/// One-way distance from `origin` to the segment start through its
/// interior path points
pub async fn approach_distance<R>(
    router: &R,
    origin: Coordinate,
    segment: &Segment,
) -> Result<f64, ProviderError>
where
    R: WaypointRouter + ?Sized,
{
    let path = segment_path(segment);
    let interior = &path[1..path.len() - 1];
    let summary = router.route_through(origin, segment.start, interior).await?;
    Ok(summary.distance_m)
}

/// Keep the segments whose approach distance falls in the window
pub async fn prefilter_segments<R>(
    router: &R,
    origin: Coordinate,
    segments: &[Segment],
    target_m: f64,
) -> Result<Vec<Segment>, ProviderError>
where
    R: WaypointRouter + ?Sized,
{
    let mut kept = Vec::new();
    for segment in segments {
        let approach_m = approach_distance(router, origin, segment).await?;
        let accepted = within_approach_window(approach_m, target_m);
        debug!(
            segment_id = segment.id,
            approach_m, accepted, "Segment approach distance"
        );
        if accepted {
            kept.push(segment.clone());
        }
    }
    Ok(kept)
}

/// Segments near `origin`, gathered from the four quadrants of the run's
/// bounding box and deduplicated by id
pub async fn explore_run_segments<E>(
    explorer: &E,
    origin: Coordinate,
    distance_m: f64,
) -> Result<Vec<Segment>, ProviderError>
where
    E: SegmentExplorer + ?Sized,
{
    let mut seen = HashSet::new();
    let mut segments = Vec::new();
    for tile in bounds_for_run(origin, distance_m) {
        for segment in explorer.explore_segments(&tile).await? {
            if seen.insert(segment.id) {
                segments.push(segment);
            }
        }
    }
    Ok(segments)
}

/// Fit a loop through one segment
///
/// The waypoint starts at `end + (step, step)`. After each call that misses
/// the tolerance it moves by `+step` on both axes when the loop is too short
/// and `-step` when too long, then the step halves. A length that moves
/// against the previous adjustment abandons the segment.
pub async fn refine_segment<R>(
    router: &R,
    origin: Coordinate,
    segment: &Segment,
    target_m: f64,
    settings: &ItinerarySettings,
) -> Refinement<SegmentLoop>
where
    R: WaypointRouter + ?Sized,
{
    let base_path = segment_path(segment);
    let mut step = settings.bisection_initial_step_deg;
    let mut offset = step;
    let mut previous: Option<(f64, f64)> = None;

    for iteration in 0..settings.bisection_iterations {
        let waypoint = segment.end.offset(offset, offset);
        let mut path = base_path.clone();
        path.push(waypoint);

        let distance_m = match router.route_through(origin, origin, &path).await {
            Ok(summary) => summary.distance_m,
            Err(e) => return Refinement::ProviderError(e),
        };

        debug!(
            segment_id = segment.id,
            iteration, offset, distance_m, target_m, "Bisection step"
        );

        if (distance_m - target_m).abs() < settings.bisection_tolerance_m {
            return Refinement::Converged {
                value: SegmentLoop {
                    origin,
                    path,
                    distance_m,
                    segment_id: segment.id,
                    segment_name: segment.name.clone(),
                },
                attempts: iteration + 1,
            };
        }

        if let Some((previous_offset, previous_distance)) = previous {
            let pushed_out = offset > previous_offset;
            if (pushed_out && distance_m < previous_distance)
                || (!pushed_out && distance_m > previous_distance)
            {
                warn!(
                    segment_id = segment.id,
                    previous_distance, distance_m, "Route length moved against the waypoint offset"
                );
                return Refinement::NotFound(NotFoundReason::NonMonotonic);
            }
        }
        previous = Some((offset, distance_m));

        if distance_m < target_m {
            offset += step;
        } else {
            offset -= step;
        }
        step /= 2.0;
    }

    Refinement::NotFound(NotFoundReason::BudgetExhausted)
}

/// Try shuffled candidate segments until one converges
///
/// Candidates are first filtered on their approach distance. Shuffling uses
/// the caller's generator so tests can fix the order.
pub async fn refine_by_bisection<R, G>(
    router: &R,
    origin: Coordinate,
    segments: &[Segment],
    target_m: f64,
    settings: &ItinerarySettings,
    rng: &mut G,
) -> Refinement<SegmentLoop>
where
    R: WaypointRouter + ?Sized,
    G: Rng + ?Sized,
{
    let mut candidates = match prefilter_segments(router, origin, segments, target_m).await {
        Ok(candidates) => candidates,
        Err(e) => {
            AppLogger::log_refinement("bisection", "provider_error", 0, None, target_m);
            return Refinement::ProviderError(e);
        }
    };

    if candidates.is_empty() {
        AppLogger::log_refinement("bisection", "no_candidate_segments", 0, None, target_m);
        return Refinement::NotFound(NotFoundReason::NoCandidateSegments);
    }

    candidates.shuffle(rng);

    let mut saw_non_monotonic = false;
    for segment in &candidates {
        match refine_segment(router, origin, segment, target_m, settings).await {
            Refinement::Converged { value, attempts } => {
                AppLogger::log_refinement(
                    "bisection",
                    "converged",
                    attempts,
                    Some(value.distance_m),
                    target_m,
                );
                return Refinement::Converged { value, attempts };
            }
            Refinement::NotFound(NotFoundReason::NonMonotonic) => saw_non_monotonic = true,
            Refinement::ProviderError(e) => return Refinement::ProviderError(e),
            _ => {}
        }
    }

    let reason = if saw_non_monotonic {
        NotFoundReason::NonMonotonic
    } else {
        NotFoundReason::BudgetExhausted
    };
    AppLogger::log_refinement("bisection", "not_found", 0, None, target_m);
    Refinement::NotFound(reason)
}
