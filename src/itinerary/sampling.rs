// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::models::Coordinate;

/// Number of points kept for a route of `distance_km`: one per started
/// kilometre plus one, never fewer than two
pub fn sample_count(distance_km: f64) -> usize {
    // float-to-int casts saturate, and NaN becomes 0
    let per_km = (distance_km.ceil() + 1.0) as usize;
    per_km.max(2)
}

/// Evenly spaced subset of `coordinates`, first and last included
///
/// Indices are `round(i * (N - 1) / (k - 1))` with ties to even, so short
/// routes repeat points rather than inventing new ones.
pub fn downsample(coordinates: &[Coordinate], distance_km: f64) -> Vec<Coordinate> {
    if coordinates.len() <= 1 {
        return coordinates.to_vec();
    }

    let k = sample_count(distance_km);
    let last = coordinates.len() - 1;
    (0..k)
        .map(|i| {
            let index = (i as f64 * last as f64 / (k - 1) as f64).round_ties_even() as usize;
            coordinates[index.min(last)]
        })
        .collect()
}
