// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::constants::limits::METERS_PER_DEGREE_LAT;
use crate::models::{BoundingBox, Coordinate};

/// Square of side `distance_m` centred on `center`, split into quadrants
///
/// Returned in order south-west, south-east, north-west, north-east.
/// Segment exploration returns few results per request, so querying four
/// smaller boxes surfaces more candidates than one large box.
pub fn bounds_for_run(center: Coordinate, distance_m: f64) -> [BoundingBox; 4] {
    let half = distance_m / 2.0;
    let dlat = half / METERS_PER_DEGREE_LAT;
    let dlon = half / (METERS_PER_DEGREE_LAT * center.lat.to_radians().cos());

    let (min_lat, max_lat) = (center.lat - dlat, center.lat + dlat);
    let (min_lon, max_lon) = (center.lon - dlon, center.lon + dlon);
    let (mid_lat, mid_lon) = ((min_lat + max_lat) / 2.0, (min_lon + max_lon) / 2.0);

    [
        BoundingBox::new(min_lat, min_lon, mid_lat, mid_lon),
        BoundingBox::new(min_lat, mid_lon, mid_lat, max_lon),
        BoundingBox::new(mid_lat, min_lon, max_lat, mid_lon),
        BoundingBox::new(mid_lat, mid_lon, max_lat, max_lon),
    ]
}
