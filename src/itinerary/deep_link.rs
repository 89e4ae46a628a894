// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use url::form_urlencoded;

use crate::constants::endpoints::GOOGLE_MAPS_DIRECTIONS;
use crate::models::Coordinate;

/// Google Maps directions link for a loop starting and ending at `origin`
///
/// Waypoints that print the same as the origin are dropped. Without
/// waypoints the link only carries the destination.
pub fn google_maps_directions_link(origin: Coordinate, waypoints: &[Coordinate]) -> String {
    let origin_text = origin.to_string();
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("api", "1");

    if waypoints.is_empty() {
        query.append_pair("destination", &origin_text);
    } else {
        let stops = waypoints
            .iter()
            .map(Coordinate::to_string)
            .filter(|stop| *stop != origin_text)
            .collect::<Vec<_>>()
            .join("|");
        query
            .append_pair("origin", &origin_text)
            .append_pair("destination", &origin_text)
            .append_pair("waypoints", &stops);
    }

    format!("{}?{}", GOOGLE_MAPS_DIRECTIONS, query.finish())
}
