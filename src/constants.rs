// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Constants Module
//!
//! Protocol identifiers, external endpoints, environment variable names and
//! tool names shared across the crate.

/// Protocol-related constants
pub mod protocol {
    use std::env;

    /// MCP protocol version advertised in `initialize`
    pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

    /// JSON-RPC version (standard, not configurable)
    pub const JSONRPC_VERSION: &str = "2.0";

    pub const SERVER_NAME: &str = "chathletique-mcp";

    /// Server version from Cargo.toml
    pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

    /// Server name, overridable through `SERVER_NAME`
    pub fn server_name() -> String {
        env::var("SERVER_NAME").unwrap_or_else(|_| SERVER_NAME.to_string())
    }
}

/// Environment variable names and port defaults
pub mod env_config {
    pub const STRAVA_ACCESS_TOKEN: &str = "STRAVA_ACCESS_TOKEN";
    pub const ORS_KEY: &str = "ORS_KEY";
    pub const GOOGLE_MAP_API_KEY: &str = "GOOGLE_MAP_API_KEY";
    pub const WEATHER_API_KEY: &str = "WEATHER_API_KEY";

    pub const DEFAULT_MCP_PORT: u16 = 8080;
    pub const DEFAULT_HTTP_PORT: u16 = 3000;
}

/// JSON-RPC and MCP error codes
pub mod errors {
    /// Invalid JSON was received
    pub const ERROR_PARSE: i32 = -32700;

    /// Valid JSON that is not a request object
    pub const ERROR_INVALID_REQUEST: i32 = -32600;

    /// Method not found
    pub const ERROR_METHOD_NOT_FOUND: i32 = -32601;

    /// Invalid parameters
    pub const ERROR_INVALID_PARAMS: i32 = -32602;

    /// Internal error
    pub const ERROR_INTERNAL_ERROR: i32 = -32603;

    pub const MSG_PARSE_ERROR: &str = "Parse error";
    pub const MSG_INVALID_REQUEST: &str = "Invalid request";
    pub const MSG_METHOD_NOT_FOUND: &str = "Method not found";
    pub const MSG_MISSING_STRAVA_TOKEN: &str =
        "No Strava access token configured (STRAVA_ACCESS_TOKEN)";
}

/// API endpoints and URLs
pub mod endpoints {
    pub const STRAVA_API_BASE: &str = "https://www.strava.com/api/v3";
    pub const ORS_API_BASE: &str = "https://api.openrouteservice.org";
    pub const GOOGLE_ROUTES_URL: &str = "https://routes.googleapis.com/directions/v2:computeRoutes";
    pub const NOMINATIM_BASE: &str = "https://nominatim.openstreetmap.org";
    pub const OPENWEATHER_BASE: &str = "https://api.openweathermap.org";
    pub const GOOGLE_MAPS_DIRECTIONS: &str = "https://www.google.com/maps/dir/";

    /// Response fields requested from the Routes API
    pub const GOOGLE_ROUTES_FIELD_MASK: &str =
        "routes.distanceMeters,routes.duration,routes.polyline.encodedPolyline";
}

/// HTTP routes and paths
pub mod routes {
    pub const MCP: &str = "mcp";
    pub const HEALTH: &str = "health";
}

/// Numeric limits and thresholds
pub mod limits {
    /// Activities returned by `get_last_runs` when no limit is given
    pub const DEFAULT_LAST_RUNS_LIMIT: usize = 10;
    pub const MAX_ACTIVITIES_FETCH: usize = 100;

    /// Meters per degree of latitude
    pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

    /// Longest loop the itinerary tools will plan
    pub const MAX_ITINERARY_KM: f64 = 200.0;

    pub const METERS_PER_KILOMETER: f64 = 1000.0;
    pub const SECONDS_PER_MINUTE: f64 = 60.0;
    /// m/s to km/h
    pub const MS_TO_KMH: f64 = 3.6;

    /// Lifetime of a geocoding cache entry
    pub const GEOCODE_CACHE_SECS: u64 = 24 * 60 * 60;
}

/// MCP tool names
pub mod tools {
    pub const GET_USER_STATS: &str = "get_user_stats";
    pub const GET_LAST_RUNS: &str = "get_last_runs";
    pub const CREATE_ITINERARY: &str = "create_itinerary";
    pub const CREATE_SEGMENT_ITINERARY: &str = "create_segment_itinerary";
    pub const GET_WEATHER_PREDICTION: &str = "get_weather_prediction";
    pub const GET_ACTIVITY_SERIES: &str = "get_activity_series";
}

/// Common JSON field names
pub mod json_fields {
    pub const NAME: &str = "name";
    pub const ARGUMENTS: &str = "arguments";
    pub const LIMIT: &str = "limit";
    pub const STARTING_PLACE: &str = "starting_place";
    pub const DISTANCE_KM: &str = "distance_km";
    pub const PLACE_NAME: &str = "place_name";
    pub const NUMBER_OF_ACTIVITY: &str = "number_of_activity";
    pub const RESOLUTION: &str = "resolution";
    pub const SERIES_TYPE: &str = "series_type";
    pub const SLICE_STEP: &str = "slice_step";
}
