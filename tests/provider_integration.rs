// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Integration tests for the provider clients
//!
//! Every client is pointed at a mockito server so the request shape and the
//! response decoding are both exercised over real HTTP.

use anyhow::Result;
use chathletique_mcp::intelligence::{LocationService, WeatherService};
use chathletique_mcp::models::{BoundingBox, Coordinate};
use chathletique_mcp::providers::google_routes::GoogleRoutesClient;
use chathletique_mcp::providers::openrouteservice::OpenRouteServiceClient;
use chathletique_mcp::providers::strava::StravaProvider;
use chathletique_mcp::providers::{
    build_http_client, ActivityProvider, ForecastProvider, Geocoder, ProviderError,
    RoundTripRequest, RoundTripRouter, SegmentExplorer, WaypointRouter,
};
use mockito::{Matcher, Server};
use serde_json::json;
use std::time::Duration;

fn http_client() -> reqwest::Client {
    build_http_client("chathletique-tests", Duration::from_secs(5)).unwrap()
}

fn strava(server: &Server) -> StravaProvider {
    StravaProvider::with_base_url(http_client(), server.url(), Some("test_token".to_string()))
}

/// Helper to create a mock Strava activities response
fn mock_strava_activities_response() -> serde_json::Value {
    json!([
        {
            "id": 1001,
            "name": "Morning Run",
            "type": "Run",
            "start_date": "2024-01-15T08:00:00Z",
            "start_date_local": "2024-01-15T09:00:00Z",
            "distance": 5000.0,
            "moving_time": 1500,
            "elapsed_time": 1800,
            "average_speed": 3.33,
            "max_speed": 4.17,
            "average_heartrate": 150.0,
            "total_elevation_gain": 42.0,
            "start_latlng": [48.8566, 2.3522]
        },
        {
            "id": 1002,
            "name": "Evening Ride",
            "type": "Ride",
            "start_date": "2024-01-14T18:00:00Z",
            "distance": 25000.0,
            "moving_time": 3600,
            "elapsed_time": 3700,
            "start_latlng": []
        }
    ])
}

#[tokio::test]
async fn test_strava_activities() -> Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/athlete/activities")
        .match_header("authorization", "Bearer test_token")
        .match_query(Matcher::UrlEncoded("per_page".into(), "2".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(mock_strava_activities_response().to_string())
        .create_async()
        .await;

    let activities = strava(&server).get_activities(2).await?;
    mock.assert_async().await;

    assert_eq!(activities.len(), 2);
    assert!(activities[0].is_run());
    assert_eq!(activities[0].start, Some(Coordinate::new(48.8566, 2.3522)));
    assert_eq!(activities[0].moving_time_s, 1500);
    assert!(!activities[1].is_run());
    assert_eq!(activities[1].start, None);
    Ok(())
}

#[tokio::test]
async fn test_strava_stats_resolves_athlete_first() -> Result<()> {
    let mut server = Server::new_async().await;
    let athlete = server
        .mock("GET", "/athlete")
        .with_status(200)
        .with_body(json!({ "id": 12345 }).to_string())
        .create_async()
        .await;
    let stats = server
        .mock("GET", "/athletes/12345/stats")
        .with_status(200)
        .with_body(
            json!({
                "recent_run_totals": { "count": 4, "distance": 32000.0, "moving_time": 10000, "elapsed_time": 11000, "elevation_gain": 120.0 },
                "ytd_run_totals": { "count": 40, "distance": 320000.0, "moving_time": 100000, "elapsed_time": 110000, "elevation_gain": 1200.0 },
                "all_run_totals": { "count": 400, "distance": 3200000.0, "moving_time": 1000000, "elapsed_time": 1100000, "elevation_gain": 12000.0 },
                "all_ride_totals": { "count": 1 }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let totals = strava(&server).get_athlete_stats().await?;
    athlete.assert_async().await;
    stats.assert_async().await;

    assert_eq!(totals.recent_run_totals.count, 4);
    assert_eq!(totals.all_run_totals.distance, 3_200_000.0);
    Ok(())
}

#[tokio::test]
async fn test_strava_streams_keyed_by_type() -> Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/activities/1001/streams")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded(
                "keys".into(),
                "time,distance,velocity_smooth,heartrate".into(),
            ),
            Matcher::UrlEncoded("key_by_type".into(), "true".into()),
            Matcher::UrlEncoded("resolution".into(), "medium".into()),
            Matcher::UrlEncoded("series_type".into(), "time".into()),
        ]))
        .with_status(200)
        .with_body(
            json!({
                "time": { "data": [0.0, 1.0, 2.0] },
                "heartrate": { "data": [120.0, 125.0, 130.0] }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let streams = strava(&server)
        .get_activity_streams(1001, "medium", "time")
        .await?;
    mock.assert_async().await;

    assert_eq!(streams.time, Some(vec![0.0, 1.0, 2.0]));
    assert_eq!(streams.heartrate, Some(vec![120.0, 125.0, 130.0]));
    assert_eq!(streams.velocity_smooth, None);
    Ok(())
}

#[tokio::test]
async fn test_strava_explore_decodes_segments() -> Result<()> {
    let mut server = Server::new_async().await;
    let bounds = BoundingBox::new(48.0, 2.0, 48.1, 2.1);
    let mock = server
        .mock("GET", "/segments/explore")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("bounds".into(), bounds.to_query()),
            Matcher::UrlEncoded("activity_type".into(), "running".into()),
        ]))
        .with_status(200)
        .with_body(
            json!({
                "segments": [{
                    "id": 229781,
                    "name": "Hawk Hill",
                    "distance": 2684.82,
                    "points": "_p~iF~ps|U_ulLnnqC_mqNvxq`@",
                    "start_latlng": [38.5, -120.2],
                    "end_latlng": [43.252, -126.453]
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let segments = strava(&server).explore_segments(&bounds).await?;
    mock.assert_async().await;

    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].id, 229781);
    assert_eq!(segments[0].points.len(), 3);
    assert_eq!(segments[0].end, Coordinate::new(43.252, -126.453));
    Ok(())
}

#[tokio::test]
async fn test_strava_error_status_keeps_body() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/athlete/activities")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"message":"Authorization Error"}"#)
        .create_async()
        .await;

    let err = strava(&server).get_activities(5).await.unwrap_err();
    match err {
        ProviderError::Status { status, body, .. } => {
            assert_eq!(status, 401);
            assert!(body.contains("Authorization Error"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_openrouteservice_round_trip() -> Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v2/directions/foot-walking/geojson")
        .match_header("authorization", "ors_key")
        .match_body(Matcher::PartialJson(json!({
            "coordinates": [[2.3522, 48.8566]],
            "options": { "round_trip": { "points": 5, "seed": 3 } }
        })))
        .with_status(200)
        .with_body(
            json!({
                "type": "FeatureCollection",
                "features": [{
                    "geometry": { "coordinates": [[2.3522, 48.8566, 35.0], [2.36, 48.86], [2.3522, 48.8566]] },
                    "properties": { "summary": { "distance": 10987.4, "duration": 7900.1 } }
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client =
        OpenRouteServiceClient::with_base_url(http_client(), server.url(), Some("ors_key".into()));
    let route = client
        .round_trip(&RoundTripRequest {
            origin: Coordinate::new(48.8566, 2.3522),
            length_m: 11000.0,
            points: 5,
            seed: 3,
            profile: "foot-walking".to_string(),
        })
        .await?;
    mock.assert_async().await;

    assert_eq!(route.coordinates.len(), 3);
    assert_eq!(route.coordinates[1], Coordinate::new(48.86, 2.36));
    assert_eq!(route.distance_m, 10987.4);
    Ok(())
}

#[tokio::test]
async fn test_openrouteservice_empty_collection_is_no_route() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/v2/directions/foot-walking/geojson")
        .with_status(200)
        .with_body(json!({ "features": [] }).to_string())
        .create_async()
        .await;

    let client =
        OpenRouteServiceClient::with_base_url(http_client(), server.url(), Some("k".into()));
    let err = client
        .round_trip(&RoundTripRequest {
            origin: Coordinate::new(48.0, 2.0),
            length_m: 3300.0,
            points: 2,
            seed: 0,
            profile: "foot-walking".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::NoRoute { .. }));
}

#[tokio::test]
async fn test_google_routes_through_waypoints() -> Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/directions/v2:computeRoutes")
        .match_header("x-goog-api-key", "google_key")
        .match_header("x-goog-fieldmask", Matcher::Any)
        .match_body(Matcher::PartialJson(json!({
            "travelMode": "WALK",
            "origin": { "location": { "latLng": { "latitude": 48.0, "longitude": 2.0 } } },
            "intermediates": [{ "location": { "latLng": { "latitude": 48.01, "longitude": 2.01 } } }]
        })))
        .with_status(200)
        .with_body(
            json!({
                "routes": [{
                    "distanceMeters": 9950,
                    "duration": "6000s",
                    "polyline": { "encodedPolyline": "_p~iF~ps|U" }
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = GoogleRoutesClient::with_url(
        http_client(),
        format!("{}/directions/v2:computeRoutes", server.url()),
        Some("google_key".into()),
        "walk",
    );
    let summary = client
        .route_through(
            Coordinate::new(48.0, 2.0),
            Coordinate::new(48.0, 2.0),
            &[Coordinate::new(48.01, 2.01)],
        )
        .await?;
    mock.assert_async().await;

    assert_eq!(summary.distance_m, 9950.0);
    assert_eq!(summary.duration.as_deref(), Some("6000s"));
    Ok(())
}

#[tokio::test]
async fn test_missing_keys_fail_before_any_request() {
    let client = OpenRouteServiceClient::with_base_url(http_client(), "http://127.0.0.1:9", None);
    let err = client
        .round_trip(&RoundTripRequest {
            origin: Coordinate::new(48.0, 2.0),
            length_m: 3300.0,
            points: 2,
            seed: 0,
            profile: "foot-walking".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::MissingCredential(_)));

    let weather = WeatherService::with_base_url(http_client(), "http://127.0.0.1:9", None, "metric");
    let err = weather.forecast(Coordinate::new(48.0, 2.0)).await.unwrap_err();
    assert!(matches!(err, ProviderError::MissingCredential(_)));
}

#[tokio::test]
async fn test_geocoding_is_cached() -> Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "Opéra, Paris".into()),
            Matcher::UrlEncoded("format".into(), "json".into()),
            Matcher::UrlEncoded("limit".into(), "1".into()),
        ]))
        .with_status(200)
        .with_body(
            json!([{ "lat": "48.8720", "lon": "2.3316", "display_name": "Opéra, Paris" }])
                .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let service = LocationService::with_base_url(http_client(), server.url());
    let first = service.geocode("Opéra, Paris").await?;
    let second = service.geocode("  opéra, paris ").await?;
    mock.assert_async().await;

    assert_eq!(first, Coordinate::new(48.872, 2.3316));
    assert_eq!(first, second);
    assert_eq!(service.cache_stats().await, (1, 0));
    Ok(())
}

#[tokio::test]
async fn test_geocoding_cache_expires() -> Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(json!([{ "lat": "45.764", "lon": "4.8357" }]).to_string())
        .expect(2)
        .create_async()
        .await;

    let service = LocationService::with_base_url(http_client(), server.url())
        .with_cache_duration(Duration::ZERO);
    service.geocode("Lyon").await?;
    service.geocode("Lyon").await?;
    mock.assert_async().await;

    assert_eq!(service.cache_stats().await, (1, 1));
    Ok(())
}

#[tokio::test]
async fn test_geocoding_unknown_place() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let service = LocationService::with_base_url(http_client(), server.url());
    let err = service.geocode("Nowhere at all").await.unwrap_err();
    assert!(matches!(err, ProviderError::PlaceNotFound(place) if place == "Nowhere at all"));
}

#[tokio::test]
async fn test_forecast_query_and_filtering() -> Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/data/2.5/forecast")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("lat".into(), "48.8566".into()),
            Matcher::UrlEncoded("lon".into(), "2.3522".into()),
            Matcher::UrlEncoded("appid".into(), "weather_key".into()),
            Matcher::UrlEncoded("units".into(), "imperial".into()),
        ]))
        .with_status(200)
        .with_body(
            json!({
                "city": { "name": "Paris", "timezone": 7200, "sunrise": 1700000000, "sunset": 1700030000 },
                "list": [
                    {
                        "dt": 1700006400,
                        "main": { "temp": 50.5, "feels_like": 48.0, "humidity": 81, "pressure": 1012 },
                        "weather": [{ "main": "Rain", "description": "light rain", "icon": "10d" }],
                        "wind": { "speed": 9.2, "deg": 240, "gust": 15.1 },
                        "pop": 0.6,
                        "rain": { "3h": 1.2 },
                        "visibility": 10000
                    },
                    {
                        "dt": 1700017200,
                        "main": { "temp": 52.0 },
                        "weather": [{ "main": "Clouds" }],
                        "wind": {}
                    }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let service = WeatherService::with_base_url(
        http_client(),
        server.url(),
        Some("weather_key".into()),
        "imperial",
    );
    let summary = service.forecast(Coordinate::new(48.8566, 2.3522)).await?;
    mock.assert_async().await;

    assert_eq!(summary.city.name.as_deref(), Some("Paris"));
    assert_eq!(summary.entries.len(), 2);
    assert_eq!(summary.entries[0].rain, 1.2);
    assert_eq!(summary.entries[0].weather.description.as_deref(), Some("light rain"));
    assert_eq!(summary.entries[1].rain, 0.0);
    assert_eq!(summary.entries[1].wind.speed, None);
    Ok(())
}
