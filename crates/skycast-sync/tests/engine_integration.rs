//! Integration tests for the sync engine against a mock upstream and an
//! in-memory database.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use skycast_provider::{ProviderConfig, WeatherClient};
use skycast_store::{Db, LocationStore, LocationUpdate, NewLocation, SnapshotStore};
use skycast_sync::{SyncEngine, SyncError};

struct Harness {
    engine: Arc<SyncEngine>,
    locations: LocationStore,
    snapshots: SnapshotStore,
}

fn harness(server: &MockServer) -> Harness {
    let mut config = ProviderConfig::new("test-key");
    config.base_url = server.uri();
    config.forecast_url = server.uri();
    config.geocoding_url = server.uri();
    let client = Arc::new(WeatherClient::new(config).unwrap());

    let db = Db::in_memory().unwrap();
    let locations = LocationStore::new(db.clone());
    let snapshots = SnapshotStore::new(db);

    Harness {
        engine: Arc::new(SyncEngine::new(
            client,
            locations.clone(),
            snapshots.clone(),
        )),
        locations,
        snapshots,
    }
}

fn add_location(locations: &LocationStore, name: &str, lat: f64, lon: f64) -> i64 {
    locations
        .create(NewLocation {
            name: name.to_string(),
            country: "Nowhere".to_string(),
            latitude: lat,
            longitude: lon,
            timezone: None,
        })
        .unwrap()
        .id
}

fn weather_payload(temp: f64) -> serde_json::Value {
    serde_json::json!({
        "main": {
            "temp": temp,
            "feels_like": temp - 1.0,
            "temp_min": temp - 3.0,
            "temp_max": temp + 3.0,
            "pressure": 1012,
            "humidity": 55
        },
        "wind": { "speed": 4.0, "deg": 210 },
        "visibility": 10000,
        "clouds": { "all": 30 },
        "weather": [{ "main": "Clouds", "description": "scattered clouds", "icon": "03d" }],
        "sys": { "sunrise": 1704088800, "sunset": 1704117600 }
    })
}

/// Succeed for `lat`, letting any other coordinate fall through.
async fn mock_weather_for_lat(server: &MockServer, lat: &str, temp: f64) {
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("lat", lat))
        .respond_with(ResponseTemplate::new(200).set_body_json(weather_payload(temp)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_run_sync_isolates_per_location_failures() {
    let server = MockServer::start().await;
    let h = harness(&server);

    let good = add_location(&h.locations, "Goodville", 10.0, 20.0);
    let bad = add_location(&h.locations, "Badville", 30.0, 40.0);

    mock_weather_for_lat(&server, "10", 21.5).await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("lat", "30"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    h.engine.run_sync().await;

    let stats = h.engine.stats();
    assert_eq!(stats.total_syncs, 1);
    assert_eq!(stats.successful_syncs, 1);
    assert_eq!(stats.failed_syncs, 1);
    assert!(stats.last_sync_time.is_some());

    let saved = h.snapshots.latest(good).unwrap().unwrap();
    assert_eq!(saved.weather.temperature.current, 21.5);
    assert!(h.snapshots.latest(bad).unwrap().is_none());
}

#[tokio::test]
async fn test_run_sync_skips_inactive_locations() {
    let server = MockServer::start().await;
    let h = harness(&server);

    let active = add_location(&h.locations, "Active", 10.0, 20.0);
    let dormant = add_location(&h.locations, "Dormant", 30.0, 40.0);
    h.locations
        .update(
            dormant,
            LocationUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .unwrap();

    mock_weather_for_lat(&server, "10", 18.0).await;

    h.engine.run_sync().await;

    let stats = h.engine.stats();
    assert_eq!(stats.successful_syncs, 1);
    assert_eq!(stats.failed_syncs, 0);
    assert!(h.snapshots.latest(active).unwrap().is_some());
    assert!(h.snapshots.latest(dormant).unwrap().is_none());
}

#[tokio::test]
async fn test_run_sync_with_no_locations_still_counts_a_cycle() {
    let server = MockServer::start().await;
    let h = harness(&server);

    h.engine.run_sync().await;

    let stats = h.engine.stats();
    assert_eq!(stats.total_syncs, 1);
    assert_eq!(stats.successful_syncs, 0);
    assert_eq!(stats.failed_syncs, 0);
    assert!(stats.last_sync_time.is_some());
}

#[tokio::test]
async fn test_sync_single_location_saves_and_skips_cycle_counter() {
    let server = MockServer::start().await;
    let h = harness(&server);

    let id = add_location(&h.locations, "Solo", 10.0, 20.0);
    mock_weather_for_lat(&server, "10", 25.0).await;

    let snapshot = h.engine.sync_single_location(id).await.unwrap();

    assert_eq!(snapshot.weather.temperature.current, 25.0);
    assert_eq!(snapshot.weather.api_source, "openweathermap");
    assert_eq!(snapshot.location.unwrap().id, id);

    // On-demand refreshes are out-of-band for the cycle counters.
    let stats = h.engine.stats();
    assert_eq!(stats.total_syncs, 0);
    assert_eq!(stats.successful_syncs, 0);
    assert!(stats.last_sync_time.is_none());
}

#[tokio::test]
async fn test_sync_single_location_unknown_id() {
    let server = MockServer::start().await;
    let h = harness(&server);

    let err = h.engine.sync_single_location(999).await.unwrap_err();
    assert!(matches!(err, SyncError::LocationNotFound(999)));
    assert_eq!(err.kind(), "not_found");
    assert_eq!(err.to_string(), "Location not found: 999");
}

#[tokio::test]
async fn test_sync_single_location_surfaces_provider_error() {
    let server = MockServer::start().await;
    let h = harness(&server);

    let id = add_location(&h.locations, "Unlucky", 10.0, 20.0);
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = h.engine.sync_single_location(id).await.unwrap_err();
    assert!(matches!(err, SyncError::Provider(_)));
    assert_eq!(err.kind(), "rate_limit");
    assert_eq!(err.status_code(), 429);
}

#[tokio::test]
async fn test_start_runs_immediately_and_is_idempotent() {
    let server = MockServer::start().await;
    let h = harness(&server);

    add_location(&h.locations, "Testville", 10.0, 20.0);
    mock_weather_for_lat(&server, "10", 19.0).await;

    h.engine.start(60);
    tokio::time::sleep(Duration::from_millis(300)).await;

    let stats = h.engine.stats();
    assert!(stats.is_running);
    assert_eq!(stats.interval_minutes, Some(60));
    assert_eq!(stats.total_syncs, 1);
    assert_eq!(stats.successful_syncs, 1);

    // Second start must not arm a second timer.
    h.engine.start(60);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(h.engine.stats().total_syncs, 1);

    h.engine.stop();
    let stats = h.engine.stats();
    assert!(!stats.is_running);
    assert_eq!(stats.interval_minutes, None);
    // Counters survive a stop.
    assert_eq!(stats.total_syncs, 1);
}

#[tokio::test]
async fn test_stop_lets_in_flight_cycle_finish() {
    let server = MockServer::start().await;
    let h = harness(&server);

    let id = add_location(&h.locations, "Slowtown", 10.0, 20.0);
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(weather_payload(14.0))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    h.engine.start(60);
    // The first cycle is now waiting on the slow upstream.
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.engine.stop();
    assert!(!h.engine.stats().is_running);

    // The cycle still runs to completion and lands its tallies.
    tokio::time::sleep(Duration::from_millis(500)).await;
    let stats = h.engine.stats();
    assert_eq!(stats.total_syncs, 1);
    assert_eq!(stats.successful_syncs, 1);
    assert!(stats.last_sync_time.is_some());
    assert!(h.snapshots.latest(id).unwrap().is_some());
}

#[tokio::test]
async fn test_stop_without_start_is_a_no_op() {
    let server = MockServer::start().await;
    let h = harness(&server);

    h.engine.stop();
    let stats = h.engine.stats();
    assert!(!stats.is_running);
    assert_eq!(stats.total_syncs, 0);
}
