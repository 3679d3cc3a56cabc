use httpmock::prelude::*;
use ramen_density::app::{self, shops, tiles};
use ramen_density::domain::ports::ConfigProvider;
use ramen_density::{
    AreaRequest, GeoPoint, HeatmapConfig, HeatmapError, OverpassClient, RequestState,
};
use std::time::Duration;

fn config_for(server: &MockServer, extra: &str) -> HeatmapConfig {
    let toml_content = format!(
        r#"
[upstream]
endpoint = "{}"
timeout_seconds = 5
max_retries = 3
retry_delay_ms = 10
{}
"#,
        server.url("/api/interpreter"),
        extra
    );
    HeatmapConfig::from_toml_str(&toml_content).unwrap()
}

fn ikebukuro_elements() -> serde_json::Value {
    serde_json::json!({
        "version": 0.6,
        "elements": [
            { "type": "node", "id": 1, "lat": 35.7295, "lon": 139.7027,
              "tags": { "name": "一蘭 池袋店", "amenity": "restaurant", "cuisine": "ramen" } },
            { "type": "node", "id": 2, "lat": 35.7320, "lon": 139.7109,
              "tags": { "name:ja": "無敵家", "ramen:type": "家系" } },
            { "type": "node", "id": 3, "lat": 35.7250, "lon": 139.7150 },
            { "type": "way", "id": 4, "tags": { "name": "no coordinates" } },
            { "type": "node", "id": 5, "lat": 35.7321, "lon": 139.7108,
              "tags": { "name": "Jiro Ikebukuro", "description": "ラーメン二郎系" } }
        ]
    })
}

#[tokio::test]
async fn test_tile_end_to_end_through_overpass() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/interpreter")
            .body_contains("data=");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(ikebukuro_elements());
    });

    let config = config_for(&server, "");
    let scheduler = app::build_scheduler(OverpassClient::from_config(&config), &config);

    let points = tiles::tile_density(&scheduler, 15, 29100, 12897).await;

    api_mock.assert();
    // id 3 lies south of the tile and id 4 has no coordinates
    let total: u32 = points.iter().map(|p| p.density).sum();
    assert_eq!(total, 3);
    assert!(points.iter().any(|p| p.density == 2));
}

#[tokio::test]
async fn test_tile_is_empty_when_upstream_keeps_failing() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/api/interpreter");
        then.status(500);
    });

    let config = config_for(&server, "");
    let scheduler = app::build_scheduler(OverpassClient::from_config(&config), &config);

    let points = tiles::tile_density(&scheduler, 15, 29100, 12897).await;

    api_mock.assert_hits(3);
    assert!(points.is_empty());
}

#[tokio::test]
async fn test_viewport_inline_and_offloaded_agree() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/interpreter");
        then.status(200).json_body(ikebukuro_elements());
    });
    let center = GeoPoint::new(139.7109, 35.7295);

    let inline_config = config_for(&server, "[aggregation]\noffload = false");
    let threaded_config = config_for(&server, "[aggregation]\nworker = \"thread\"");

    let inline = app::build_scheduler(OverpassClient::from_config(&inline_config), &inline_config);
    let threaded =
        app::build_scheduler(OverpassClient::from_config(&threaded_config), &threaded_config);

    let mut a = tiles::viewport_density(&inline, center, 15.0).await.unwrap();
    let mut b = tiles::viewport_density(&threaded, center, 15.0).await.unwrap();

    let key = |p: &tiles::HeatmapPoint| (p.position[0].to_bits(), p.position[1].to_bits());
    a.sort_by_key(key);
    b.sort_by_key(key);
    assert_eq!(a, b);
    assert_eq!(a.iter().map(|p| p.density).sum::<u32>(), 4);
}

#[tokio::test]
async fn test_ramen_type_filter_reaches_query() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/interpreter")
            .body_contains("ramen%3Atype");
        then.status(200).json_body(serde_json::json!({ "elements": [] }));
    });

    let config = config_for(&server, "ramen_type = \"家系\"");
    assert_eq!(config.ramen_type(), Some("家系"));
    let scheduler = app::build_scheduler(OverpassClient::from_config(&config), &config);

    let points = tiles::tile_density(&scheduler, 15, 29100, 12897).await;

    api_mock.assert();
    assert!(points.is_empty());
}

#[tokio::test]
async fn test_live_shop_list_drops_malformed_and_far_records() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/interpreter");
        then.status(200).json_body(ikebukuro_elements());
    });

    let config = config_for(&server, "");
    let client = OverpassClient::from_config(&config);

    // 半徑 300 公尺內只有 id 2 與 id 5
    let response = shops::live_shop_list(&client, "Ikebukuro", GeoPoint::new(139.7109, 35.7320), 300.0)
        .await
        .unwrap();

    assert_eq!(response.count, 2);
    assert_eq!(response.area.as_deref(), Some("Ikebukuro"));
    let names: Vec<&str> = response.data.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["無敵家", "Jiro Ikebukuro"]);
}

#[tokio::test]
async fn test_submitted_request_can_be_cancelled_mid_fetch() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/interpreter");
        then.status(200)
            .delay(Duration::from_secs(10))
            .json_body(ikebukuro_elements());
    });

    let config = config_for(&server, "");
    let scheduler = app::build_scheduler(OverpassClient::from_config(&config), &config);

    let handle = scheduler.submit(AreaRequest::Tile {
        z: 15,
        x: 29100,
        y: 12897,
    });
    let mut state = handle.watch_state();
    state
        .wait_for(|s| *s == RequestState::Fetching)
        .await
        .unwrap();

    assert!(handle.cancel());
    assert_eq!(handle.state(), RequestState::Cancelled);
    assert!(handle.wait().await.is_none());
}

#[tokio::test]
async fn test_submitted_request_reports_failure() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/interpreter");
        then.status(503);
    });

    let config = config_for(&server, "");
    let scheduler = app::build_scheduler(OverpassClient::from_config(&config), &config);

    let handle = scheduler.submit(AreaRequest::Viewport {
        center: GeoPoint::new(139.7109, 35.7295),
        zoom: 15.0,
    });
    let mut state = handle.watch_state();

    let result = handle.wait().await;

    assert!(matches!(
        result,
        Some(Err(HeatmapError::ExhaustedRetriesError { attempts: 3, .. }))
    ));
    assert_eq!(*state.borrow_and_update(), RequestState::Failed);
}
