//! HTTP queue API tests against a mock queue service

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stationq_core::{ApiConfig, ApiError, EntryId, QueueApi, StationId};
use stationq_runtime::HttpQueueApi;

// ----------------------------------------------------------------------------
// Test Utilities
// ----------------------------------------------------------------------------

fn client(server: &MockServer) -> HttpQueueApi {
    HttpQueueApi::new(
        &ApiConfig::with_base_url(server.uri()),
        Some("secret".to_string()),
    )
    .unwrap()
}

fn station() -> StationId {
    StationId::from("tunis")
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_fetch_queue_decodes_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/queue/tunis"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "A", "licensePlate": "1 TU 1", "queuePosition": 1, "totalSeats": "8"},
                {"id": "B", "licensePlate": "2 TU 2", "queuePosition": 2}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let queue = client(&server).fetch_queue(&station()).await.unwrap();

    assert_eq!(queue.len(), 2);
    assert_eq!(queue[0].id, EntryId::from("A"));
    assert_eq!(queue[0].total_seats, 8);
    assert_eq!(queue[1].license_plate, "2 TU 2");
}

#[tokio::test]
async fn test_submit_reorder_sends_full_order() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/queue/tunis/reorder"))
        .and(body_json(json!({"entryIds": ["C", "A", "B"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let order: Vec<EntryId> = ["C", "A", "B"].into_iter().map(EntryId::from).collect();
    client(&server)
        .submit_reorder(&station(), &order)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rejected_reorder_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(409).set_body_string("stale order"))
        .mount(&server)
        .await;

    let err = client(&server)
        .submit_reorder(&station(), &[EntryId::from("A")])
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ApiError::Status {
            status: 409,
            body: "stale order".to_string()
        }
    );
}

#[tokio::test]
async fn test_delete_treats_missing_entry_as_deleted() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/queue/tunis/entry/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .delete_entry(&station(), &EntryId::from("gone"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client(&server)
        .delete_entry(&station(), &EntryId::from("A"))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Status { status: 500, .. }));
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn test_fetch_summaries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/queue-summaries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "destinationId": "tunis",
                "destinationName": "Tunis",
                "totalVehicles": 3,
                "totalSeats": 24,
                "availableSeats": "10",
                "basePrice": 8.25
            }]
        })))
        .mount(&server)
        .await;

    let summaries = client(&server).fetch_summaries().await.unwrap();

    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].destination_id, station());
    assert_eq!(summaries[0].available_seats, 10);
    assert_eq!(summaries[0].base_price, 8.25);
}

#[tokio::test]
async fn test_add_vehicle_posts_entry_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/queue/tunis"))
        .and(body_json(json!({
            "vehicleId": "v7",
            "destinationId": "tunis",
            "destinationName": "Tunis"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": {"id": "E7", "vehicleId": "v7", "queuePosition": 4}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let entry = client(&server)
        .add_vehicle(&station(), "v7", "Tunis")
        .await
        .unwrap();

    assert_eq!(entry.id, EntryId::from("E7"));
    assert_eq!(entry.queue_position, 4);
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = client(&server).fetch_queue(&station()).await.unwrap_err();
    assert!(matches!(err, ApiError::Decode { .. }));
}

#[tokio::test]
async fn test_anonymous_client_sends_no_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    let api = HttpQueueApi::new(&ApiConfig::with_base_url(server.uri()), None).unwrap();
    assert!(api.fetch_queue(&station()).await.unwrap().is_empty());

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_unreachable_service_is_request_error() {
    let api = HttpQueueApi::new(&ApiConfig::with_base_url("http://127.0.0.1:9"), None).unwrap();
    let err = api.fetch_summaries().await.unwrap_err();
    assert!(matches!(err, ApiError::Request { .. }));
}
