use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tripkit::core::remote::{
    save_trip, CloudError, CloudTripService, RestTripService, SaveOptions, UpdateTripRow, Visibility,
};
use tripkit::core::trip::{normalize, Palette};

const TABLE_PATH: &str = "/rest/v1/trips";

fn row(id: u64, slug: &str) -> serde_json::Value {
    json!({
        "id": id,
        "slug": slug,
        "title": "Kyoto",
        "visibility": "public",
        "share_token": "tok123",
        "trip_data": { "tripConfig": { "title": "Kyoto" }, "days": [] },
        "created_at": "2026-03-01T10:00:00Z"
    })
}

fn service(server: &MockServer) -> RestTripService {
    RestTripService::new(server.uri(), "anon-key", "trips").unwrap()
}

#[tokio::test]
async fn test_fetch_by_slug_sends_filter_and_key() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("slug", "eq.kyoto-ab12cd"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row(7, "kyoto-ab12cd")])))
        .expect(1)
        .mount(&server)
        .await;

    let found = service(&server).fetch_by_slug("kyoto-ab12cd").await.unwrap().unwrap();
    assert_eq!(found.id, "7");
    assert_eq!(found.visibility, Visibility::Public);
    assert_eq!(found.share_token.as_deref(), Some("tok123"));
    assert!(found.created_at.is_some());
}

#[tokio::test]
async fn test_missing_row_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("share_token", "eq.nope"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert!(service(&server).fetch_by_share_token("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn test_server_error_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = service(&server).fetch_by_id("1").await.unwrap_err();
    match err {
        CloudError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_update_of_missing_row_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path(TABLE_PATH))
        .and(query_param("id", "eq.42"))
        .and(header("prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let changes = UpdateTripRow {
        title: "Kyoto".to_string(),
        visibility: Visibility::Private,
        trip_data: json!({}),
        updated_at: chrono::Utc::now(),
    };
    let err = service(&server).update("42", &changes).await.unwrap_err();
    assert!(matches!(err, CloudError::NotFound(id) if id == "42"));
}

#[tokio::test]
async fn test_save_retries_taken_slug() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(409))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .and(body_partial_json(json!({ "title": "Kyoto", "visibility": "public" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([row(9, "kyoto-zz99zz")])))
        .expect(1)
        .mount(&server)
        .await;

    let doc = normalize(
        &json!({ "tripConfig": { "title": "Kyoto" }, "days": [] }),
        &Palette::new(),
    );
    let options = SaveOptions {
        visibility: Visibility::Public,
        ..Default::default()
    };
    let saved = save_trip(&service(&server), &doc, None, &options).await.unwrap();
    assert_eq!(saved.id, "9");
    assert_eq!(saved.slug, "kyoto-zz99zz");
}

#[tokio::test]
async fn test_save_gives_up_after_max_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(409))
        .expect(3)
        .mount(&server)
        .await;

    let doc = normalize(&json!({ "tripConfig": { "title": "Busy" }, "days": [] }), &Palette::new());
    let options = SaveOptions {
        max_slug_attempts: 3,
        ..Default::default()
    };
    let err = save_trip(&service(&server), &doc, None, &options).await.unwrap_err();
    assert!(matches!(err, CloudError::SlugExhausted(3)));
}
