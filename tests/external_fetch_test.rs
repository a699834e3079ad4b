use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tripkit::core::remote::{FetchError, HttpJsonFetcher, JsonFetcher};

fn fetcher() -> HttpJsonFetcher {
    HttpJsonFetcher::new(Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_fetches_json_document() {
    let server = MockServer::start().await;
    let body = json!({ "tripConfig": { "title": "Lisbon" }, "days": [] });

    Mock::given(method("GET"))
        .and(path("/trips/lisbon.json"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .mount(&server)
        .await;

    let url = format!("{}/trips/lisbon.json", server.uri());
    assert_eq!(fetcher().fetch_json(&url).await.unwrap(), body);
}

#[tokio::test]
async fn test_not_found_is_status_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = format!("{}/missing.json", server.uri());
    let err = fetcher().fetch_json(&url).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 404, .. }));
}

#[tokio::test]
async fn test_html_body_is_invalid_json() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not here</html>"))
        .mount(&server)
        .await;

    let url = format!("{}/page.json", server.uri());
    let err = fetcher().fetch_json(&url).await.unwrap_err();
    assert!(matches!(err, FetchError::InvalidJson { .. }));
}
