//! End-to-end tests of the public and management APIs over real sockets.

use reqwest::StatusCode;
use serde_json::Value;
use tracing::Level;

mod common;

use common::{client, sample, test_config, TestService};

#[tokio::test]
async fn spin_scenarios() {
    let mut service = TestService::start(test_config()).await;
    let client = client();

    let cases = [
        ("/spin", StatusCode::OK, "Weeeeeeeeeeeeeeee\n"),
        ("/spin?speed=1", StatusCode::OK, "Weeeeeeeeeeeeeeee\n"),
        ("/spin?speed=16", StatusCode::OK, "Weeeeeeeeeeeeeeee\n"),
        ("/spin?speed=A", StatusCode::BAD_REQUEST, "Invalid spin speed\n"),
        ("/spin?speed=-1", StatusCode::BAD_REQUEST, "Invalid spin speed\n"),
    ];

    for (path, expected_status, expected_body) in cases {
        let response = client.get(service.public_url(path)).send().await.unwrap();
        assert_eq!(response.status(), expected_status, "status for {path}");
        assert_eq!(response.text().await.unwrap(), expected_body, "body for {path}");
    }

    service.lifecycle.shutdown().await.unwrap();
}

#[tokio::test]
async fn metrics_count_public_requests() {
    let mut service = TestService::start(test_config()).await;
    let client = client();

    for _ in 0..3 {
        let response = client.get(service.public_url("/spin?speed=1")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = client.get(service.public_url("/spin?speed=A")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client.get(service.management_url("/metrics")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = response.text().await.unwrap();

    let ok = sample(
        &text,
        r#"http_requests_duration_seconds_count{method="GET",endpoint="/spin",status_code="200"}"#,
    );
    let bad = sample(
        &text,
        r#"http_requests_duration_seconds_count{method="GET",endpoint="/spin",status_code="400"}"#,
    );
    assert_eq!(ok, Some(3.0));
    assert_eq!(bad, Some(1.0));
    assert!(text.contains("http_requests_duration_seconds_bucket"));

    // Management traffic is not measured.
    assert!(!text.contains(r#"endpoint="/metrics""#));

    service.lifecycle.shutdown().await.unwrap();
}

#[tokio::test]
async fn management_liveness_and_levels() {
    let mut service = TestService::start(test_config()).await;
    let client = client();

    let response = client.get(service.management_url("/livez")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "ok\n");

    let level: Value = client
        .get(service.management_url("/accesslog"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(level["level"], "info");

    let response = client
        .put(service.management_url("/accesslog"))
        .json(&serde_json::json!({ "level": "error" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.json::<Value>().await.unwrap()["level"], "error");
    assert_eq!(service.levels.access.get(), Level::ERROR);

    let response = client
        .put(service.management_url("/servicelog"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("level=debug")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(service.levels.service.get(), Level::DEBUG);

    let response = client
        .put(service.management_url("/servicelog"))
        .json(&serde_json::json!({ "level": "chatty" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>().await.unwrap()["error"].is_string());
    assert_eq!(service.levels.service.get(), Level::DEBUG);

    let response = client
        .post(service.management_url("/servicelog"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    service.lifecycle.shutdown().await.unwrap();
}
