//! Management API.
//!
//! # Responsibilities
//! - Expose the shared metrics registry for scraping (`/metrics`)
//! - Report liveness (`/livez`)
//! - Read and change the service and access log levels at runtime
//!   (`/servicelog`, `/accesslog`)
//!
//! # Design Decisions
//! - Served on its own listener, outside the public middleware stack, so
//!   scrapes and liveness checks do not show up in the access log or latency histogram
//! - Unsupported methods get axum's default 405

pub mod handlers;

use axum::routing::get;
use axum::Router;

use crate::observability::logging::LogLevels;
use crate::observability::metrics::MetricsRegistry;
use self::handlers::*;

/// State shared by the management handlers.
#[derive(Clone)]
pub struct AdminState {
    pub metrics: MetricsRegistry,
    pub levels: LogLevels,
}

pub fn management_router(state: AdminState) -> Router {
    Router::new()
        .route("/metrics", get(get_metrics))
        .route("/livez", get(get_livez))
        .route("/servicelog", get(get_service_level).put(put_service_level))
        .route("/accesslog", get(get_access_level).put(put_access_level))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::middleware::HttpMetricsLayer;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;
    use tracing::Level;

    fn state() -> AdminState {
        let metrics = HttpMetricsLayer::configure(MetricsRegistry::builder())
            .unwrap()
            .build();
        AdminState {
            metrics,
            levels: LogLevels::default(),
        }
    }

    async fn send(
        router: Router,
        method: Method,
        uri: &str,
        content_type: Option<&str>,
        body: &str,
    ) -> (StatusCode, String) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }
        let response = router
            .oneshot(builder.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn livez_reports_ok() {
        let (status, body) = send(management_router(state()), Method::GET, "/livez", None, "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok\n");
    }

    #[tokio::test]
    async fn metrics_renders_registry() {
        let state = state();
        HttpMetricsLayer::new(&state.metrics).unwrap();
        let family = state
            .metrics
            .register_histogram("spin_test_seconds", "Test histogram.", &["kind"])
            .unwrap();
        family.with_label_values(&["a"]).record(0.2);

        let router = management_router(state);
        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            handlers::PROMETHEUS_CONTENT_TYPE
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains(r#"spin_test_seconds_count{kind="a"} 1"#));
    }

    #[tokio::test]
    async fn reads_current_levels() {
        let state = state();
        state.levels.access.set(Level::WARN);
        let router = management_router(state);

        let (status, body) = send(router.clone(), Method::GET, "/servicelog", None, "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["level"], "info");

        let (_, body) = send(router, Method::GET, "/accesslog", None, "").await;
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["level"], "warn");
    }

    #[tokio::test]
    async fn updates_level_from_json() {
        let state = state();
        let levels = state.levels.clone();
        let router = management_router(state);

        let (status, body) = send(
            router,
            Method::PUT,
            "/servicelog",
            Some("application/json"),
            r#"{"level":"debug"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"level":"debug"}"#);
        assert_eq!(levels.service.get(), Level::DEBUG);
        assert_eq!(levels.access.get(), Level::INFO);
    }

    #[tokio::test]
    async fn updates_level_from_form() {
        let state = state();
        let levels = state.levels.clone();
        let router = management_router(state);

        let (status, body) = send(
            router,
            Method::PUT,
            "/accesslog",
            Some("application/x-www-form-urlencoded"),
            "level=error",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"level":"error"}"#);
        assert_eq!(levels.access.get(), Level::ERROR);
    }

    #[tokio::test]
    async fn rejects_bad_updates() {
        let state = state();
        let levels = state.levels.clone();
        let router = management_router(state);

        let (status, body) = send(
            router.clone(),
            Method::PUT,
            "/servicelog",
            Some("application/json"),
            r#"{"level":"loud"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(serde_json::from_str::<Value>(&body).unwrap()["error"].is_string());

        let (status, _) = send(router, Method::PUT, "/servicelog", None, "not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(levels.service.get(), Level::INFO);
    }

    #[tokio::test]
    async fn other_methods_not_allowed() {
        let router = management_router(state());
        let (status, _) = send(router.clone(), Method::POST, "/servicelog", None, "").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        let (status, _) = send(router, Method::DELETE, "/livez", None, "").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }
}
