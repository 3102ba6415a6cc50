use axum::extract::{FromRequest, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::observability::logging::{level_name, parse_level, LogLevel};

/// Content type of the Prometheus text exposition format.
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

#[derive(Serialize)]
pub struct LevelResponse {
    pub level: &'static str,
}

impl LevelResponse {
    fn of(level: &LogLevel) -> Json<Self> {
        Json(Self {
            level: level_name(level.get()),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct LevelUpdate {
    pub level: String,
}

/// Error returned by the log level endpoints as `{"error": "..."}`.
#[derive(Debug)]
pub struct AdminError(String);

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": self.0 })),
        )
            .into_response()
    }
}

/// Level update body: form-encoded when the client says so, JSON otherwise.
pub struct LevelBody(pub LevelUpdate);

impl<S> FromRequest<S> for LevelBody
where
    S: Send + Sync,
{
    type Rejection = AdminError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(update) = Form::<LevelUpdate>::from_request(req, state)
                .await
                .map_err(|e| AdminError(e.body_text()))?;
            return Ok(LevelBody(update));
        }

        let body = axum::body::Bytes::from_request(req, state)
            .await
            .map_err(|e| AdminError(e.body_text()))?;
        let update = serde_json::from_slice(&body).map_err(|e| AdminError(e.to_string()))?;
        Ok(LevelBody(update))
    }
}

fn apply(level: &LogLevel, update: LevelUpdate) -> Result<Json<LevelResponse>, AdminError> {
    let parsed = parse_level(&update.level).map_err(|e| AdminError(e.to_string()))?;
    let previous = level.get();
    level.set(parsed);
    tracing::info!(
        from = level_name(previous),
        to = level_name(parsed),
        "Log level changed"
    );
    Ok(LevelResponse::of(level))
}

pub async fn get_metrics(State(state): State<AdminState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        state.metrics.render(),
    )
}

pub async fn get_livez() -> &'static str {
    "ok\n"
}

pub async fn get_service_level(State(state): State<AdminState>) -> Json<LevelResponse> {
    LevelResponse::of(&state.levels.service)
}

pub async fn put_service_level(
    State(state): State<AdminState>,
    LevelBody(update): LevelBody,
) -> Result<Json<LevelResponse>, AdminError> {
    apply(&state.levels.service, update)
}

pub async fn get_access_level(State(state): State<AdminState>) -> Json<LevelResponse> {
    LevelResponse::of(&state.levels.access)
}

pub async fn put_access_level(
    State(state): State<AdminState>,
    LevelBody(update): LevelBody,
) -> Result<Json<LevelResponse>, AdminError> {
    apply(&state.levels.access, update)
}
