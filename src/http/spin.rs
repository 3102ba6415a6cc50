//! The `/spin` endpoint.
//!
//! # Responsibilities
//! - Parse and validate the `speed` query parameter (default `15`)
//! - Run the synthetic workload at that cost off the async executor
//! - Map failures to plain-text 400 responses
//!
//! `speed` has no upper bound other than the workload's memory ceiling.
//! Each step doubles the work, so values in the high twenties keep a request
//! busy for minutes. That is the point of a load generator, but never expose
//! this endpoint to untrusted clients.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::workload::{SyntheticWorkload, WorkloadError};

pub const DEFAULT_SPEED: &str = "15";
pub const SPIN_BODY: &str = "Weeeeeeeeeeeeeeee\n";

/// Error type for the spin handler.
#[derive(Debug, thiserror::Error)]
pub enum SpinError {
    #[error("Invalid spin speed")]
    InvalidInput,
    #[error("Spin error: {0}")]
    Workload(#[from] WorkloadError),
}

impl IntoResponse for SpinError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, format!("{self}\n")).into_response()
    }
}

/// State injected into the spin handler.
#[derive(Clone)]
pub struct SpinState {
    pub workload: Arc<dyn SyntheticWorkload>,
}

/// Parse `speed`: absent or empty means the default, otherwise an integer >= 1.
pub fn parse_speed(raw: Option<&str>) -> Result<u64, SpinError> {
    let raw = match raw {
        Some(s) if !s.is_empty() => s,
        _ => DEFAULT_SPEED,
    };
    let speed: i64 = raw.parse().map_err(|_| SpinError::InvalidInput)?;
    if speed < 1 {
        return Err(SpinError::InvalidInput);
    }
    Ok(speed as u64)
}

pub async fn spin_handler(
    State(state): State<SpinState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<&'static str, SpinError> {
    // First occurrence wins when `speed` is repeated.
    let raw = params
        .iter()
        .find(|(name, _)| name == "speed")
        .map(|(_, value)| value.as_str());
    let speed = parse_speed(raw)?;

    let workload = Arc::clone(&state.workload);
    let result = tokio::task::spawn_blocking(move || workload.run(speed))
        .await
        .unwrap_or_else(|e| Err(WorkloadError::new(format!("workload task failed: {e}"))));

    if let Err(e) = result {
        tracing::error!(speed, error = %e, "Spin failed");
        return Err(SpinError::Workload(e));
    }

    Ok(SPIN_BODY)
}
