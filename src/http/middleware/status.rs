//! Status code observation shared by the observability middleware.

use axum::http::{Response, StatusCode};

/// Records the status of the response a middleware forwards.
///
/// Reads `200 OK` until a response has been observed, which is also what a
/// client receives when a handler never sets a status explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCapture {
    status: StatusCode,
}

impl StatusCapture {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
        }
    }

    /// Record `status` as the one sent to the client.
    pub fn record(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Record the status of `response` and hand the response back untouched.
    pub fn observe<B>(&mut self, response: Response<B>) -> Response<B> {
        self.record(response.status());
        response
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl Default for StatusCapture {
    fn default() -> Self {
        Self::new()
    }
}
