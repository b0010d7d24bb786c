use axum::http::StatusCode;
use tracing::warn;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// Opaque load failure. The detail is logged, never returned to the client.
    pub fn unavailable(detail: impl std::fmt::Display) -> Self {
        warn!("data unavailable: {detail}");
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: "data unavailable".to_string(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.status)
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
