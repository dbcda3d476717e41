use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use service::ServiceError;
use tracing::warn;

/// Error body returned by the collection endpoints:
/// `{"error": "<kind>", "detail": "<message>"}`.
#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub error: &'static str,
    pub detail: Option<String>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, error: &'static str, detail: Option<String>) -> Self {
        Self { status, error, detail }
    }
}

impl From<ServiceError> for JsonApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::StorageUnavailable(_) => {
                // the 5xx itself is reported at ERROR by the trace layer
                warn!(event = "storage_unavailable", error = %e, "record store failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Storage Unavailable", Some(e.to_string()))
            }
            ServiceError::RevisionMismatch { .. } => {
                warn!(event = "revision_mismatch", error = %e, "conditional replace rejected");
                Self::new(StatusCode::PRECONDITION_FAILED, "Precondition Failed", Some(e.to_string()))
            }
        }
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({"error": self.error, "detail": self.detail});
        (self.status, Json(body)).into_response()
    }
}
