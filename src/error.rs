//! Request-level errors
//!
//! Whole-request failures of the list/detail/card endpoints. Per-card
//! failures never surface here; they are annotated inline on the card.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    /// List-level or record-level policy denial
    #[error("Unauthorized")]
    Unauthorized,

    /// Unknown resource, record, or card index
    #[error("{0}")]
    NotFound(String),

    /// A resource was registered without any fields
    #[error("No fields defined for this resource")]
    NoFields,

    /// The backing store failed while fetching the page or record
    #[error("{0}")]
    Provider(String),

    /// A display transform failed for one field of a record
    #[error("field '{field}': {message}")]
    Transform { field: String, message: String },

    /// A single card failed in the detail endpoint
    #[error("{0}")]
    Card(String),
}

impl PanelError {
    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{} not found", what))
    }

    pub fn provider(err: &anyhow::Error) -> Self {
        Self::Provider(format!("{:#}", err))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::NoFields | Self::Provider(_) | Self::Transform { .. } | Self::Card(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for PanelError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, "{}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
