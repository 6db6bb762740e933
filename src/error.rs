use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Infrastructural failures surfaced to the transport boundary. Business-rule
/// outcomes never pass through here; they are returned as structured result
/// bodies by the services.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Generic, non-leaking message for a store-level failure. A missing relation
/// (schema not provisioned yet) reads as unavailability rather than a bug.
fn infra_message(detail: &str) -> &'static str {
    if detail.contains("relation") && detail.contains("does not exist") {
        "The requested resource is currently unavailable. Please try again later."
    } else {
        "An unexpected error occurred. Please try again later."
    }
}

impl ApiError {
    /// Engine-level existence checks are advisory; the store's uniqueness
    /// constraints are the final authority, so duplicate-key errors that
    /// slip past them still get a meaningful answer.
    fn is_unique_violation(&self) -> bool {
        match self {
            ApiError::Database(sqlx::Error::Database(db)) => {
                db.code().as_deref() == Some("23505")
            }
            _ => false,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.is_unique_violation() {
            let body = json!({
                "status": false,
                "message": "A duplicate entry was found. Please ensure all unique fields are unique.",
            });
            return (StatusCode::CONFLICT, Json(body)).into_response();
        }

        let message = match &self {
            ApiError::Database(e) => {
                error!(error = %e, "database error");
                infra_message(&e.to_string())
            }
            ApiError::Internal(e) => {
                error!(error = %e, "internal error");
                "An unexpected error occurred. Please try again later."
            }
        };

        let body = json!({ "status": false, "message": message });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_relation_reads_as_unavailable() {
        let msg = infra_message("relation \"products\" does not exist");
        assert!(msg.contains("currently unavailable"));
    }

    #[test]
    fn other_failures_stay_generic() {
        let msg = infra_message("connection refused");
        assert!(msg.contains("unexpected error"));
        // No internals leak through.
        assert!(!msg.contains("connection"));
    }
}
