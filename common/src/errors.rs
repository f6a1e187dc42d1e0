//! Application error types.
//!
//! Every fallible operation in the services returns [`AppResult`]. Conditions
//! that only degrade the dashboard (missing instance, unresolvable endpoint,
//! unclassifiable address) are not errors and never reach this type.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::response::ApiResponse;

/// Result alias used across the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// Application error.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Discovery produced no resources, so there is nothing to publish.
    #[error("no widgets were produced for {0}")]
    EmptyDashboard(String),

    /// The assembled document is not a well-formed dashboard.
    #[error("dashboard document failed structural validation: {0}")]
    Structural(String),

    /// A discovery or publish call failed.
    #[error("external service error: {0}")]
    ExternalService(String),

    /// Request or settings validation failed.
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing or malformed configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// Returns the error code exposed to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::EmptyDashboard(_) => "EMPTY_DASHBOARD",
            AppError::Structural(_) => "STRUCTURAL_ERROR",
            AppError::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Returns the HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::EmptyDashboard(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            AppError::Structural(_) | AppError::Config(_) | AppError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        } else {
            tracing::warn!(code = self.code(), error = %self, "request rejected");
        }
        let body = ApiResponse::err(self.code(), self.to_string());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_dashboard_maps_to_unprocessable() {
        let err = AppError::EmptyDashboard("ri-1".into());
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), "EMPTY_DASHBOARD");
    }

    #[test]
    fn test_external_service_maps_to_bad_gateway() {
        let err = AppError::ExternalService("throttled".into());
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert!(err.to_string().contains("throttled"));
    }
}
