use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use think_space_agent::RelayError;

/// HTTP error carrying a `{"detail": ...}` body
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        let status = match &err {
            RelayError::ModelUnavailable { .. } | RelayError::InvalidPrompt => {
                StatusCode::BAD_REQUEST
            }
            RelayError::NotConfigured { .. }
            | RelayError::Upstream(_)
            | RelayError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::warn!("Rejected request body: {}", rejection.body_text());
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "detail": self.detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_error_status_mapping() {
        let err = ApiError::from(RelayError::NotConfigured {
            key: "GROQ_API_KEY".to_string(),
        });
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.detail,
            "Missing API key: set environment variable GROQ_API_KEY"
        );

        let err = ApiError::from(RelayError::ModelUnavailable {
            model: "old-model".to_string(),
            message: "decommissioned".to_string(),
        });
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.detail.contains("old-model"));

        let err = ApiError::from(RelayError::Upstream("boom".to_string()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.detail, "Server error: boom");

        let err = ApiError::from(RelayError::InvalidPrompt);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
