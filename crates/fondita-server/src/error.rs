use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use fondita_core::FonditaError;
use serde_json::json;

/// Error returned by handlers. Always rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "No autorizado")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<FonditaError> for ApiError {
    fn from(err: FonditaError) -> Self {
        let status = match &err {
            FonditaError::Validation(_) => StatusCode::BAD_REQUEST,
            FonditaError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            FonditaError::NotFound { .. } => StatusCode::NOT_FOUND,
            FonditaError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            FonditaError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %err, "Request failed");
            return Self::new(status, "Error interno del servidor");
        }
        if status == StatusCode::UNAUTHORIZED {
            return Self::unauthorized();
        }
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (FonditaError::validation("x"), StatusCode::BAD_REQUEST),
            (FonditaError::unauthorized("x"), StatusCode::UNAUTHORIZED),
            (
                FonditaError::PayloadTooLarge { size: 2, limit: 1 },
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                FonditaError::UnsupportedMediaType("x".into()),
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ),
            (FonditaError::corrupt("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[test]
    fn test_internal_details_are_not_exposed() {
        let err = ApiError::from(FonditaError::io("/srv/secret/path unreadable"));
        assert!(!err.message.contains("/srv/secret"));
    }
}
