use crate::error::AppError;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

/// JSON body every failed request carries, shared by the HTTP surface and
/// the socket `error` event (which reuses `code`/`message`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
    pub error_type: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str, status: u16, error_type: &str, code: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            status,
            error_type: error_type.to_string(),
            code: code.to_string(),
        }
    }
}

/// Map domain errors to HTTP responses
pub fn map_error(err: &AppError) -> (StatusCode, ErrorResponse) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let (error_type, code) = match err {
        AppError::Validation(_) => ("validation_error", "INVALID_REQUEST"),
        AppError::Unauthorized => ("authentication_error", "INVALID_CREDENTIALS"),
        AppError::Forbidden => ("authorization_error", "AUTHORIZATION_ERROR"),
        AppError::NotFound => ("not_found_error", "MESSAGE_NOT_FOUND"),
        AppError::WindowExpired { .. } => ("gone_error", "MODIFICATION_WINDOW_EXPIRED"),
        AppError::Database(_) => ("server_error", "DATABASE_ERROR"),
        AppError::Config(_) | AppError::StartServer(_) | AppError::Internal => {
            ("server_error", "INTERNAL_SERVER_ERROR")
        }
    };

    let message = err.to_string();
    let response = ErrorResponse::new(
        match status {
            StatusCode::BAD_REQUEST => "Bad Request",
            StatusCode::UNAUTHORIZED => "Unauthorized",
            StatusCode::FORBIDDEN => "Forbidden",
            StatusCode::NOT_FOUND => "Not Found",
            StatusCode::GONE => "Gone",
            StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
            _ => "Error",
        },
        &message,
        status.as_u16(),
        error_type,
        code,
    );

    (status, response)
}

pub fn into_response(err: AppError) -> impl IntoResponse {
    let (status, response) = map_error(&err);
    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_validation_error_to_400() {
        let (status, body) = map_error(&AppError::Validation("receiverId is required".into()));
        assert_eq!(status.as_u16(), 400);
        assert_eq!(body.code, "INVALID_REQUEST");
    }

    #[test]
    fn maps_expired_window_to_410() {
        let err = AppError::WindowExpired {
            created_at: chrono::Utc::now(),
            window_minutes: 15,
        };
        let (status, body) = map_error(&err);
        assert_eq!(status.as_u16(), 410);
        assert_eq!(body.code, "MODIFICATION_WINDOW_EXPIRED");
    }

    #[test]
    fn maps_forbidden_and_not_found() {
        assert_eq!(map_error(&AppError::Forbidden).0.as_u16(), 403);
        assert_eq!(map_error(&AppError::NotFound).0.as_u16(), 404);
    }
}
