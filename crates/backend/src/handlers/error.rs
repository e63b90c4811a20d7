use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use contracts::shared::error::ErrorResponse;

use crate::domain::a001_product::service::ProductServiceError;

/// Ошибка HTTP-слоя: статус + `{"error": ...}`
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };
        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

impl From<ProductServiceError> for ApiError {
    fn from(err: ProductServiceError) -> Self {
        match err {
            ProductServiceError::NotFound(_) => ApiError::NotFound(err.to_string()),
            // already logged by the repository
            ProductServiceError::Storage(_) => ApiError::Internal,
        }
    }
}
