use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

/// Every failure a request can end with.
///
/// The `Display` text is what the client sees. `Storage` keeps the
/// underlying detail for the logs only.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("Quantity must be at least 1")]
    InvalidQuantity,
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    InvalidTransition(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    InsufficientStock(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("An error occurred while placing the order")]
    OrderPlacementFailed,
    #[error("Internal server error")]
    Storage(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::InvalidQuantity
            | ApiError::InvalidState(_)
            | ApiError::InvalidTransition(_)
            | ApiError::Unavailable(_)
            | ApiError::InsufficientStock(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::OrderPlacementFailed | ApiError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text for the request log, including storage detail.
    pub fn detail(&self) -> String {
        match self {
            ApiError::Storage(detail) => format!("Database error: {detail}"),
            other => other.to_string(),
        }
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        ApiError::Storage(err.to_string())
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.to_string()
        }));
        let mut response = (self.status(), body).into_response();
        response.extensions_mut().insert(Err::<(), ApiError>(self));
        response
    }
}
