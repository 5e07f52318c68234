use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domains::DomainError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

const GENERIC_FAILURE: &str = "something went wrong, please try again";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Body(#[from] JsonRejection),

    #[error(transparent)]
    Path(#[from] PathRejection),

    #[error(transparent)]
    Query(#[from] QueryRejection),

    #[error("missing bearer token")]
    MissingToken,

    #[error("metrics encoding failed")]
    Metrics(#[from] std::fmt::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Domain(DomainError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Domain(DomainError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Domain(DomainError::Unauthorized(_)) | ApiError::MissingToken => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Domain(DomainError::Forbidden(_)) => StatusCode::FORBIDDEN,
            ApiError::Domain(DomainError::Conflict(_)) => StatusCode::CONFLICT,
            ApiError::Domain(DomainError::Storage(_)) | ApiError::Metrics(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Body(rejection) => rejection.status(),
            ApiError::Path(rejection) => rejection.status(),
            ApiError::Query(rejection) => rejection.status(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            GENERIC_FAILURE.to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
