//! HTTP mapping of service errors
//!
//! Every failing handler answers with the same envelope:
//! `{ "success": false, "error": true, "error_type": "...", "message": "..." }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::domain::DomainError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("{0}")]
    Unauthorized(String),
    /// Malformed request that never reached a service (bad multipart, unknown query value)
    #[error("{0}")]
    BadRequest(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Domain(e) => match e {
                DomainError::Validation(_) => StatusCode::BAD_REQUEST,
                DomainError::BusinessRule(_) => StatusCode::CONFLICT,
                DomainError::NotFound(_) => StatusCode::NOT_FOUND,
                DomainError::Permission(_) => StatusCode::FORBIDDEN,
                DomainError::Database(_) if e.is_conflict() => StatusCode::CONFLICT,
                DomainError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                DomainError::ExternalService(_) => StatusCode::BAD_GATEWAY,
                DomainError::FileOperation(_) | DomainError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::Domain(e) => e.kind(),
            ApiError::Unauthorized(_) => "authentication",
            ApiError::BadRequest(_) => "validation",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }

        let body = json!({
            "success": false,
            "error": true,
            "error_type": self.error_type(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_buckets_map_to_status_codes() {
        let cases = [
            (DomainError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (DomainError::BusinessRule("x".into()), StatusCode::CONFLICT),
            (DomainError::not_found("Product"), StatusCode::NOT_FOUND),
            (DomainError::Permission("x".into()), StatusCode::FORBIDDEN),
            (DomainError::Database("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                DomainError::Database("A record with this serial_number already exists".into()),
                StatusCode::CONFLICT,
            ),
            (DomainError::ExternalService("x".into()), StatusCode::BAD_GATEWAY),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }
}
