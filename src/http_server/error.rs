use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::{CatalogError, ErrorType};

pub type ApiResult<T> = Result<T, ApiError>;

/// Error returned by every handler. Renders as
/// `{"error": message, "errorType": ErrorType}`.
#[derive(Debug)]
pub enum ApiError {
    Catalog(CatalogError),
    /// Missing or invalid bearer token.
    Unauthenticated(String),
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Catalog(err)
    }
}

impl ApiError {
    fn status_and_type(&self) -> (StatusCode, ErrorType) {
        match self {
            ApiError::Unauthenticated(_) => {
                (StatusCode::UNAUTHORIZED, ErrorType::AuthorizationError)
            }
            ApiError::Catalog(err) => {
                let status = match err.error_type() {
                    ErrorType::NotFound => StatusCode::NOT_FOUND,
                    ErrorType::ValidationError => StatusCode::BAD_REQUEST,
                    ErrorType::DuplicateError => StatusCode::CONFLICT,
                    ErrorType::ExternalApiError => StatusCode::BAD_GATEWAY,
                    ErrorType::AuthorizationError => StatusCode::FORBIDDEN,
                    ErrorType::DatabaseError | ErrorType::InternalError => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, err.error_type())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();
        let message = match self {
            ApiError::Unauthenticated(message) => message,
            ApiError::Catalog(err) if status.is_server_error() => {
                tracing::error!("Request failed: {err:?}");
                "An unexpected error occurred".to_string()
            }
            ApiError::Catalog(err) => err.to_string(),
        };
        (
            status,
            Json(json!({ "error": message, "errorType": error_type })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (CatalogError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (CatalogError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (CatalogError::Duplicate("x".into()), StatusCode::CONFLICT),
            (CatalogError::ExternalApi("x".into()), StatusCode::BAD_GATEWAY),
            (CatalogError::Authorization("x".into()), StatusCode::FORBIDDEN),
            (
                CatalogError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
        assert_eq!(
            ApiError::Unauthenticated("no token".into())
                .into_response()
                .status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
