use sea_orm::{DbErr, SqlErr};
use serde::Serialize;

use crate::repository::UnitOfWorkError;

/// Category of an expected failure, stable across the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorType {
    NotFound,
    ValidationError,
    DuplicateError,
    ExternalApiError,
    DatabaseError,
    AuthorizationError,
    InternalError,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Duplicate(String),
    #[error("External API error: {0}")]
    ExternalApi(String),
    #[error("Database error: {0}")]
    Database(DbErr),
    #[error("{0}")]
    Authorization(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl CatalogError {
    pub fn error_type(&self) -> ErrorType {
        match self {
            CatalogError::NotFound(_) => ErrorType::NotFound,
            CatalogError::Validation(_) => ErrorType::ValidationError,
            CatalogError::Duplicate(_) => ErrorType::DuplicateError,
            CatalogError::ExternalApi(_) => ErrorType::ExternalApiError,
            CatalogError::Database(_) => ErrorType::DatabaseError,
            CatalogError::Authorization(_) => ErrorType::AuthorizationError,
            CatalogError::Internal(_) => ErrorType::InternalError,
        }
    }

    pub fn not_found(entity: &str, id: i64) -> Self {
        CatalogError::NotFound(format!("{entity} with id {id} not found"))
    }

    pub fn external(report: color_eyre::Report) -> Self {
        tracing::warn!("External API call failed: {report:?}");
        CatalogError::ExternalApi(report.to_string())
    }
}

impl From<DbErr> for CatalogError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                CatalogError::Duplicate(format!("Duplicate value: {detail}"))
            }
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                CatalogError::Validation(format!("Referenced entity does not exist: {detail}"))
            }
            _ => CatalogError::Database(err),
        }
    }
}

impl From<UnitOfWorkError> for CatalogError {
    fn from(err: UnitOfWorkError) -> Self {
        match err {
            UnitOfWorkError::Database(db_err) => db_err.into(),
            other => CatalogError::Internal(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Internal(format!("Malformed stored JSON: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_types() {
        assert_eq!(
            CatalogError::not_found("Artist", 3).error_type(),
            ErrorType::NotFound
        );
        assert_eq!(
            CatalogError::Validation("bad".into()).error_type(),
            ErrorType::ValidationError
        );
        assert_eq!(
            CatalogError::from(DbErr::Custom("boom".into())).error_type(),
            ErrorType::DatabaseError
        );
    }

    #[test]
    fn test_not_found_message() {
        let err = CatalogError::not_found("Label", 42);
        assert_eq!(err.to_string(), "Label with id 42 not found");
    }

    #[test]
    fn test_transaction_misuse_is_internal() {
        let err = CatalogError::from(UnitOfWorkError::NoActiveTransaction);
        assert_eq!(err.error_type(), ErrorType::InternalError);
    }
}
