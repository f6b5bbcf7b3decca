//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures.
//! The HTTP layer maps each bucket to a status code in `api::error`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Persistence failure; the message is safe to show to users
    #[error("{0}")]
    Database(String),
    /// Input rejected before touching the database
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Permission(String),
    #[error("{0} not found")]
    NotFound(String),
    /// A lifecycle or ledger rule refused the operation
    #[error("{0}")]
    BusinessRule(String),
    #[error("External service error: {0}")]
    ExternalService(String),
    #[error("File error: {0}")]
    FileOperation(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Short machine-readable bucket name used in API error envelopes
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::Database(_) => "database",
            DomainError::Validation(_) => "validation",
            DomainError::Permission(_) => "permission",
            DomainError::NotFound(_) => "not_found",
            DomainError::BusinessRule(_) => "business_rule",
            DomainError::ExternalService(_) => "external_service",
            DomainError::FileOperation(_) => "file_operation",
            DomainError::Internal(_) => "internal",
        }
    }

    /// True when the database refused a duplicate value
    pub fn is_conflict(&self) -> bool {
        matches!(self, DomainError::Database(msg) if msg.starts_with("A record with"))
    }

    pub fn not_found(what: &str) -> Self {
        DomainError::NotFound(what.to_string())
    }
}

// Conversion from SeaORM errors (used in infrastructure layer)
impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        let raw = e.to_string();
        tracing::error!(error = %raw, "database error");

        if raw.contains("UNIQUE constraint failed") {
            let field = raw
                .rsplit("UNIQUE constraint failed:")
                .next()
                .and_then(|cols| cols.split(',').next())
                .and_then(|col| col.trim().split('.').nth(1))
                .map(|col| col.trim_end_matches(|c: char| !c.is_alphanumeric() && c != '_'))
                .unwrap_or("value");
            DomainError::Database(format!("A record with this {} already exists", field))
        } else if raw.contains("FOREIGN KEY constraint failed") {
            DomainError::Database(
                "The operation references a record that does not exist or is still in use"
                    .to_string(),
            )
        } else if raw.contains("CHECK constraint failed") {
            DomainError::Database("A value is outside its allowed range".to_string())
        } else {
            DomainError::Database("A database error occurred".to_string())
        }
    }
}

impl From<std::io::Error> for DomainError {
    fn from(e: std::io::Error) -> Self {
        tracing::error!(error = %e, "file operation failed");
        DomainError::FileOperation(e.kind().to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        tracing::error!(error = %e, "serialization failed");
        DomainError::Internal("Could not serialize data".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbErr, RuntimeErr};

    fn exec_err(msg: &str) -> DbErr {
        DbErr::Exec(RuntimeErr::Internal(msg.to_string()))
    }

    #[test]
    fn unique_violation_names_the_column() {
        let err: DomainError =
            exec_err("error returned from database: UNIQUE constraint failed: products.serial_number")
                .into();
        assert_eq!(
            err.to_string(),
            "A record with this serial_number already exists"
        );
        assert!(err.is_conflict());
    }

    #[test]
    fn foreign_key_violation_is_friendly() {
        let err: DomainError = exec_err("FOREIGN KEY constraint failed").into();
        assert_eq!(err.kind(), "database");
        assert!(!err.is_conflict());
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn other_errors_hide_details() {
        let err: DomainError = exec_err("disk I/O error at page 42").into();
        assert_eq!(err.to_string(), "A database error occurred");
    }
}
