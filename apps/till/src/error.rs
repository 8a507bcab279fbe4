//! # Service Error Type
//!
//! The error every service returns and the text interface renders.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Till POS                               │
//! │                                                                         │
//! │  Text interface               Services                                  │
//! │  ──────────────               ────────                                  │
//! │                                                                         │
//! │  "Add item: A1 x 7"                                                     │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Service method                                                  │  │
//! │  │  Result<T, ServiceError>                                         │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Database Error? ─── DbError::UniqueViolation ─────┐            │  │
//! │  │         │                                          │            │  │
//! │  │         ▼                                          ▼            │  │
//! │  │  Business Error? ─── CoreError::InsufficientStock ─ ServiceError►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  "Error: Insufficient stock for A1: available 5, requested 7"           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Storage failures are logged here with their detail and surface as a
//! generic `Storage` message.

use thiserror::Error;
use till_core::{CoreError, ValidationError};
use till_db::DbError;

/// Errors returned by the domain services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input was rejected: missing, malformed or duplicate values, or a
    /// business rule such as "cart is empty".
    #[error("{0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Unknown user or wrong password. The two are not distinguished.
    #[error("Invalid username or password")]
    Authentication,

    #[error("Not permitted: {action}")]
    Authorization { action: String },

    #[error("You cannot delete your own account")]
    SelfDeletion,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        ServiceError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn forbidden(action: impl Into<String>) -> Self {
        ServiceError::Authorization {
            action: action.into(),
        }
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            DbError::UniqueViolation { field, value } => {
                ServiceError::Validation(ValidationError::duplicate(field, value).to_string())
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!("Foreign key violation: {}", message);
                ServiceError::validation("Record is still referenced")
            }
            DbError::InsufficientStock {
                sku,
                available,
                requested,
            } => ServiceError::InsufficientStock {
                sku,
                available,
                requested,
            },
            DbError::Invalid(e) => e.into(),
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ServiceError::Storage("database connection failed".to_string())
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                ServiceError::Storage("database migration failed".to_string())
            }
            DbError::QueryFailed(e) => {
                tracing::error!("Database query failed: {}", e);
                ServiceError::Storage("database operation failed".to_string())
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ServiceError::Storage("database transaction failed".to_string())
            }
            DbError::PoolExhausted => ServiceError::Storage("database is busy".to_string()),
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ServiceError::Storage("database operation failed".to_string())
            }
        }
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientStock {
                sku,
                available,
                requested,
            } => ServiceError::InsufficientStock {
                sku,
                available,
                requested,
            },
            CoreError::NotInCart(sku) => ServiceError::not_found("Cart line", sku),
            CoreError::Validation(e) => ServiceError::Validation(e.to_string()),
            other => ServiceError::Validation(other.to_string()),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
