//! The module contains the errors the engine can return.
//!
//! The errors are:
//!
//! - [`NotFound`] when an account, transaction or user does not exist or is
//!   not owned by the caller.
//! - [`Validation`] when a command carries invalid values.
//! - [`PartialOwnership`] when a bulk operation touches ids the caller does
//!   not own.
//! - [`Conflict`] when a concurrent writer changed an account first.
//!
//!  [`NotFound`]: EngineError::NotFound
//!  [`Validation`]: EngineError::Validation
//!  [`PartialOwnership`]: EngineError::PartialOwnership
//!  [`Conflict`]: EngineError::Conflict
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Some transactions were not found or do not belong to this user ({owned} of {requested})")]
    PartialOwnership { requested: usize, owned: usize },
    #[error("Concurrent update on account {0}")]
    Conflict(String),
    #[error("Corrupted record: {0}")]
    Corrupted(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (
                Self::PartialOwnership {
                    requested: ra,
                    owned: oa,
                },
                Self::PartialOwnership {
                    requested: rb,
                    owned: ob,
                },
            ) => ra == rb && oa == ob,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::Corrupted(a), Self::Corrupted(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
