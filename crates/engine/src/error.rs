//! The module contains the errors the engine can return.
//!
//! Normalisation and aggregation never fail: malformed rows are absorbed by
//! defaulting. Errors only come out of the write path and report export:
//!
//! - [`InvalidAmount`] when a monetary value or quantity is not acceptable.
//! - [`InvalidDate`] when a date or month cannot be parsed.
//! - [`MissingTarget`] when a movement references neither a fund nor a project.
//! - [`InvalidMovement`] for any other rejected movement field.
//! - [`Report`] when the CSV writer fails.
//!
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`InvalidDate`]: EngineError::InvalidDate
//!  [`MissingTarget`]: EngineError::MissingTarget
//!  [`InvalidMovement`]: EngineError::InvalidMovement
//!  [`Report`]: EngineError::Report
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Movement must reference a fund or a project")]
    MissingTarget,
    #[error("Invalid movement: {0}")]
    InvalidMovement(String),
    #[error("Report export failed: {0}")]
    Report(#[from] csv::Error),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidDate(a), Self::InvalidDate(b)) => a == b,
            (Self::MissingTarget, Self::MissingTarget) => true,
            (Self::InvalidMovement(a), Self::InvalidMovement(b)) => a == b,
            (Self::Report(a), Self::Report(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
