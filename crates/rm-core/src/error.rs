//! # AppError
//!
//! Centralized error handling for the rusty-maint workspace.
//! Every port (repository, QR store) reports failures through this type so
//! the web layer can decide between a user-facing notice and a 500 page.

use thiserror::Error;

/// The primary error type for all rm-core operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Requested Machine/Fault does not exist (e.g., unknown code or id)
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// A machine with this code is already registered
    #[error("machine code {0} is already in use")]
    DuplicateCode(String),

    /// Input rejected before touching storage (e.g., blank name, bad code)
    #[error("validation error: {0}")]
    Validation(String),

    /// Persistence failure (e.g., disk full, locked database)
    #[error("storage error: {0}")]
    Storage(String),

    /// QR encoding or image write failed
    #[error("qr generation failed: {0}")]
    QrGeneration(String),
}

impl AppError {
    pub fn machine_not_found(code: impl Into<String>) -> Self {
        AppError::NotFound { entity: "machine", key: code.into() }
    }

    pub fn fault_not_found(id: i64) -> Self {
        AppError::NotFound { entity: "fault", key: id.to_string() }
    }

    /// True for the conditions a user can fix from the form they submitted.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            AppError::NotFound { .. } | AppError::DuplicateCode(_) | AppError::Validation(_)
        )
    }
}

/// A specialized Result type for rusty-maint logic.
pub type Result<T> = std::result::Result<T, AppError>;
