// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Coffer secrets store.

use thiserror::Error;

/// The error type used across the vault, the signing-key registry, and their
/// persistence collaborators.
#[derive(Debug, Error)]
pub enum CofferError {
    /// Malformed or missing parameters (length checks, empty password, bad cost parameters).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// AEAD tag mismatch or wrong password.
    ///
    /// The message never distinguishes a wrong password from corrupted data.
    #[error("authentication failed: {0}")]
    AuthenticationFailure(String),

    /// A registry operation referenced an unknown key id.
    #[error("signing key not found: {key_id}")]
    KeyNotFound { key_id: String },

    /// Key-store or key-slot read/write failure.
    #[error("persistence error: {message}")]
    Persistence {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A competing writer changed the record since it was read.
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// Configuration errors, including misuse of the static signing-key override.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors (RNG failure, poisoned lock).
    #[error("internal error: {0}")]
    Internal(String),
}

/// User-visible class of an error.
///
/// Callers map these to responses without exposing the underlying detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorClass {
    IncorrectPassword,
    InvalidRequest,
    NotFound,
    Conflict,
    Internal,
}

impl CofferError {
    /// Build a persistence error that keeps the underlying cause.
    pub fn persistence<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Persistence {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The user-visible class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::AuthenticationFailure(_) => ErrorClass::IncorrectPassword,
            Self::InvalidArgument(_) | Self::Config(_) => ErrorClass::InvalidRequest,
            Self::KeyNotFound { .. } => ErrorClass::NotFound,
            Self::ConcurrencyConflict(_) => ErrorClass::Conflict,
            Self::Persistence { .. } | Self::Internal(_) => ErrorClass::Internal,
        }
    }

    /// Generic message safe to show to an end user.
    pub fn public_message(&self) -> &'static str {
        match self.class() {
            ErrorClass::IncorrectPassword => "incorrect password",
            ErrorClass::InvalidRequest => "invalid request",
            ErrorClass::NotFound => "not found",
            ErrorClass::Conflict => "the record was changed concurrently, retry the operation",
            ErrorClass::Internal => "internal error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_failures_map_to_incorrect_password() {
        let err = CofferError::AuthenticationFailure("anything".into());
        assert_eq!(err.class(), ErrorClass::IncorrectPassword);
        assert_eq!(err.public_message(), "incorrect password");
    }

    #[test]
    fn persistence_errors_are_internal_and_keep_source() {
        let err = CofferError::persistence("write failed", std::io::Error::other("disk full"));
        assert_eq!(err.class(), ErrorClass::Internal);
        assert_eq!(err.public_message(), "internal error");
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.to_string(), "persistence error: write failed");
    }

    #[test]
    fn public_message_never_echoes_detail() {
        let err = CofferError::InvalidArgument("memory_kib must be at least 8, got 4".into());
        assert!(!err.public_message().contains("memory_kib"));
        assert_eq!(err.class().to_string(), "invalid_request");
    }
}
