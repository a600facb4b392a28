//! Unified error type for the ledger services, the billing job and the HTTP layer.
//!
//! Every failure a service can raise is a variant here. The HTTP layer turns
//! them into `{code, message, details}` responses through [`Error::code`] and
//! [`Error::status`], so the mapping lives in exactly one place.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A single field-level validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    /// camelCase name of the offending input field
    pub field: String,
    /// Human-readable reason
    pub message: String,
}

impl FieldIssue {
    /// Builds an issue for `field`.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Entity kinds that can be looked up by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A ledger transaction
    Transaction,
    /// A recurring subscription definition
    Subscription,
    /// A logical payment card
    Card,
}

impl EntityKind {
    const fn code(self) -> &'static str {
        match self {
            Self::Transaction => "TRANSACTION_NOT_FOUND",
            Self::Subscription => "SUBSCRIPTION_NOT_FOUND",
            Self::Card => "CARD_NOT_FOUND",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transaction => "Transaction",
            Self::Subscription => "Subscription",
            Self::Card => "Card",
        };
        f.write_str(name)
    }
}

/// All errors raised by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or out-of-range input
    #[error("Invalid payload: {message}")]
    Validation {
        /// Summary of what went wrong
        message: String,
        /// Per-field problems
        issues: Vec<FieldIssue>,
    },

    /// No resolvable identity on the request
    #[error("Unauthorized")]
    Unauthorized,

    /// The entity exists but belongs to someone else
    #[error("{message}")]
    Forbidden {
        /// Description of the denied access
        message: String,
    },

    /// A referenced card or subscription is missing or not owned by the caller
    #[error("Related {field} not found for user")]
    ForeignRelationInvalid {
        /// camelCase field carrying the bad reference
        field: &'static str,
    },

    /// The entity id does not exist at all
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Which kind of entity was looked up
        entity: EntityKind,
        /// The id that was requested
        id: String,
    },

    /// An operation that needs the data store ran without one
    #[error("Operation is only available on the server")]
    ServerOnly,

    /// Missing or malformed configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong with the configuration
        message: String,
    },

    /// An encrypted payload could not be decoded
    #[error("Invalid encrypted payload: {message}")]
    Decoding {
        /// What failed to decode
        message: String,
    },

    /// An encrypted payload failed tag verification
    #[error("Encrypted payload failed authentication")]
    Authentication,

    /// Database failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O failure (config file, socket)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Validation error with a single field issue.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let issue = FieldIssue::new(field, message);
        Self::Validation {
            message: issue.message.clone(),
            issues: vec![issue],
        }
    }

    /// Validation error built from collected issues.
    #[must_use]
    pub fn invalid_payload(issues: Vec<FieldIssue>) -> Self {
        Self::Validation {
            message: "Invalid payload".to_string(),
            issues,
        }
    }

    /// Stable machine-readable code exposed at the HTTP boundary.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::ForeignRelationInvalid { .. } => "FOREIGN_RELATION_INVALID",
            Self::NotFound { entity, .. } => entity.code(),
            Self::ServerOnly => "SERVER_ONLY",
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Decoding { .. } | Self::Authentication => "CIPHER_ERROR",
            Self::Database(_) | Self::Io(_) | Self::Json(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status attached to this kind of error.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::Validation { .. } | Self::ForeignRelationInvalid { .. } => 400,
            Self::Unauthorized => 401,
            Self::Forbidden { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::ServerOnly
            | Self::Config { .. }
            | Self::Decoding { .. }
            | Self::Authentication
            | Self::Database(_)
            | Self::Io(_)
            | Self::Json(_) => 500,
        }
    }

    /// Whether the error is an expected, client-facing failure.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status() < 500
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    #![allow(clippy::panic)]
    use super::*;

    #[test]
    fn test_codes_and_statuses() {
        let not_found = Error::NotFound {
            entity: EntityKind::Subscription,
            id: "sub-1".to_string(),
        };
        assert_eq!(not_found.code(), "SUBSCRIPTION_NOT_FOUND");
        assert_eq!(not_found.status(), 404);

        let relation = Error::ForeignRelationInvalid { field: "cardId" };
        assert_eq!(relation.code(), "FOREIGN_RELATION_INVALID");
        assert_eq!(relation.status(), 400);

        assert_eq!(Error::Unauthorized.status(), 401);
        assert_eq!(Error::ServerOnly.code(), "SERVER_ONLY");
        assert!(!Error::Authentication.is_client_error());
    }

    #[test]
    fn test_invalid_field_keeps_issue() {
        let err = Error::invalid_field("value", "must be greater than zero");
        match err {
            Error::Validation { message, issues } => {
                assert_eq!(message, "must be greater than zero");
                assert_eq!(issues, vec![FieldIssue::new("value", "must be greater than zero")]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
