//! Error taxonomy shared by every shard crate.

use crate::resource::ResourceKind;

/// Coarse classification of a [`ShardError`], used by the controller layer
/// to choose a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A referenced user, unit, building, system, planet or shard is absent.
    NotFound,
    /// Malformed or mismatched identifiers.
    InvalidArgument,
    /// The operation is illegal for the current state-machine state.
    InvalidState,
    /// The caller lacks the role required for the operation.
    Unauthorized,
    /// A remote shard could not be reached or rejected the request.
    Unavailable,
}

/// Errors raised by the shard model and simulation.
///
/// All variants are detected synchronously and are never retried internally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShardError {
    /// A referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A request carried malformed or mismatched identifiers.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not legal in the entity's current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The caller is not allowed to perform the operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A debit would drive a balance below zero.
    #[error("not enough {kind}: required {required}, available {available}")]
    InsufficientResources {
        /// The resource that is short.
        kind: ResourceKind,
        /// The amount the operation needs.
        required: u32,
        /// The amount currently held.
        available: u32,
    },

    /// A remote shard failed to accept a pushed state.
    #[error("remote shard error: {0}")]
    Remote(String),
}

impl ShardError {
    /// Shorthand for a [`ShardError::NotFound`] naming the entity type and id.
    #[must_use]
    pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{what} '{id}'"))
    }

    /// Classify this error for the boundary layer.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::InvalidState(_) | Self::InsufficientResources { .. } => ErrorKind::InvalidState,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Remote(_) => ErrorKind::Unavailable,
        }
    }
}

/// Result alias defaulting to [`ShardError`].
pub type Result<T, E = ShardError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = ShardError::not_found("unit", "abc");
        assert_eq!(err.to_string(), "unit 'abc' not found");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_insufficient_resources_is_invalid_state() {
        let err = ShardError::InsufficientResources {
            kind: ResourceKind::Carbon,
            required: 5,
            available: 0,
        };
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(err.to_string(), "not enough carbon: required 5, available 0");
    }
}
