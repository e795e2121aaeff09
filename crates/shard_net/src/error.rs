//! Transport error types.

use shard_model::ShardError;

/// Errors that can occur while talking to another shard.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// No wormhole is configured toward the named shard.
    #[error("unknown shard '{0}'")]
    UnknownShard(String),

    /// The request could not be sent or its response could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote shard answered with a non-success status.
    #[error("remote shard rejected PUT {url} with status {status}")]
    Rejected { url: String, status: u16 },
}

impl From<NetError> for ShardError {
    fn from(err: NetError) -> Self {
        match err {
            NetError::UnknownShard(name) => ShardError::not_found("shard", name),
            other => ShardError::Remote(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use shard_model::ErrorKind;

    use super::*;

    #[test]
    fn test_unknown_shard_is_not_found() {
        let err: ShardError = NetError::UnknownShard("andromeda".into()).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "shard 'andromeda' not found");
    }

    #[test]
    fn test_rejection_is_unavailable() {
        let err: ShardError = NetError::Rejected {
            url: "http://remote/users/a".into(),
            status: 500,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
    }
}
