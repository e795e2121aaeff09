//! Remote shard client.
//!
//! [`RemoteShard`] is the seam the jump gateway pushes state through.
//! [`HttpShardClient`] is the production implementation; tests substitute
//! an in-memory recorder.

use async_trait::async_trait;
use serde::Serialize;
use shard_model::UserId;
use tracing::debug;

use crate::error::NetError;
use crate::messages::{RemoteUnit, RemoteUser};
use crate::paths::{resource_url, unit_path, user_path};
use crate::wormholes::ShardEndpoint;

/// Idempotent upserts against another shard.
#[async_trait]
pub trait RemoteShard: Send + Sync {
    /// Create or replace a user's public profile on the remote shard.
    async fn put_user(&self, endpoint: &ShardEndpoint, user: &RemoteUser) -> Result<(), NetError>;

    /// Create or replace a unit owned by `owner` on the remote shard.
    async fn put_unit(
        &self,
        endpoint: &ShardEndpoint,
        owner: &UserId,
        unit: &RemoteUnit,
    ) -> Result<(), NetError>;
}

/// JSON-over-HTTP client authenticating with the endpoint's shared secret.
#[derive(Debug, Clone, Default)]
pub struct HttpShardClient {
    http: reqwest::Client,
}

impl HttpShardClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse an existing connection pool.
    #[must_use]
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn put<T: Serialize + Sync>(
        &self,
        endpoint: &ShardEndpoint,
        path: &str,
        body: &T,
    ) -> Result<(), NetError> {
        let url = resource_url(&endpoint.base_uri, path);
        debug!(%url, login = %endpoint.login(), "PUT to remote shard");
        let response = self
            .http
            .put(&url)
            .basic_auth(endpoint.login(), Some(&endpoint.shared_password))
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NetError::Rejected {
                url,
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteShard for HttpShardClient {
    async fn put_user(&self, endpoint: &ShardEndpoint, user: &RemoteUser) -> Result<(), NetError> {
        self.put(endpoint, &user_path(&user.id), user).await
    }

    async fn put_unit(
        &self,
        endpoint: &ShardEndpoint,
        owner: &UserId,
        unit: &RemoteUnit,
    ) -> Result<(), NetError> {
        self.put(endpoint, &unit_path(owner, &unit.id), unit).await
    }
}
