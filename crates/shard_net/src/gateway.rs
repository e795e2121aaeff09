//! The jump protocol.
//!
//! A jump is a single best-effort attempt: push the owner's profile, push
//! the unit, and hand back a redirect to the unit's new home. Nothing is
//! rolled back if the second push fails, and the local unit record is left
//! for the caller to dispose of.

use std::sync::Arc;

use shard_model::{Unit, User};
use tracing::info;

use crate::client::RemoteShard;
use crate::error::NetError;
use crate::messages::{RemoteUnit, RemoteUser};
use crate::paths::{resource_url, unit_path};
use crate::wormholes::{ShardEndpoint, Wormholes};

/// HTTP `308 Permanent Redirect`.
pub const PERMANENT_REDIRECT: u16 = 308;

/// Where the caller should look for the unit after a jump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub status: u16,
    pub location: String,
}

/// Pushes units through wormholes.
#[derive(Clone)]
pub struct JumpGateway {
    wormholes: Wormholes,
    remote: Arc<dyn RemoteShard>,
}

impl std::fmt::Debug for JumpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JumpGateway")
            .field("wormholes", &self.wormholes)
            .finish_non_exhaustive()
    }
}

impl JumpGateway {
    #[must_use]
    pub fn new(wormholes: Wormholes, remote: Arc<dyn RemoteShard>) -> Self {
        Self { wormholes, remote }
    }

    #[must_use]
    pub fn wormholes(&self) -> &Wormholes {
        &self.wormholes
    }

    /// # Errors
    ///
    /// Returns [`NetError::UnknownShard`] if no wormhole leads to `shard`.
    pub fn endpoint(&self, shard: &str) -> Result<&ShardEndpoint, NetError> {
        self.wormholes.get(shard)
    }

    /// Push `user` and `unit` to `shard` and return the redirect target.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::UnknownShard`] for an unconfigured destination,
    /// or the first transport error raised by either push.
    pub async fn jump(&self, shard: &str, user: &User, unit: &Unit) -> Result<Redirect, NetError> {
        let endpoint = self.wormholes.get(shard)?;

        self.remote.put_user(endpoint, &RemoteUser::from(user)).await?;
        self.remote
            .put_unit(endpoint, &user.id, &RemoteUnit::from(unit))
            .await?;

        let location = resource_url(&endpoint.base_uri, &unit_path(&user.id, &unit.id));
        info!(shard, user_id = %user.id, unit_id = %unit.id, %location, "unit jumped");
        Ok(Redirect {
            status: PERMANENT_REDIRECT,
            location,
        })
    }
}
