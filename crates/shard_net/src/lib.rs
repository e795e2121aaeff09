//! # shard_net
//!
//! Transport between shards.
//!
//! A unit leaves a shard through a wormhole: the local shard pushes the
//! owner's profile and the unit's state to the destination shard, then
//! redirects the caller there. This crate provides:
//!
//! - [`wormholes`]: the static directory of reachable shards.
//! - [`paths`]: resource path and URL builders shared by both sides.
//! - [`messages`]: wire payloads pushed to a remote shard.
//! - [`client`]: the [`RemoteShard`] seam and its HTTP implementation.
//! - [`gateway`]: the jump protocol itself.
//! - [`error`]: transport error types.

pub mod client;
pub mod error;
pub mod gateway;
pub mod messages;
pub mod paths;
pub mod wormholes;

pub use client::{HttpShardClient, RemoteShard};
pub use error::NetError;
pub use gateway::{JumpGateway, Redirect};
pub use messages::{RemoteUnit, RemoteUser};
pub use wormholes::{ShardEndpoint, Wormholes};
