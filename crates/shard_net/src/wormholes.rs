//! Wormhole directory.
//!
//! Each entry names a remote shard and describes how to reach it: the base
//! address of its API, the local star system the wormhole opens from, and
//! the credentials this shard presents there. The same entry is used in
//! reverse to place units arriving from that shard.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::NetError;

/// How to reach one remote shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardEndpoint {
    /// Base address of the remote API, without a trailing slash.
    pub base_uri: String,
    /// Local star system the wormhole opens from.
    pub system: String,
    /// Name this shard authenticates as on the remote side.
    pub user: String,
    /// Secret shared with the remote shard.
    pub shared_password: String,
}

impl ShardEndpoint {
    /// The basic-auth login presented to the remote shard.
    #[must_use]
    pub fn login(&self) -> String {
        format!("shard-{}", self.user)
    }
}

/// Shard name → endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wormholes(BTreeMap<String, ShardEndpoint>);

impl Wormholes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the endpoint for `name`.
    pub fn insert(&mut self, name: impl Into<String>, endpoint: ShardEndpoint) {
        self.0.insert(name.into(), endpoint);
    }

    /// # Errors
    ///
    /// Returns [`NetError::UnknownShard`] if no wormhole leads to `name`.
    pub fn get(&self, name: &str) -> Result<&ShardEndpoint, NetError> {
        self.0
            .get(name)
            .ok_or_else(|| NetError::UnknownShard(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ShardEndpoint)> {
        self.0.iter().map(|(name, endpoint)| (name.as_str(), endpoint))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_camel_case_directory() {
        let json = r#"{
            "fake-remote": {
                "baseUri": "http://10.0.0.42",
                "system": "80ff2f4d",
                "user": "server-a",
                "sharedPassword": "caramba"
            }
        }"#;
        let wormholes: Wormholes = serde_json::from_str(json).unwrap();
        let remote = wormholes.get("fake-remote").unwrap();
        assert_eq!(remote.base_uri, "http://10.0.0.42");
        assert_eq!(remote.system, "80ff2f4d");
        assert_eq!(remote.login(), "shard-server-a");
    }

    #[test]
    fn test_unknown_shard() {
        let wormholes = Wormholes::new();
        assert!(matches!(
            wormholes.get("nowhere"),
            Err(NetError::UnknownShard(name)) if name == "nowhere"
        ));
    }
}
