//! Resource paths shared by the local API and remote shards.
//!
//! A jumping unit keeps its id and its owner's id, so the path on the
//! destination shard mirrors the local one.

use shard_model::{UnitId, UserId};

/// `/users/<user_id>`
#[must_use]
pub fn user_path(user: &UserId) -> String {
    format!("/users/{user}")
}

/// `/users/<user_id>/units/<unit_id>`
#[must_use]
pub fn unit_path(user: &UserId, unit: &UnitId) -> String {
    format!("/users/{user}/units/{unit}")
}

/// Join a base address and an absolute path, tolerating a trailing slash on
/// the base.
#[must_use]
pub fn resource_url(base_uri: &str, path: &str) -> String {
    format!("{}{path}", base_uri.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_path() {
        assert_eq!(user_path(&UserId::from("alice")), "/users/alice");
    }

    #[test]
    fn test_unit_path() {
        assert_eq!(
            unit_path(&UserId::from("alice"), &UnitId::from("u-1")),
            "/users/alice/units/u-1"
        );
    }

    #[test]
    fn test_resource_url_strips_trailing_slash() {
        assert_eq!(
            resource_url("http://remote/", "/users/alice"),
            "http://remote/users/alice"
        );
        assert_eq!(
            resource_url("http://remote", "/users/alice"),
            "http://remote/users/alice"
        );
    }
}
