//! Payloads pushed to a remote shard during a jump.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shard_model::{ResourceBag, Unit, UnitId, UnitKind, User, UserId};

/// Public profile of a user, as upserted on the destination shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUser {
    pub id: UserId,
    pub pseudo: String,
    pub date_of_creation: DateTime<Utc>,
}

impl From<&User> for RemoteUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            pseudo: user.pseudo.clone(),
            date_of_creation: user.created_at,
        }
    }
}

/// State of a unit crossing a wormhole. Location is not transmitted: the
/// destination places the unit at its own end of the wormhole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUnit {
    pub id: UnitId,
    #[serde(rename = "type")]
    pub kind: UnitKind,
    pub health: i32,
    pub resources_quantity: ResourceBag,
}

impl From<&Unit> for RemoteUnit {
    fn from(unit: &Unit) -> Self {
        Self {
            id: unit.id.clone(),
            kind: unit.kind,
            health: unit.health,
            resources_quantity: unit.resources.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use shard_model::{Location, ResourceKind};

    use super::*;

    #[test]
    fn test_unit_payload_shape() {
        let mut unit = Unit::new(UnitId::from("c-1"), UnitKind::Cargo, Location::in_orbit("Sol"));
        unit.resources.credit(ResourceKind::Gold, 3);
        let json = serde_json::to_value(RemoteUnit::from(&unit)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "c-1",
                "type": "cargo",
                "health": 100,
                "resourcesQuantity": { "gold": 3 }
            })
        );
    }

    #[test]
    fn test_user_payload_uses_date_of_creation() {
        let user = User::new(UserId::from("alice"), "Alice", Utc::now());
        let json = serde_json::to_value(RemoteUser::from(&user)).unwrap();
        assert_eq!(json["pseudo"], "Alice");
        assert!(json.get("dateOfCreation").is_some());
        assert!(json.get("resources").is_none());
    }
}
