//! Command payloads and views exchanged with the controller layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shard_model::{
    BuildingKind, BuildingType, ResourceBag, ResourceCategory, Result, ShardError,
    Unit, UnitId, UnitKind, UserId,
};
use shard_net::Redirect;

/// Who issued a command. Authenticating the caller happens upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    /// A regular player.
    Player,
    /// An operator allowed to overwrite state.
    Admin,
    /// Another shard, identified by its wormhole name.
    Shard(String),
}

/// Body of a user upsert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    pub id: UserId,
    #[serde(default)]
    pub pseudo: String,
    #[serde(default)]
    pub date_of_creation: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resources_quantity: Option<ResourceBag>,
}

/// Body of a unit upsert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitRequest {
    pub id: UnitId,
    #[serde(default, rename = "type")]
    pub kind: Option<UnitKind>,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub planet: Option<String>,
    #[serde(default)]
    pub destination_system: Option<String>,
    #[serde(default)]
    pub destination_planet: Option<String>,
    #[serde(default)]
    pub destination_shard: Option<String>,
    #[serde(default)]
    pub health: Option<i32>,
    #[serde(default)]
    pub resources_quantity: Option<ResourceBag>,
}

impl UnitRequest {
    /// Returns `true` if the request names a system or planet to travel to.
    #[must_use]
    pub fn has_destination(&self) -> bool {
        self.destination_system.is_some() || self.destination_planet.is_some()
    }
}

/// Body of a building creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingRequest {
    #[serde(rename = "type")]
    pub building_type: BuildingType,
    pub builder_id: UnitId,
    #[serde(default)]
    pub resource_category: Option<ResourceCategory>,
}

impl BuildingRequest {
    /// The building kind requested.
    ///
    /// # Errors
    ///
    /// Returns [`ShardError::InvalidArgument`] for a mine without a
    /// resource category.
    pub fn kind(&self) -> Result<BuildingKind> {
        match (self.building_type, self.resource_category) {
            (BuildingType::Mine, Some(category)) => Ok(BuildingKind::Mine { category }),
            (BuildingType::Mine, None) => Err(ShardError::InvalidArgument(
                "a mine needs a resource category".to_string(),
            )),
            (BuildingType::Starport, _) => Ok(BuildingKind::StarPort),
        }
    }
}

/// Where a unit is, as shown to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitLocation {
    pub system: String,
    pub planet: Option<String>,
    /// Remaining planet resources, only revealed to scouts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources_quantity: Option<ResourceBag>,
}

/// Result of a unit upsert.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitUpdate {
    /// The unit stays on this shard.
    Unit(Unit),
    /// The unit jumped; the caller should follow the redirect.
    Redirect(Redirect),
}
