//! The user aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::building::Building;
use crate::error::{Result, ShardError};
use crate::ids::{BuildingId, UnitId, UserId};
use crate::resource::{ResourceBag, ResourceKind};
use crate::unit::{Location, Unit};

/// A player: owns units, buildings and a resource balance.
///
/// The user is the unit of exclusive access in the registry, so every
/// invariant spanning a unit and a building (a builder's construction list,
/// a building's responsible builder) is maintained through methods here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub pseudo: String,
    pub created_at: DateTime<Utc>,
    pub units: Vec<Unit>,
    pub buildings: Vec<Building>,
    pub resources: ResourceBag,
}

impl User {
    /// A user with no units, no buildings and every balance at zero.
    #[must_use]
    pub fn new(id: UserId, pseudo: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            pseudo: pseudo.into(),
            created_at,
            units: Vec::new(),
            buildings: Vec::new(),
            resources: ResourceBag::zeroed(),
        }
    }

    /// Balances granted to a newly registered player.
    #[must_use]
    pub fn starting_resources() -> ResourceBag {
        let mut bag = ResourceBag::zeroed();
        bag.set(ResourceKind::Carbon, 20);
        bag.set(ResourceKind::Iron, 10);
        bag.set(ResourceKind::Oxygen, 50);
        bag.set(ResourceKind::Water, 50);
        bag
    }

    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] if the user owns no such unit.
    pub fn unit(&self, id: &UnitId) -> Result<&Unit> {
        self.units
            .iter()
            .find(|u| &u.id == id)
            .ok_or_else(|| ShardError::not_found("unit", id))
    }

    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] if the user owns no such unit.
    pub fn unit_mut(&mut self, id: &UnitId) -> Result<&mut Unit> {
        self.units
            .iter_mut()
            .find(|u| &u.id == id)
            .ok_or_else(|| ShardError::not_found("unit", id))
    }

    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] if the user owns no such building.
    pub fn building(&self, id: &BuildingId) -> Result<&Building> {
        self.buildings
            .iter()
            .find(|b| &b.id == id)
            .ok_or_else(|| ShardError::not_found("building", id))
    }

    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] if the user owns no such building.
    pub fn building_mut(&mut self, id: &BuildingId) -> Result<&mut Building> {
        self.buildings
            .iter_mut()
            .find(|b| &b.id == id)
            .ok_or_else(|| ShardError::not_found("building", id))
    }

    /// Add or replace a unit with the same id.
    pub fn upsert_unit(&mut self, unit: Unit) {
        match self.units.iter_mut().find(|u| u.id == unit.id) {
            Some(existing) => *existing = unit,
            None => self.units.push(unit),
        }
    }

    pub fn remove_unit(&mut self, id: &UnitId) -> Option<Unit> {
        let index = self.units.iter().position(|u| &u.id == id)?;
        Some(self.units.remove(index))
    }

    pub fn add_building(&mut self, building: Building) {
        self.buildings.push(building);
    }

    /// The builder whose construction list holds `building`.
    #[must_use]
    pub fn responsible_builder(&self, building: &BuildingId) -> Option<&Unit> {
        self.units
            .iter()
            .find(|u| u.buildings().contains(building))
    }

    /// Returns `true` if a finished star port stands on the planet of `at`.
    #[must_use]
    pub fn has_built_star_port_at(&self, at: &Location) -> bool {
        let Some(planet) = at.planet.as_deref() else {
            return false;
        };
        self.buildings.iter().any(|b| {
            b.is_star_port() && b.is_built() && b.system == at.system && b.planet == planet
        })
    }

    /// Remove an unfinished building and release it from its builder.
    ///
    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] for an unknown building and
    /// [`ShardError::InvalidState`] if it is already built, in which case
    /// nothing is removed.
    pub fn cancel_construction(&mut self, id: &BuildingId) -> Result<Building> {
        let index = self
            .buildings
            .iter()
            .position(|b| &b.id == id)
            .ok_or_else(|| ShardError::not_found("building", id))?;
        if self.buildings[index].is_built() {
            return Err(ShardError::InvalidState(format!(
                "building '{id}' is already built"
            )));
        }
        for unit in &mut self.units {
            unit.detach_building(id);
        }
        Ok(self.buildings.remove(index))
    }

    /// Ids of unfinished buildings `builder` is responsible for.
    #[must_use]
    pub fn constructions_of(&self, builder: &UnitId) -> Vec<BuildingId> {
        self.unit(builder)
            .map(|u| {
                u.buildings()
                    .iter()
                    .filter(|b| self.building(b).is_ok_and(|b| !b.is_built()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::building::BuildingKind;
    use crate::resource::ResourceCategory;
    use crate::unit::UnitKind;

    fn user_with_construction() -> User {
        let mut user = User::new(UserId::from("alice"), "Alice", Utc::now());
        let mut builder = Unit::new(
            UnitId::from("b"),
            UnitKind::Builder,
            Location::landed("Sol", "Earth"),
        );
        builder.attach_building(BuildingId::from("mine")).unwrap();
        user.upsert_unit(builder);
        user.add_building(Building::in_construction(
            BuildingId::from("mine"),
            BuildingKind::Mine {
                category: ResourceCategory::Liquid,
            },
            "Sol",
            "Earth",
            UnitId::from("b"),
            Utc.timestamp_opt(300, 0).unwrap(),
        ));
        user
    }

    #[test]
    fn test_starting_resources() {
        let bag = User::starting_resources();
        assert_eq!(bag.get(ResourceKind::Carbon), 20);
        assert_eq!(bag.get(ResourceKind::Iron), 10);
        assert_eq!(bag.get(ResourceKind::Oxygen), 50);
        assert_eq!(bag.get(ResourceKind::Water), 50);
        assert_eq!(bag.get(ResourceKind::Gold), 0);
    }

    #[test]
    fn test_cancel_construction_releases_builder() {
        let mut user = user_with_construction();
        assert_eq!(user.constructions_of(&UnitId::from("b")).len(), 1);
        let removed = user.cancel_construction(&BuildingId::from("mine")).unwrap();
        assert_eq!(removed.id, BuildingId::from("mine"));
        assert!(user.buildings.is_empty());
        assert!(user.responsible_builder(&BuildingId::from("mine")).is_none());
    }

    #[test]
    fn test_cancel_built_building_is_invalid_state() {
        let mut user = user_with_construction();
        user.building_mut(&BuildingId::from("mine")).unwrap().complete();
        let err = user
            .cancel_construction(&BuildingId::from("mine"))
            .unwrap_err();
        assert!(matches!(err, ShardError::InvalidState(_)));
        assert_eq!(user.buildings.len(), 1);
    }

    #[test]
    fn test_star_port_must_be_built_and_colocated() {
        let mut user = user_with_construction();
        user.add_building(Building::in_construction(
            BuildingId::from("port"),
            BuildingKind::StarPort,
            "Sol",
            "Earth",
            UnitId::from("b"),
            Utc::now(),
        ));
        let earth = Location::landed("Sol", "Earth");
        assert!(!user.has_built_star_port_at(&earth));
        user.building_mut(&BuildingId::from("port")).unwrap().complete();
        assert!(user.has_built_star_port_at(&earth));
        assert!(!user.has_built_star_port_at(&Location::landed("Sol", "Mars")));
        assert!(!user.has_built_star_port_at(&Location::in_orbit("Sol")));
    }

    #[test]
    fn test_lookups_fail_with_not_found() {
        let user = user_with_construction();
        assert!(matches!(
            user.unit(&UnitId::from("ghost")),
            Err(ShardError::NotFound(_))
        ));
        assert!(matches!(
            user.building(&BuildingId::from("ghost")),
            Err(ShardError::NotFound(_))
        ));
    }
}
