//! Units and their travel state.
//!
//! A [`Unit`] is one tagged entity: the [`UnitKind`] tag decides its health,
//! weapons, cost and targeting rules, and a private role payload carries the
//! type-specific data (a builder's construction list, a combat unit's
//! weapons).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ShardError};
use crate::ids::{BuildingId, UnitId};
use crate::resource::{ResourceBag, ResourceKind};
use crate::weapon::Weapon;

/// Bombers divide incoming cruiser damage by this factor.
const BOMBER_CRUISER_DAMAGE_DIVISOR: i32 = 10;

/// The type of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Scout,
    Builder,
    Cargo,
    Fighter,
    Cruiser,
    Bomber,
}

impl UnitKind {
    /// Health of a freshly built unit.
    #[must_use]
    pub const fn max_health(self) -> i32 {
        match self {
            UnitKind::Scout | UnitKind::Builder => 20,
            UnitKind::Cargo => 100,
            UnitKind::Fighter => 80,
            UnitKind::Cruiser => 400,
            UnitKind::Bomber => 50,
        }
    }

    /// Weapons mounted at construction. Empty for non-combat units.
    #[must_use]
    pub fn weapons(self) -> Vec<Weapon> {
        match self {
            UnitKind::Fighter => vec![Weapon::CANNON],
            UnitKind::Cruiser => vec![Weapon::CANNON; 4],
            UnitKind::Bomber => vec![Weapon::BOMB],
            _ => Vec::new(),
        }
    }

    /// Returns `true` for fighters, cruisers and bombers.
    #[must_use]
    pub const fn is_combat(self) -> bool {
        matches!(self, UnitKind::Fighter | UnitKind::Cruiser | UnitKind::Bomber)
    }

    /// Resources a star port consumes to build this unit.
    #[must_use]
    pub fn cost(self) -> ResourceBag {
        use ResourceKind::*;
        match self {
            UnitKind::Scout => ResourceBag::from([(Carbon, 5), (Iron, 5)]),
            UnitKind::Builder => ResourceBag::from([(Carbon, 5), (Iron, 10)]),
            UnitKind::Fighter => ResourceBag::from([(Iron, 20), (Aluminium, 10)]),
            UnitKind::Bomber => ResourceBag::from([(Iron, 30), (Titanium, 10)]),
            UnitKind::Cruiser => ResourceBag::from([(Iron, 60), (Gold, 20)]),
            UnitKind::Cargo => ResourceBag::from([(Carbon, 10), (Iron, 10), (Gold, 5)]),
        }
    }

    /// Enemy types this unit shoots at, most preferred first.
    #[must_use]
    pub const fn target_priority(self) -> &'static [UnitKind] {
        match self {
            UnitKind::Fighter => &[UnitKind::Bomber, UnitKind::Fighter, UnitKind::Cruiser],
            UnitKind::Cruiser => &[UnitKind::Fighter, UnitKind::Cruiser, UnitKind::Bomber],
            UnitKind::Bomber => &[UnitKind::Cruiser, UnitKind::Bomber, UnitKind::Fighter],
            _ => &[],
        }
    }

    /// Damage actually taken by a unit of this kind when hit for `damage`
    /// by an `attacker`.
    #[must_use]
    pub const fn incoming_damage(self, attacker: UnitKind, damage: i32) -> i32 {
        match (self, attacker) {
            (UnitKind::Bomber, UnitKind::Cruiser) => damage / BOMBER_CRUISER_DAMAGE_DIVISOR,
            _ => damage,
        }
    }
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UnitKind::Scout => "scout",
            UnitKind::Builder => "builder",
            UnitKind::Cargo => "cargo",
            UnitKind::Fighter => "fighter",
            UnitKind::Cruiser => "cruiser",
            UnitKind::Bomber => "bomber",
        };
        f.write_str(name)
    }
}

/// A position in the sector: a star system and optionally one of its planets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Star system name.
    pub system: String,
    /// Planet name, if the unit is landed.
    pub planet: Option<String>,
}

impl Location {
    /// In orbit of `system`, not on any planet.
    #[must_use]
    pub fn in_orbit(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            planet: None,
        }
    }

    /// Landed on `planet` in `system`.
    #[must_use]
    pub fn landed(system: impl Into<String>, planet: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            planet: Some(planet.into()),
        }
    }

    /// Returns `true` if `other` is close enough to exchange fire: same planet
    /// when this location is landed, same system otherwise.
    #[must_use]
    pub fn in_range_of(&self, other: &Location) -> bool {
        match &self.planet {
            Some(_) => self == other,
            None => self.system == other.system,
        }
    }
}

/// The travel automaton of a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TravelState {
    /// Stationary at the current location.
    Idle,
    /// Travelling toward `destination`, due at `arrival`.
    Moving {
        destination: Location,
        arrival: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum UnitRole {
    Basic,
    Builder { buildings: Vec<BuildingId> },
    Combat { weapons: Vec<Weapon> },
}

/// A mobile unit owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Unique unit id.
    pub id: UnitId,
    /// Unit type.
    pub kind: UnitKind,
    /// Remaining health. The unit is destroyed at zero or below.
    pub health: i32,
    /// Carried resources. Only meaningful for cargos.
    pub resources: ResourceBag,
    location: Location,
    travel: TravelState,
    role: UnitRole,
}

impl Unit {
    /// Create an idle unit of `kind` at full health.
    #[must_use]
    pub fn new(id: UnitId, kind: UnitKind, location: Location) -> Self {
        let role = match kind {
            UnitKind::Builder => UnitRole::Builder {
                buildings: Vec::new(),
            },
            k if k.is_combat() => UnitRole::Combat {
                weapons: k.weapons(),
            },
            _ => UnitRole::Basic,
        };
        Self {
            id,
            kind,
            health: kind.max_health(),
            resources: ResourceBag::new(),
            location,
            travel: TravelState::Idle,
            role,
        }
    }

    /// Current location. While moving this is the departure point.
    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Current travel state.
    #[must_use]
    pub fn travel(&self) -> &TravelState {
        &self.travel
    }

    /// Returns `true` while travelling.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        matches!(self.travel, TravelState::Moving { .. })
    }

    /// Destination of the current travel.
    #[must_use]
    pub fn destination(&self) -> Option<&Location> {
        match &self.travel {
            TravelState::Moving { destination, .. } => Some(destination),
            TravelState::Idle => None,
        }
    }

    /// Estimated arrival of the current travel.
    #[must_use]
    pub fn estimated_arrival(&self) -> Option<DateTime<Utc>> {
        match &self.travel {
            TravelState::Moving { arrival, .. } => Some(*arrival),
            TravelState::Idle => None,
        }
    }

    /// Transition Idle → Moving.
    ///
    /// # Errors
    ///
    /// Returns [`ShardError::InvalidState`] if the unit is already moving.
    pub fn begin_travel(&mut self, destination: Location, arrival: DateTime<Utc>) -> Result<()> {
        if self.is_moving() {
            return Err(ShardError::InvalidState(format!(
                "unit '{}' is already moving",
                self.id
            )));
        }
        self.travel = TravelState::Moving {
            destination,
            arrival,
        };
        Ok(())
    }

    /// Transition Moving → Idle, adopting the destination as location.
    ///
    /// Returns `false` without changes if the unit was already idle.
    pub fn arrive(&mut self) -> bool {
        match std::mem::replace(&mut self.travel, TravelState::Idle) {
            TravelState::Moving { destination, .. } => {
                self.location = destination;
                true
            }
            TravelState::Idle => false,
        }
    }

    /// Returns `true` once health has dropped to zero or below.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.health <= 0
    }

    /// Apply a hit of `damage` from an `attacker`, after this unit type's
    /// damage adjustment.
    pub fn take_damage(&mut self, damage: i32, attacker: UnitKind) {
        let taken = self.kind.incoming_damage(attacker, damage);
        self.health = self.health.saturating_sub(taken);
    }

    /// Weapons mounted on this unit. Empty for non-combat units.
    #[must_use]
    pub fn weapons(&self) -> &[Weapon] {
        match &self.role {
            UnitRole::Combat { weapons } => weapons,
            _ => &[],
        }
    }

    /// Buildings this builder is constructing. Empty for other units.
    #[must_use]
    pub fn buildings(&self) -> &[BuildingId] {
        match &self.role {
            UnitRole::Builder { buildings } => buildings,
            _ => &[],
        }
    }

    /// Make this builder responsible for `building`.
    ///
    /// # Errors
    ///
    /// Returns [`ShardError::InvalidState`] if the unit is not a builder.
    pub fn attach_building(&mut self, building: BuildingId) -> Result<()> {
        match &mut self.role {
            UnitRole::Builder { buildings } => {
                if !buildings.contains(&building) {
                    buildings.push(building);
                }
                Ok(())
            }
            _ => Err(ShardError::InvalidState(format!(
                "unit '{}' is a {} and cannot construct buildings",
                self.id, self.kind
            ))),
        }
    }

    /// Release `building` from this builder. Returns `true` if it was listed.
    pub fn detach_building(&mut self, building: &BuildingId) -> bool {
        match &mut self.role {
            UnitRole::Builder { buildings } => {
                let before = buildings.len();
                buildings.retain(|b| b != building);
                buildings.len() != before
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_catalogue_health_and_weapons() {
        let cruiser = Unit::new(UnitId::from("c"), UnitKind::Cruiser, Location::in_orbit("Sol"));
        assert_eq!(cruiser.health, 400);
        assert_eq!(cruiser.weapons().len(), 4);

        let scout = Unit::new(UnitId::from("s"), UnitKind::Scout, Location::in_orbit("Sol"));
        assert!(scout.weapons().is_empty());
        assert!(scout.buildings().is_empty());
    }

    #[test]
    fn test_begin_travel_twice_is_invalid_state() {
        let mut unit = Unit::new(UnitId::from("u"), UnitKind::Scout, Location::in_orbit("Sol"));
        unit.begin_travel(Location::in_orbit("Vega"), at(60)).unwrap();
        let err = unit
            .begin_travel(Location::in_orbit("Rigel"), at(120))
            .unwrap_err();
        assert!(matches!(err, ShardError::InvalidState(_)));
        assert_eq!(unit.destination(), Some(&Location::in_orbit("Vega")));
    }

    #[test]
    fn test_arrive_is_idempotent() {
        let mut unit = Unit::new(UnitId::from("u"), UnitKind::Scout, Location::in_orbit("Sol"));
        unit.begin_travel(Location::landed("Vega", "Vega-1"), at(60)).unwrap();
        assert!(unit.arrive());
        let once = unit.clone();
        assert!(!unit.arrive());
        assert_eq!(unit, once);
        assert_eq!(unit.location(), &Location::landed("Vega", "Vega-1"));
        assert_eq!(unit.estimated_arrival(), None);
    }

    #[test]
    fn test_bomber_resists_cruisers() {
        let mut bomber = Unit::new(UnitId::from("b"), UnitKind::Bomber, Location::in_orbit("Sol"));
        bomber.take_damage(10, UnitKind::Cruiser);
        assert_eq!(bomber.health, 49);
        bomber.take_damage(10, UnitKind::Fighter);
        assert_eq!(bomber.health, 39);
    }

    #[test]
    fn test_only_builders_attach_buildings() {
        let mut builder = Unit::new(UnitId::from("b"), UnitKind::Builder, Location::in_orbit("Sol"));
        builder.attach_building(BuildingId::from("mine")).unwrap();
        assert_eq!(builder.buildings(), &[BuildingId::from("mine")]);
        assert!(builder.detach_building(&BuildingId::from("mine")));
        assert!(!builder.detach_building(&BuildingId::from("mine")));

        let mut fighter = Unit::new(UnitId::from("f"), UnitKind::Fighter, Location::in_orbit("Sol"));
        assert!(fighter.attach_building(BuildingId::from("mine")).is_err());
    }

    #[test]
    fn test_range_rules() {
        let orbit = Location::in_orbit("Sol");
        let landed = Location::landed("Sol", "Earth");
        assert!(orbit.in_range_of(&landed));
        assert!(!landed.in_range_of(&orbit));
        assert!(landed.in_range_of(&Location::landed("Sol", "Earth")));
        assert!(!landed.in_range_of(&Location::landed("Sol", "Mars")));
    }

    #[test]
    fn test_target_priority_tables() {
        assert_eq!(UnitKind::Fighter.target_priority()[0], UnitKind::Bomber);
        assert_eq!(UnitKind::Cruiser.target_priority()[0], UnitKind::Fighter);
        assert_eq!(UnitKind::Bomber.target_priority()[0], UnitKind::Cruiser);
        assert!(UnitKind::Scout.target_priority().is_empty());
    }
}
