//! # shard_model
//!
//! The data model of a shard: what exists in the world, independent of when
//! or how it changes.
//!
//! This crate provides:
//!
//! - [`ids`]: string identifiers for users, units and buildings.
//! - [`resource`]: resource kinds, categories, inventories and the
//!   extraction priority rule.
//! - [`sector`]: star systems and planets, with mutable planet inventories.
//! - [`weapon`]: the weapon catalogue used by combat units.
//! - [`unit`]: units, their travel state and per-type catalogue data.
//! - [`building`]: mines and star ports and their construction state.
//! - [`user`]: the user aggregate owning units, buildings and balances.
//! - [`error`]: the error taxonomy shared by every shard crate.
//!
//! Everything here is synchronous. Timers and scheduling live in
//! `shard_sim`.

pub mod building;
pub mod error;
pub mod ids;
pub mod resource;
pub mod sector;
pub mod unit;
pub mod user;
pub mod weapon;

pub use building::{Building, BuildingKind, BuildingType, ConstructionState};
pub use error::{ErrorKind, Result, ShardError};
pub use ids::{BuildingId, UnitId, UserId};
pub use resource::{ResourceBag, ResourceCategory, ResourceKind, SOLID_PRIORITY};
pub use sector::{Planet, PlanetSpec, Sector, SectorSpec, StarSystem, SystemSpec};
pub use unit::{Location, TravelState, Unit, UnitKind};
pub use user::User;
pub use weapon::Weapon;
