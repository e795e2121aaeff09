//! The sector: star systems and their planets.
//!
//! The shape of the sector (which systems exist, which planets they hold) is
//! fixed once generated. Only planet inventories change, shrinking as mines
//! extract from them, so each planet guards its own inventory.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ShardError};
use crate::resource::{ResourceBag, ResourceCategory, ResourceKind};

/// Serializable description of a planet. Also used as its read-only view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanetSpec {
    pub name: String,
    pub size: u32,
    #[serde(default)]
    pub resources: ResourceBag,
}

/// Serializable description of a star system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSpec {
    pub name: String,
    #[serde(default)]
    pub planets: Vec<PlanetSpec>,
}

/// How to build a sector: generated from a seed, or listed explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectorSpec {
    Generated { seed: u64, systems: usize },
    Explicit { systems: Vec<SystemSpec> },
}

impl Default for SectorSpec {
    fn default() -> Self {
        SectorSpec::Generated {
            seed: 0,
            systems: 10,
        }
    }
}

impl SectorSpec {
    /// Expand into an explicit system list. Generation is deterministic for
    /// a given seed.
    #[must_use]
    pub fn systems(&self) -> Vec<SystemSpec> {
        match self {
            SectorSpec::Explicit { systems } => systems.clone(),
            SectorSpec::Generated { seed, systems } => {
                let mut rng = StdRng::seed_from_u64(*seed);
                (1..=*systems).map(|i| generate_system(&mut rng, i)).collect()
            }
        }
    }
}

fn generate_system(rng: &mut StdRng, index: usize) -> SystemSpec {
    let name = format!("system-{index}");
    let planet_count = rng.gen_range(1..=5);
    let planets = (1..=planet_count)
        .map(|p| {
            let size = rng.gen_range(1..=10);
            let resources = ResourceKind::ALL
                .into_iter()
                .map(|kind| (kind, rng.gen_range(0..=size * 10)))
                .collect();
            PlanetSpec {
                name: format!("{name}-{p}"),
                size,
                resources,
            }
        })
        .collect();
    SystemSpec { name, planets }
}

/// A planet and its remaining resources.
#[derive(Debug)]
pub struct Planet {
    pub name: String,
    pub size: u32,
    resources: Mutex<ResourceBag>,
}

impl Planet {
    #[must_use]
    pub fn new(spec: PlanetSpec) -> Self {
        Self {
            name: spec.name,
            size: spec.size,
            resources: Mutex::new(spec.resources),
        }
    }

    /// Current inventory.
    #[must_use]
    pub fn resources(&self) -> ResourceBag {
        self.resources.lock().clone()
    }

    /// Remove one resource of `category`, or `None` once it is exhausted.
    pub fn extract(&self, category: ResourceCategory) -> Option<ResourceKind> {
        self.resources.lock().take_one(category)
    }

    #[must_use]
    pub fn view(&self) -> PlanetSpec {
        PlanetSpec {
            name: self.name.clone(),
            size: self.size,
            resources: self.resources(),
        }
    }
}

/// A star system.
#[derive(Debug)]
pub struct StarSystem {
    pub name: String,
    pub planets: Vec<Planet>,
}

impl StarSystem {
    #[must_use]
    pub fn new(spec: SystemSpec) -> Self {
        Self {
            name: spec.name,
            planets: spec.planets.into_iter().map(Planet::new).collect(),
        }
    }

    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] if the system has no such planet.
    pub fn planet(&self, name: &str) -> Result<&Planet> {
        self.planets
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ShardError::not_found("planet", format!("{}/{name}", self.name)))
    }

    #[must_use]
    pub fn view(&self) -> SystemSpec {
        SystemSpec {
            name: self.name.clone(),
            planets: self.planets.iter().map(Planet::view).collect(),
        }
    }
}

/// Every star system of the shard.
#[derive(Debug)]
pub struct Sector {
    systems: Vec<StarSystem>,
}

impl Sector {
    #[must_use]
    pub fn new(spec: &SectorSpec) -> Self {
        Self {
            systems: spec.systems().into_iter().map(StarSystem::new).collect(),
        }
    }

    pub fn systems(&self) -> &[StarSystem] {
        &self.systems
    }

    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] for an unknown system.
    pub fn system(&self, name: &str) -> Result<&StarSystem> {
        self.systems
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ShardError::not_found("system", name))
    }

    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] if the system or the planet is
    /// unknown, or if the planet belongs to another system.
    pub fn planet(&self, system: &str, planet: &str) -> Result<&Planet> {
        self.system(system)?.planet(planet)
    }

    /// The system a planet belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] if no system holds the planet.
    pub fn system_of_planet(&self, planet: &str) -> Result<&StarSystem> {
        self.systems
            .iter()
            .find(|s| s.planets.iter().any(|p| p.name == planet))
            .ok_or_else(|| ShardError::not_found("planet", planet))
    }

    /// A uniformly chosen system, or `None` for an empty sector.
    pub fn random_system<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&StarSystem> {
        self.systems.choose(rng)
    }
}
