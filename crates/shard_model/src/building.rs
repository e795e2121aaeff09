//! Stationary buildings and their construction automaton.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{BuildingId, UnitId};
use crate::resource::ResourceCategory;

/// Building type as named in requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildingType {
    Mine,
    Starport,
}

/// Building type together with its type-specific configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BuildingKind {
    /// Extracts one resource of `category` from its planet per period.
    Mine { category: ResourceCategory },
    /// Builds new units once constructed.
    #[serde(rename = "starport")]
    StarPort,
}

impl BuildingKind {
    /// The request-level type tag.
    #[must_use]
    pub const fn building_type(self) -> BuildingType {
        match self {
            BuildingKind::Mine { .. } => BuildingType::Mine,
            BuildingKind::StarPort => BuildingType::Starport,
        }
    }
}

/// Construction automaton of a building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstructionState {
    /// Being built by `builder`, due at `completes_at`.
    InConstruction {
        completes_at: DateTime<Utc>,
        builder: UnitId,
    },
    /// Finished.
    Built,
}

/// A mine or star port standing on a planet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub id: BuildingId,
    pub kind: BuildingKind,
    pub system: String,
    pub planet: String,
    pub state: ConstructionState,
}

impl Building {
    /// A building under construction by `builder`.
    #[must_use]
    pub fn in_construction(
        id: BuildingId,
        kind: BuildingKind,
        system: impl Into<String>,
        planet: impl Into<String>,
        builder: UnitId,
        completes_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind,
            system: system.into(),
            planet: planet.into(),
            state: ConstructionState::InConstruction {
                completes_at,
                builder,
            },
        }
    }

    #[must_use]
    pub fn is_built(&self) -> bool {
        matches!(self.state, ConstructionState::Built)
    }

    #[must_use]
    pub fn is_star_port(&self) -> bool {
        matches!(self.kind, BuildingKind::StarPort)
    }

    /// The builder responsible for an unfinished building.
    #[must_use]
    pub fn builder(&self) -> Option<&UnitId> {
        match &self.state {
            ConstructionState::InConstruction { builder, .. } => Some(builder),
            ConstructionState::Built => None,
        }
    }

    /// Estimated completion of an unfinished building.
    #[must_use]
    pub fn estimated_completion(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            ConstructionState::InConstruction { completes_at, .. } => Some(*completes_at),
            ConstructionState::Built => None,
        }
    }

    /// The category extracted by a mine.
    #[must_use]
    pub fn resource_category(&self) -> Option<ResourceCategory> {
        match self.kind {
            BuildingKind::Mine { category } => Some(category),
            BuildingKind::StarPort => None,
        }
    }

    /// Transition InConstruction → Built.
    ///
    /// Returns `false` without changes if the building was already built.
    pub fn complete(&mut self) -> bool {
        if self.is_built() {
            return false;
        }
        self.state = ConstructionState::Built;
        true
    }
}
