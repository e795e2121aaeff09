//! The shared simulation state.

use std::sync::Arc;

use shard_model::{Sector, SectorSpec};

use crate::clock::Clock;
use crate::config::Timings;
use crate::registry::Registry;
use crate::schedule::Schedule;

/// Everything a background task needs, cheaply cloneable.
#[derive(Clone)]
pub struct World {
    pub clock: Arc<dyn Clock>,
    pub sector: Arc<Sector>,
    pub registry: Arc<Registry>,
    pub schedule: Arc<Schedule>,
    pub timings: Timings,
}

impl World {
    /// An empty world over a freshly built sector.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, sector: &SectorSpec, timings: Timings) -> Self {
        Self {
            clock,
            sector: Arc::new(Sector::new(sector)),
            registry: Arc::new(Registry::new()),
            schedule: Arc::new(Schedule::new()),
            timings,
        }
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("systems", &self.sector.systems().len())
            .field("pending", &self.schedule.pending())
            .field("timings", &self.timings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Shared test world: two systems, Sol with Earth and Mars, and Vega
    //! with a single planet.

    use chrono::{TimeZone, Utc};
    use shard_model::{
        Location, PlanetSpec, ResourceBag, ResourceKind, SystemSpec, Unit, UnitId, UnitKind, User,
        UserId,
    };

    use super::*;
    use crate::clock::ManualClock;

    pub fn sector() -> SectorSpec {
        SectorSpec::Explicit {
            systems: vec![
                SystemSpec {
                    name: "Sol".into(),
                    planets: vec![
                        PlanetSpec {
                            name: "Earth".into(),
                            size: 5,
                            resources: ResourceBag::from([
                                (ResourceKind::Titanium, 0),
                                (ResourceKind::Gold, 3),
                                (ResourceKind::Aluminium, 3),
                                (ResourceKind::Iron, 5),
                                (ResourceKind::Carbon, 5),
                                (ResourceKind::Water, 1),
                            ]),
                        },
                        PlanetSpec {
                            name: "Mars".into(),
                            size: 2,
                            resources: ResourceBag::new(),
                        },
                    ],
                },
                SystemSpec {
                    name: "Vega".into(),
                    planets: vec![PlanetSpec {
                        name: "Vega-1".into(),
                        size: 1,
                        resources: ResourceBag::new(),
                    }],
                },
            ],
        }
    }

    pub fn world() -> (ManualClock, World) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let world = World::new(Arc::new(clock.clone()), &sector(), Timings::default());
        (clock, world)
    }

    /// Register `user` owning one unit per `(id, kind, location)`.
    pub fn user_with(world: &World, user: &str, units: &[(&str, UnitKind, Location)]) -> UserId {
        let id = UserId::from(user);
        let mut aggregate = User::new(id.clone(), user, world.clock.now());
        for (unit, kind, location) in units {
            aggregate.upsert_unit(Unit::new(UnitId::from(*unit), *kind, location.clone()));
        }
        world.registry.insert_user_if_absent(aggregate);
        id
    }
}
