//! Unit travel.
//!
//! A unit leaves Idle with [`start_travel`] and returns to it when its
//! scheduled arrival fires. The check-then-set runs under the owner's
//! exclusive entry, so two travel orders for the same unit cannot both be
//! admitted.

use std::time::Duration;

use shard_model::{Location, Result, ShardError, Unit, UnitId, UserId};
use tracing::{debug, info};

use crate::clock::after;
use crate::config::Timings;
use crate::registry::Registry;
use crate::schedule::Outcome;
use crate::world::World;

/// Returns `true` when a landed unit heads for open space.
#[must_use]
pub fn is_leaving_planet(from: &Location, to: &Location) -> bool {
    from.planet.is_some() && to.planet.is_none()
}

/// Time needed to get from `from` to `to`.
///
/// Changing system costs the system travel time; landing on a different
/// planet costs the planet travel time. Taking off into open space is free.
#[must_use]
pub fn compute_travel_time(from: &Location, to: &Location, timings: &Timings) -> Duration {
    let mut total = Duration::ZERO;
    if from.system != to.system {
        total += timings.system_travel();
    }
    if !is_leaving_planet(from, to) && from.planet != to.planet {
        total += timings.planet_travel();
    }
    total
}

/// Send `unit` toward `destination`, arriving `duration` from now.
///
/// A builder abandons every building it still has under construction.
///
/// # Errors
///
/// Returns [`ShardError::NotFound`] for an unknown user or unit and
/// [`ShardError::InvalidState`] if the unit is already moving.
pub fn start_travel(
    world: &World,
    owner: &UserId,
    unit: &UnitId,
    destination: Location,
    duration: Duration,
) -> Result<Unit> {
    let arrival = after(world.clock.now(), duration);
    let (travelling, abandoned) = world.registry.with_user_mut(owner, |user| {
        if user.unit(unit)?.is_moving() {
            return Err(ShardError::InvalidState(format!(
                "unit '{unit}' is already moving"
            )));
        }
        let abandoned = user.constructions_of(unit);
        for building in &abandoned {
            user.cancel_construction(building)?;
        }
        let moving = user.unit_mut(unit)?;
        moving.begin_travel(destination, arrival)?;
        Ok((moving.clone(), abandoned))
    })?;

    for building in &abandoned {
        world.schedule.cancel_construction(building);
        info!(unit_id = %unit, building_id = %building, "builder left, construction cancelled");
    }

    let registry = world.registry.clone();
    let arriving = unit.clone();
    world.schedule.schedule_travel(
        world.clock.clone(),
        unit.clone(),
        arrival,
        duration,
        move || complete_travel(&registry, &arriving),
    );

    info!(
        user_id = %owner,
        unit_id = %unit,
        system = travelling.destination().map(|d| d.system.as_str()),
        planet = travelling.destination().and_then(|d| d.planet.as_deref()),
        eta = %arrival,
        "travel started"
    );
    Ok(travelling)
}

/// Arrival handler: adopt the destination and return to Idle.
///
/// A unit that already arrived is left untouched. A unit that no longer
/// exists resolves the travel as cancelled.
pub fn complete_travel(registry: &Registry, unit: &UnitId) -> Outcome {
    let arrived = registry
        .owner_of_unit(unit)
        .and_then(|owner| registry.with_user_mut(&owner, |user| Ok(user.unit_mut(unit)?.arrive())));
    match arrived {
        Ok(true) => {
            info!(unit_id = %unit, "unit arrived");
            Outcome::Completed
        }
        Ok(false) => Outcome::Completed,
        Err(err) => {
            debug!(unit_id = %unit, error = %err, "arrival of a vanished unit");
            Outcome::Cancelled
        }
    }
}

/// Suspend until `unit` has arrived, unless it is within the last two
/// seconds of its travel, in which case return at once and let the caller
/// read the pre-arrival location.
pub async fn wait_if_moving(world: &World, unit: &UnitId) {
    let Some(arrival) = world.schedule.travel(unit) else {
        return;
    };
    if arrival.is_almost_done() {
        return;
    }
    arrival.wait().await;
}

#[cfg(test)]
mod tests {
    use shard_model::UnitKind;

    use super::*;
    use crate::clock::ManualClock;
    use crate::world::fixtures;

    #[test]
    fn test_travel_time_rules() {
        let timings = Timings::default();
        let sol = Location::in_orbit("Sol");
        let earth = Location::landed("Sol", "Earth");
        let mars = Location::landed("Sol", "Mars");
        let vega = Location::in_orbit("Vega");
        let vega_1 = Location::landed("Vega", "Vega-1");

        assert_eq!(compute_travel_time(&sol, &sol, &timings), Duration::ZERO);
        assert_eq!(compute_travel_time(&sol, &earth, &timings), Duration::from_secs(15));
        assert_eq!(compute_travel_time(&earth, &mars, &timings), Duration::from_secs(15));
        assert_eq!(compute_travel_time(&earth, &sol, &timings), Duration::ZERO);
        assert_eq!(compute_travel_time(&sol, &vega, &timings), Duration::from_secs(60));
        assert_eq!(compute_travel_time(&sol, &vega_1, &timings), Duration::from_secs(75));
        assert_eq!(compute_travel_time(&earth, &vega, &timings), Duration::from_secs(60));
        assert!(is_leaving_planet(&earth, &sol));
        assert!(!is_leaving_planet(&sol, &earth));
    }

    #[tokio::test]
    async fn test_second_travel_order_is_invalid_state() {
        let (_clock, world) = fixtures::world();
        let alice = fixtures::user_with(&world, "alice", &[("s", UnitKind::Scout, Location::in_orbit("Sol"))]);
        let scout = UnitId::from("s");

        start_travel(&world, &alice, &scout, Location::in_orbit("Vega"), Duration::from_secs(60)).unwrap();
        let err = start_travel(&world, &alice, &scout, Location::landed("Sol", "Earth"), Duration::from_secs(15))
            .unwrap_err();
        assert!(matches!(err, ShardError::InvalidState(_)));

        let unit = world.registry.unit(&alice, &scout).unwrap();
        assert_eq!(unit.destination(), Some(&Location::in_orbit("Vega")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_travel_orders_admit_exactly_one() {
        use std::sync::Arc;

        use tokio::sync::Barrier;

        for _ in 0..20 {
            let (_clock, world) = fixtures::world();
            let alice = fixtures::user_with(&world, "alice", &[("s", UnitKind::Scout, Location::in_orbit("Sol"))]);
            let scout = UnitId::from("s");
            let barrier = Arc::new(Barrier::new(2));

            let orders = [Location::in_orbit("Vega"), Location::landed("Sol", "Earth")].map(|destination| {
                let (world, alice, scout, barrier) = (world.clone(), alice.clone(), scout.clone(), barrier.clone());
                tokio::spawn(async move {
                    barrier.wait().await;
                    start_travel(&world, &alice, &scout, destination, Duration::from_secs(60)).is_ok()
                })
            });

            let mut admitted = 0;
            for order in orders {
                if order.await.unwrap() {
                    admitted += 1;
                }
            }
            assert_eq!(admitted, 1);
            assert_eq!(world.schedule.pending().0, 1);
        }
    }

    #[tokio::test]
    async fn test_reads_block_until_arrival_outside_the_almost_window() {
        let (clock, world) = fixtures::world();
        let alice = fixtures::user_with(&world, "alice", &[("s", UnitKind::Scout, Location::in_orbit("Sol"))]);
        let scout = UnitId::from("s");
        start_travel(&world, &alice, &scout, Location::in_orbit("Vega"), Duration::from_secs(60)).unwrap();
        ManualClock::settle().await;

        clock.advance(Duration::from_secs(10)).await;
        let reader = {
            let world = world.clone();
            let (alice, scout) = (alice.clone(), scout.clone());
            tokio::spawn(async move {
                wait_if_moving(&world, &scout).await;
                world.registry.unit(&alice, &scout).unwrap()
            })
        };
        ManualClock::settle().await;
        assert!(!reader.is_finished());

        clock.advance(Duration::from_secs(50)).await;
        let unit = reader.await.unwrap();
        assert_eq!(unit.location(), &Location::in_orbit("Vega"));
        assert!(!unit.is_moving());
    }

    #[tokio::test]
    async fn test_reads_within_the_almost_window_return_old_location() {
        let (clock, world) = fixtures::world();
        let alice = fixtures::user_with(&world, "alice", &[("s", UnitKind::Scout, Location::in_orbit("Sol"))]);
        let scout = UnitId::from("s");
        start_travel(&world, &alice, &scout, Location::in_orbit("Vega"), Duration::from_secs(60)).unwrap();
        ManualClock::settle().await;

        clock.advance(Duration::from_secs(59)).await;
        wait_if_moving(&world, &scout).await;
        let before = world.registry.unit(&alice, &scout).unwrap();
        assert_eq!(before.location(), &Location::in_orbit("Sol"));
        assert!(before.is_moving());

        clock.advance(Duration::from_secs(1)).await;
        wait_if_moving(&world, &scout).await;
        let after = world.registry.unit(&alice, &scout).unwrap();
        assert_eq!(after.location(), &Location::in_orbit("Vega"));
        assert!(!after.is_moving());
    }

    #[tokio::test]
    async fn test_double_arrival_is_a_no_op() {
        let (clock, world) = fixtures::world();
        let alice = fixtures::user_with(&world, "alice", &[("s", UnitKind::Scout, Location::in_orbit("Sol"))]);
        let scout = UnitId::from("s");
        start_travel(&world, &alice, &scout, Location::landed("Sol", "Earth"), Duration::from_secs(15)).unwrap();
        ManualClock::settle().await;
        clock.advance(Duration::from_secs(15)).await;

        let once = world.registry.unit(&alice, &scout).unwrap();
        assert_eq!(complete_travel(&world.registry, &scout), Outcome::Completed);
        assert_eq!(world.registry.unit(&alice, &scout).unwrap(), once);
    }

    #[tokio::test]
    async fn test_arrival_of_removed_unit_is_cancelled() {
        let (_clock, world) = fixtures::world();
        assert_eq!(complete_travel(&world.registry, &UnitId::from("ghost")), Outcome::Cancelled);
    }
}
