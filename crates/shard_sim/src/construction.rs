//! Building construction.
//!
//! A building starts InConstruction on the planet where its builder stands
//! and becomes Built when its scheduled completion fires. Cancelling (by
//! request, or because the builder moved away) deletes the partial building
//! and resolves its completion as cancelled, which is what a pending
//! [`wait_if_in_construction`] observes.

use std::time::Duration;

use shard_model::{
    Building, BuildingId, BuildingKind, Result, ShardError, UnitId, UnitKind, UserId,
};
use tracing::{debug, info};

use crate::clock::after;
use crate::extraction;
use crate::schedule::Outcome;
use crate::world::World;

/// Start building `kind` with `builder`, finishing `duration` from now.
///
/// # Errors
///
/// Returns [`ShardError::NotFound`] for an unknown user or builder,
/// [`ShardError::InvalidArgument`] if the unit is not a builder, and
/// [`ShardError::InvalidState`] if it is moving or not on a planet.
pub fn start_construction(
    world: &World,
    owner: &UserId,
    builder: &UnitId,
    kind: BuildingKind,
    duration: Duration,
) -> Result<Building> {
    let completes_at = after(world.clock.now(), duration);
    let building = world.registry.with_user_mut(owner, |user| {
        let unit = user.unit(builder)?;
        if unit.kind != UnitKind::Builder {
            return Err(ShardError::InvalidArgument(format!(
                "unit '{builder}' is a {} and cannot construct buildings",
                unit.kind
            )));
        }
        if unit.is_moving() {
            return Err(ShardError::InvalidState(format!(
                "builder '{builder}' is moving"
            )));
        }
        let Some(planet) = unit.location().planet.clone() else {
            return Err(ShardError::InvalidState(format!(
                "builder '{builder}' is not on a planet"
            )));
        };
        let building = Building::in_construction(
            BuildingId::generate(),
            kind,
            unit.location().system.clone(),
            planet,
            builder.clone(),
            completes_at,
        );
        user.unit_mut(builder)?.attach_building(building.id.clone())?;
        user.add_building(building.clone());
        Ok(building)
    })?;

    let finishing = world.clone();
    let id = building.id.clone();
    world.schedule.schedule_construction(
        world.clock.clone(),
        building.id.clone(),
        completes_at,
        duration,
        move || complete_construction(&finishing, &id),
    );

    info!(
        user_id = %owner,
        building_id = %building.id,
        builder_id = %builder,
        system = %building.system,
        planet = %building.planet,
        eta = %completes_at,
        "construction started"
    );
    Ok(building)
}

/// Completion handler: mark the building built and release its builder.
/// A finished mine starts extracting.
///
/// Already-built buildings are left untouched. A building that no longer
/// exists resolves the construction as cancelled.
pub fn complete_construction(world: &World, building: &BuildingId) -> Outcome {
    let completed = world.registry.owner_of_building(building).and_then(|owner| {
        world
            .registry
            .with_user_mut(&owner, |user| {
                let target = user.building_mut(building)?;
                if !target.complete() {
                    return Ok(None);
                }
                let built = target.clone();
                for unit in &mut user.units {
                    unit.detach_building(building);
                }
                Ok(Some(built))
            })
            .map(|built| built.map(|b| (owner, b)))
    });

    match completed {
        Ok(Some((owner, built))) => {
            info!(user_id = %owner, building_id = %building, "construction completed");
            if let Some(category) = built.resource_category() {
                extraction::start_extraction(world, &owner, &built, category);
            }
            Outcome::Completed
        }
        Ok(None) => Outcome::Completed,
        Err(err) => {
            debug!(building_id = %building, error = %err, "completion of a vanished building");
            Outcome::Cancelled
        }
    }
}

/// Cancel an unfinished building, deleting it.
///
/// # Errors
///
/// Returns [`ShardError::NotFound`] for an unknown user or building and
/// [`ShardError::InvalidState`] if the building is already built.
pub fn cancel_construction(world: &World, owner: &UserId, building: &BuildingId) -> Result<Building> {
    let cancelled = world
        .registry
        .with_user_mut(owner, |user| user.cancel_construction(building))?;
    world.schedule.cancel_construction(building);
    info!(user_id = %owner, building_id = %building, "construction cancelled");
    Ok(cancelled)
}

/// Suspend until `building` is built, unless it is within the last two
/// seconds of construction.
///
/// # Errors
///
/// Returns [`ShardError::NotFound`] if the construction is cancelled while
/// waiting, typically because the builder moved away.
pub async fn wait_if_in_construction(world: &World, owner: &UserId, building: &BuildingId) -> Result<()> {
    let Some(completion) = world.schedule.construction(building) else {
        return Ok(());
    };
    if completion.is_almost_done() {
        return Ok(());
    }
    let has_builder = world
        .registry
        .with_user(owner, |user| user.responsible_builder(building).is_some())?;
    if !has_builder {
        return Ok(());
    }
    match completion.wait().await {
        Outcome::Cancelled => Err(ShardError::NotFound(format!(
            "construction of building '{building}' was cancelled"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use shard_model::{Location, ResourceCategory};

    use super::*;
    use crate::clock::ManualClock;
    use crate::travel::start_travel;
    use crate::world::fixtures;

    const FIVE_MINUTES: Duration = Duration::from_secs(300);

    fn setup() -> (ManualClock, World, UserId, UnitId) {
        let (clock, world) = fixtures::world();
        let alice = fixtures::user_with(
            &world,
            "alice",
            &[
                ("b", UnitKind::Builder, Location::landed("Sol", "Earth")),
                ("s", UnitKind::Scout, Location::landed("Sol", "Earth")),
            ],
        );
        (clock, world, alice, UnitId::from("b"))
    }

    #[tokio::test]
    async fn test_construction_completes_after_duration() {
        let (clock, world, alice, builder) = setup();
        let port = start_construction(&world, &alice, &builder, BuildingKind::StarPort, FIVE_MINUTES).unwrap();
        ManualClock::settle().await;
        assert_eq!(port.planet, "Earth");
        assert_eq!(
            world.registry.unit(&alice, &builder).unwrap().buildings(),
            &[port.id.clone()]
        );

        clock.advance(FIVE_MINUTES).await;
        let built = world.registry.building(&alice, &port.id).unwrap();
        assert!(built.is_built());
        assert_eq!(built.estimated_completion(), None);
        assert!(world.registry.unit(&alice, &builder).unwrap().buildings().is_empty());
    }

    #[tokio::test]
    async fn test_only_idle_landed_builders_construct() {
        let (_clock, world, alice, builder) = setup();
        let err = start_construction(&world, &alice, &UnitId::from("s"), BuildingKind::StarPort, FIVE_MINUTES)
            .unwrap_err();
        assert!(matches!(err, ShardError::InvalidArgument(_)));

        start_travel(&world, &alice, &builder, Location::in_orbit("Sol"), Duration::ZERO).unwrap();
        ManualClock::settle().await;
        let err = start_construction(&world, &alice, &builder, BuildingKind::StarPort, FIVE_MINUTES).unwrap_err();
        assert!(matches!(err, ShardError::InvalidState(_)));
        assert!(world.registry.buildings(&alice).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_built_building_is_invalid_state() {
        let (clock, world, alice, builder) = setup();
        let port = start_construction(&world, &alice, &builder, BuildingKind::StarPort, FIVE_MINUTES).unwrap();
        ManualClock::settle().await;
        clock.advance(FIVE_MINUTES).await;

        let err = cancel_construction(&world, &alice, &port.id).unwrap_err();
        assert!(matches!(err, ShardError::InvalidState(_)));
        assert!(world.registry.building(&alice, &port.id).is_ok());
    }

    #[tokio::test]
    async fn test_cancel_then_completion_is_a_no_op() {
        let (clock, world, alice, builder) = setup();
        let port = start_construction(&world, &alice, &builder, BuildingKind::StarPort, FIVE_MINUTES).unwrap();
        ManualClock::settle().await;

        cancel_construction(&world, &alice, &port.id).unwrap();
        assert_eq!(complete_construction(&world, &port.id), Outcome::Cancelled);
        clock.advance(FIVE_MINUTES).await;
        assert!(world.registry.buildings(&alice).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_double_completion_is_a_no_op() {
        let (clock, world, alice, builder) = setup();
        let port = start_construction(&world, &alice, &builder, BuildingKind::StarPort, FIVE_MINUTES).unwrap();
        ManualClock::settle().await;
        clock.advance(FIVE_MINUTES).await;

        let once = world.registry.user(&alice).unwrap();
        assert_eq!(complete_construction(&world, &port.id), Outcome::Completed);
        assert_eq!(world.registry.user(&alice).unwrap(), once);
    }

    #[tokio::test]
    async fn test_builder_departure_cancels_construction_and_fails_waiters() {
        let (clock, world, alice, builder) = setup();
        let mine = start_construction(
            &world,
            &alice,
            &builder,
            BuildingKind::Mine {
                category: ResourceCategory::Solid,
            },
            FIVE_MINUTES,
        )
        .unwrap();
        let waiter = {
            let (world, alice, id) = (world.clone(), alice.clone(), mine.id.clone());
            tokio::spawn(async move { wait_if_in_construction(&world, &alice, &id).await })
        };
        ManualClock::settle().await;
        clock.advance(Duration::from_secs(60)).await;
        assert!(!waiter.is_finished());

        start_travel(&world, &alice, &builder, Location::landed("Sol", "Mars"), Duration::from_secs(15)).unwrap();
        ManualClock::settle().await;

        let err = waiter.await.unwrap().unwrap_err();
        assert!(matches!(err, ShardError::NotFound(_)));
        assert!(world.registry.buildings(&alice).unwrap().is_empty());
        assert!(world.registry.unit(&alice, &builder).unwrap().buildings().is_empty());
        assert!(world.schedule.construction(&mine.id).is_none());
    }

    #[tokio::test]
    async fn test_wait_returns_at_once_in_the_almost_window() {
        let (clock, world, alice, builder) = setup();
        let port = start_construction(&world, &alice, &builder, BuildingKind::StarPort, FIVE_MINUTES).unwrap();
        ManualClock::settle().await;
        clock.advance(Duration::from_secs(299)).await;

        wait_if_in_construction(&world, &alice, &port.id).await.unwrap();
        assert!(!world.registry.building(&alice, &port.id).unwrap().is_built());
    }
}
