//! Combat between units of different users.
//!
//! One timer drives all combat. It ticks at the shortest fire rate of any
//! known weapon; on each tick every weapon whose fire rate divides the
//! current second of the day fires once. Damage is applied attacker by
//! attacker in a fixed order (users by id, then each user's units in
//! order), and destroyed units are swept only after every shot of the tick
//! has been resolved.

use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use shard_model::{BuildingId, Unit, UnitId, UnitKind, UserId, Weapon};
use tracing::{debug, info};

use crate::timer::{Tick, TimerHandle, spawn_repeating};
use crate::world::World;

/// What happened during one combat tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombatReport {
    /// Shots that hit a target.
    pub shots: usize,
    /// Units removed by the sweep.
    pub destroyed: Vec<UnitId>,
}

/// Start the combat timer, or `None` if no weapon can ever fire.
#[must_use]
pub fn start_combat(world: &World) -> Option<TimerHandle> {
    let period = Weapon::min_fire_rate(&Weapon::KNOWN)?;
    let ticking = world.clone();
    let initial_delay = delay_to_boundary(world.clock.now(), period);
    info!(
        period_secs = period.as_secs(),
        first_tick_in = ?initial_delay,
        "combat started"
    );
    Some(spawn_repeating(
        world.clock.clone(),
        "combat",
        initial_delay,
        period,
        move |at| {
            let report = resolve_tick(&ticking, second_of_day(at));
            if report.shots > 0 {
                debug!(
                    shots = report.shots,
                    destroyed = report.destroyed.len(),
                    "combat tick"
                );
            }
            Ok(Tick::Continue)
        },
    ))
}

/// Time from `now` until the next instant whose second of the day is a
/// whole multiple of `period`. Zero when `now` is already on one.
#[must_use]
pub fn delay_to_boundary(now: DateTime<Utc>, period: Duration) -> Duration {
    let period_secs = period.as_secs().max(1);
    let into = Duration::new(
        u64::from(second_of_day(now)) % period_secs,
        now.nanosecond() % 1_000_000_000,
    );
    if into.is_zero() {
        Duration::ZERO
    } else {
        Duration::from_secs(period_secs).saturating_sub(into)
    }
}

/// Seconds elapsed since midnight UTC.
#[must_use]
pub fn second_of_day(at: DateTime<Utc>) -> u32 {
    at.num_seconds_from_midnight()
}

/// Pick the target of `attacker` among `candidates`.
///
/// Only other users' units in range qualify. The attacker's priority list
/// is walked in order and the first candidate of the first type present
/// wins.
#[must_use]
pub fn choose_target<'a>(
    owner: &UserId,
    attacker: &Unit,
    candidates: &'a [(UserId, Unit)],
) -> Option<&'a (UserId, Unit)> {
    attacker.kind.target_priority().iter().find_map(|wanted| {
        candidates.iter().find(|(enemy, unit)| {
            enemy != owner
                && unit.kind == *wanted
                && attacker.location().in_range_of(unit.location())
        })
    })
}

/// Resolve one combat tick at `second` of the day.
pub fn resolve_tick(world: &World, second: u32) -> CombatReport {
    let snapshot: Vec<(UserId, Unit)> = world
        .registry
        .users()
        .into_iter()
        .flat_map(|user| {
            let owner = user.id;
            user.units.into_iter().map(move |unit| (owner.clone(), unit))
        })
        .collect();

    let mut shots = 0;
    for (owner, attacker) in snapshot.iter().filter(|(_, u)| u.kind.is_combat()) {
        for weapon in attacker.weapons() {
            if !weapon.fires_at(second) {
                continue;
            }
            let Some((target_owner, target)) = choose_target(owner, attacker, &snapshot) else {
                continue;
            };
            let hit = world.registry.with_user_mut(target_owner, |user| {
                let victim = user.unit_mut(&target.id)?;
                victim.take_damage(weapon.damage, attacker.kind);
                Ok(victim.health)
            });
            match hit {
                Ok(health) => {
                    shots += 1;
                    debug!(
                        attacker_id = %attacker.id,
                        target_id = %target.id,
                        damage = weapon.damage,
                        health,
                        "hit"
                    );
                }
                Err(err) => debug!(target_id = %target.id, error = %err, "target vanished"),
            }
        }
    }

    CombatReport {
        shots,
        destroyed: sweep(world),
    }
}

/// Remove every unit with no health left. A destroyed builder's unfinished
/// buildings are cancelled with it.
fn sweep(world: &World) -> Vec<UnitId> {
    let mut destroyed = Vec::new();
    for user in world.registry.user_ids() {
        let swept = world.registry.with_user_mut(&user, |aggregate| {
            let (dead, alive): (Vec<Unit>, Vec<Unit>) = std::mem::take(&mut aggregate.units)
                .into_iter()
                .partition(Unit::is_destroyed);
            aggregate.units = alive;
            let mut abandoned: Vec<BuildingId> = Vec::new();
            for unit in dead.iter().filter(|u| u.kind == UnitKind::Builder) {
                for building in unit.buildings() {
                    if aggregate.cancel_construction(building).is_ok() {
                        abandoned.push(building.clone());
                    }
                }
            }
            Ok((dead, abandoned))
        });
        let Ok((dead, abandoned)) = swept else {
            continue;
        };
        for building in &abandoned {
            world.schedule.cancel_construction(building);
        }
        for unit in dead {
            world.schedule.cancel_travel(&unit.id);
            info!(user_id = %user, unit_id = %unit.id, kind = %unit.kind, "unit destroyed");
            destroyed.push(unit.id);
        }
    }
    destroyed
}
