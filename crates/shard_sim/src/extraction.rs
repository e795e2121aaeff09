//! Resource extraction by mines.

use shard_model::{Building, ResourceCategory, UserId};
use tracing::{debug, info};

use crate::timer::{Tick, spawn_repeating};
use crate::world::World;

/// Start the extraction timer of a finished mine.
///
/// Every period one resource of `category` moves from the mine's planet to
/// `owner`. The timer stops for good once the category is exhausted; the
/// mine stays built.
pub fn start_extraction(world: &World, owner: &UserId, mine: &Building, category: ResourceCategory) {
    let period = world.timings.extraction_period();
    let sector = world.sector.clone();
    let registry = world.registry.clone();
    let (owner, mine_id) = (owner.clone(), mine.id.clone());
    let (system, planet_name) = (mine.system.clone(), mine.planet.clone());

    let timer = spawn_repeating(
        world.clock.clone(),
        format!("extraction:{mine_id}"),
        period,
        period,
        {
            let mine_id = mine_id.clone();
            move |_| {
                let planet = sector.planet(&system, &planet_name)?;
                let Some(kind) = planet.extract(category) else {
                    info!(building_id = %mine_id, planet = %planet.name, ?category, "planet exhausted, mine stopped");
                    return Ok(Tick::Stop);
                };
                registry.with_user_mut(&owner, |user| {
                    user.resources.credit(kind, 1);
                    Ok(())
                })?;
                debug!(building_id = %mine_id, user_id = %owner, resource = %kind, "extracted");
                Ok(Tick::Continue)
            }
        },
    );
    world.schedule.track_extraction(mine_id, timer);
}
