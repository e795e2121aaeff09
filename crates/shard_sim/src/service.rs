//! The command service.
//!
//! [`ShardService`] is what the controller layer talks to. It validates
//! identifiers, dispatches on the caller's role, and drives the travel,
//! construction and jump machinery. Reads that touch a unit or building in
//! flight go through the staleness-aware waits of [`travel`] and
//! [`construction`].
//!
//! [`travel`]: crate::travel
//! [`construction`]: crate::construction

use std::sync::Arc;

use parking_lot::Mutex;
use shard_model::{
    Building, BuildingId, Location, PlanetSpec, ResourceBag, Result, ShardError, SystemSpec, Unit,
    UnitId, UnitKind, User, UserId,
};
use shard_net::{JumpGateway, RemoteShard};
use tracing::info;

use crate::clock::Clock;
use crate::combat;
use crate::config::ShardConfig;
use crate::construction;
use crate::requests::{BuildingRequest, Caller, UnitLocation, UnitRequest, UnitUpdate, UserRequest};
use crate::timer::TimerHandle;
use crate::travel;
use crate::world::World;

/// Entry point for every command a shard accepts.
pub struct ShardService {
    name: String,
    world: World,
    gateway: JumpGateway,
    combat: Mutex<Option<TimerHandle>>,
}

impl std::fmt::Debug for ShardService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardService")
            .field("name", &self.name)
            .field("world", &self.world)
            .field("gateway", &self.gateway)
            .finish_non_exhaustive()
    }
}

impl ShardService {
    /// Build the world described by `config`. Combat is not started.
    #[must_use]
    pub fn new(config: &ShardConfig, clock: Arc<dyn Clock>, remote: Arc<dyn RemoteShard>) -> Self {
        let world = World::new(clock, &config.sector, config.timings.clone());
        info!(
            shard = %config.name,
            systems = world.sector.systems().len(),
            wormholes = config.wormholes.len(),
            "shard world created"
        );
        Self {
            name: config.name.clone(),
            world,
            gateway: JumpGateway::new(config.wormholes.clone(), remote),
            combat: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    // ── Users ───────────────────────────────────────────────────────────────

    /// Create or update a user.
    ///
    /// A player creates the user, provisioned with a scout, a builder and
    /// starting balances; an existing user is returned unchanged. An admin
    /// overwrites the balances listed in the request. A shard copies the
    /// public profile of a user whose unit is about to arrive.
    ///
    /// # Errors
    ///
    /// Returns [`ShardError::InvalidArgument`] for malformed or mismatched
    /// ids and [`ShardError::NotFound`] when an admin targets an unknown
    /// user.
    pub fn put_user(&self, caller: &Caller, id: &UserId, request: UserRequest) -> Result<User> {
        validate_user_ids(id, &request.id)?;
        match caller {
            Caller::Player => self.create_user(request),
            Caller::Admin => self.world.registry.with_user_mut(id, |user| {
                if let Some(resources) = &request.resources_quantity {
                    for (kind, quantity) in resources.iter() {
                        user.resources.set(kind, quantity);
                    }
                }
                Ok(user.clone())
            }),
            Caller::Shard(shard) => {
                let created_at = request
                    .date_of_creation
                    .unwrap_or_else(|| self.world.clock.now());
                let copy = User::new(request.id.clone(), request.pseudo.clone(), created_at);
                let (stored, inserted) = self.world.registry.insert_user_if_absent(copy);
                if inserted {
                    info!(user_id = %id, shard = %shard, "user copied from remote shard");
                    return Ok(stored);
                }
                self.world.registry.with_user_mut(id, |user| {
                    user.pseudo = request.pseudo;
                    user.created_at = created_at;
                    Ok(user.clone())
                })
            }
        }
    }

    fn create_user(&self, request: UserRequest) -> Result<User> {
        if let Ok(existing) = self.world.registry.user(&request.id) {
            return Ok(existing);
        }
        let system = self
            .world
            .sector
            .random_system(&mut rand::thread_rng())
            .ok_or_else(|| ShardError::InvalidState("the sector has no star system".to_string()))?;

        let mut user = User::new(request.id, request.pseudo, self.world.clock.now());
        user.resources = User::starting_resources();
        for kind in [UnitKind::Scout, UnitKind::Builder] {
            user.upsert_unit(Unit::new(
                UnitId::generate(),
                kind,
                Location::in_orbit(system.name.clone()),
            ));
        }

        let (stored, inserted) = self.world.registry.insert_user_if_absent(user);
        if inserted {
            info!(user_id = %stored.id, system = %system.name, "user created");
        }
        Ok(stored)
    }

    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] for an unknown user.
    pub fn get_user(&self, id: &UserId) -> Result<User> {
        self.world.registry.user(id)
    }

    // ── Units ───────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] for an unknown user.
    pub fn list_units(&self, user: &UserId) -> Result<Vec<Unit>> {
        self.world.registry.units(user)
    }

    /// Read a unit, waiting for a pending arrival unless it is imminent.
    ///
    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] for an unknown user or unit.
    pub async fn get_unit(&self, user: &UserId, unit: &UnitId) -> Result<Unit> {
        self.world.registry.unit(user, unit)?;
        travel::wait_if_moving(&self.world, unit).await;
        self.world.registry.unit(user, unit)
    }

    /// Create, move or hand off a unit, depending on the caller.
    ///
    /// An admin places a unit anywhere. A shard delivers a unit arriving
    /// through a wormhole. A player orders travel, or moves resources in and
    /// out of a cargo. When the request names a destination shard the unit
    /// then jumps, and the caller is redirected.
    ///
    /// # Errors
    ///
    /// Returns [`ShardError::InvalidArgument`] for mismatched ids or missing
    /// fields, [`ShardError::Unauthorized`] for a player update carrying no
    /// order, [`ShardError::NotFound`] for unknown entities or shards, and
    /// [`ShardError::InvalidState`] for illegal transitions.
    pub async fn put_unit(
        &self,
        caller: &Caller,
        user: &UserId,
        unit: &UnitId,
        request: UnitRequest,
    ) -> Result<UnitUpdate> {
        if &request.id != unit {
            return Err(ShardError::InvalidArgument(format!(
                "unit id '{}' in the body does not match '{unit}'",
                request.id
            )));
        }

        // A player's jump is validated before anything changes.
        if let (Caller::Player, Some(shard)) = (caller, request.destination_shard.as_deref()) {
            if request.has_destination() {
                return Err(ShardError::InvalidArgument(format!(
                    "unit '{unit}' cannot travel and jump to '{shard}' in one order"
                )));
            }
            self.check_ready_to_jump(user, unit, shard)?;
        }

        let updated = match caller {
            Caller::Admin => self.place_unit(user, &request)?,
            Caller::Shard(shard) => self.receive_unit(shard, user, &request)?,
            Caller::Player => self.order_unit(user, &request)?,
        };

        let Some(shard) = request.destination_shard.as_deref() else {
            return Ok(UnitUpdate::Unit(updated));
        };
        let owner = self.check_ready_to_jump(user, unit, shard)?;
        let jumping = owner.unit(unit)?;
        let redirect = self.gateway.jump(shard, &owner, jumping).await?;
        Ok(UnitUpdate::Redirect(redirect))
    }

    fn place_unit(&self, user: &UserId, request: &UnitRequest) -> Result<Unit> {
        let kind = required_kind(request)?;
        let location = match (request.system.as_deref(), request.planet.as_deref()) {
            (None, None) => {
                return Err(ShardError::InvalidArgument(
                    "a placed unit needs a system or a planet".to_string(),
                ));
            }
            (system, planet) => self.resolve_location(None, system, planet)?,
        };
        let mut unit = Unit::new(request.id.clone(), kind, location);
        if let Some(health) = request.health {
            unit.health = health;
        }
        if let Some(resources) = &request.resources_quantity {
            unit.resources = resources.clone();
        }

        self.abandon_constructions(&unit.id);
        self.world.schedule.cancel_travel(&unit.id);
        self.world.registry.add_unit(user, unit.clone())?;
        info!(user_id = %user, unit_id = %unit.id, kind = %kind, "unit placed by admin");
        Ok(unit)
    }

    fn receive_unit(&self, shard: &str, user: &UserId, request: &UnitRequest) -> Result<Unit> {
        let endpoint = self.gateway.endpoint(shard)?;
        let system = self.world.sector.system(&endpoint.system)?;
        let kind = required_kind(request)?;

        let mut unit = Unit::new(request.id.clone(), kind, Location::in_orbit(system.name.clone()));
        unit.health = request.health.unwrap_or_else(|| kind.max_health());
        unit.resources = request.resources_quantity.clone().unwrap_or_default();

        self.abandon_constructions(&unit.id);
        self.world.schedule.cancel_travel(&unit.id);
        self.world.registry.add_unit(user, unit.clone())?;
        info!(user_id = %user, unit_id = %unit.id, shard, system = %system.name, "unit arrived through wormhole");
        Ok(unit)
    }

    /// Cancel the unfinished buildings of an existing unit about to be
    /// replaced.
    fn abandon_constructions(&self, unit: &UnitId) {
        let Ok(owner) = self.world.registry.owner_of_unit(unit) else {
            return;
        };
        let abandoned = self.world.registry.with_user_mut(&owner, |user| {
            let buildings = user.constructions_of(unit);
            for building in &buildings {
                user.cancel_construction(building)?;
            }
            Ok(buildings)
        });
        for building in abandoned.unwrap_or_default() {
            self.world.schedule.cancel_construction(&building);
            info!(user_id = %owner, unit_id = %unit, building_id = %building, "builder replaced, construction cancelled");
        }
    }

    fn order_unit(&self, user: &UserId, request: &UnitRequest) -> Result<Unit> {
        let current = self.world.registry.unit(user, &request.id)?;
        let is_cargo = current.kind == UnitKind::Cargo;

        if !request.has_destination() && request.destination_shard.is_none() && !is_cargo {
            return Err(ShardError::Unauthorized(format!(
                "only an admin may relocate unit '{}' without a travel order",
                request.id
            )));
        }
        if !is_cargo
            && request
                .resources_quantity
                .as_ref()
                .is_some_and(|r| !r.is_empty())
        {
            return Err(ShardError::InvalidArgument(format!(
                "a {} cannot carry resources",
                current.kind
            )));
        }

        if request.has_destination() {
            let destination = self.resolve_location(
                Some(current.location()),
                request.destination_system.as_deref(),
                request.destination_planet.as_deref(),
            )?;
            let duration =
                travel::compute_travel_time(current.location(), &destination, &self.world.timings);
            if travel::is_leaving_planet(current.location(), &destination) || !duration.is_zero() {
                travel::start_travel(&self.world, user, &request.id, destination, duration)?;
            }
        }

        if is_cargo && let Some(resources) = &request.resources_quantity {
            self.transfer_resources(user, &request.id, resources)?;
        }

        self.world.registry.unit(user, &request.id)
    }

    /// Resolve a system/planet pair against the sector.
    ///
    /// A planet without a system is looked up in `current`'s system first,
    /// then anywhere in the sector. Neither given means staying in
    /// `current`'s system.
    fn resolve_location(
        &self,
        current: Option<&Location>,
        system: Option<&str>,
        planet: Option<&str>,
    ) -> Result<Location> {
        let sector = &self.world.sector;
        match (system, planet) {
            (Some(system), Some(planet)) => {
                sector.planet(system, planet)?;
                Ok(Location::landed(system, planet))
            }
            (Some(system), None) => Ok(Location::in_orbit(sector.system(system)?.name.clone())),
            (None, Some(planet)) => {
                let home = current.and_then(|c| {
                    sector
                        .planet(&c.system, planet)
                        .ok()
                        .map(|_| c.system.clone())
                });
                let system = match home {
                    Some(system) => system,
                    None => sector.system_of_planet(planet)?.name.clone(),
                };
                Ok(Location::landed(system, planet))
            }
            (None, None) => current
                .map(|c| Location::in_orbit(c.system.clone()))
                .ok_or_else(|| ShardError::InvalidArgument("no system given".to_string())),
        }
    }

    /// Set a cargo's load to `desired`, moving the difference between the
    /// cargo and its owner. Kinds absent from `desired` are left alone.
    fn transfer_resources(&self, user: &UserId, cargo: &UnitId, desired: &ResourceBag) -> Result<()> {
        self.world.registry.with_user_mut(user, |owner| {
            let unit = owner.unit(cargo)?;
            let changes: Vec<_> = desired
                .iter()
                .map(|(kind, wanted)| (kind, unit.resources.get(kind), wanted))
                .filter(|(_, held, wanted)| held != wanted)
                .collect();
            if changes.is_empty() {
                return Ok(());
            }
            if !owner.has_built_star_port_at(unit.location()) {
                return Err(ShardError::InvalidState(format!(
                    "cargo '{cargo}' is not at one of its owner's star ports"
                )));
            }
            let loading: ResourceBag = changes
                .iter()
                .filter(|(_, held, wanted)| wanted > held)
                .map(|&(kind, held, wanted)| (kind, wanted - held))
                .collect();
            owner.resources.debit_all(&loading)?;
            for &(kind, held, wanted) in &changes {
                if held > wanted {
                    owner.resources.credit(kind, held - wanted);
                }
            }
            let unit = owner.unit_mut(cargo)?;
            for (kind, _, wanted) in changes {
                unit.resources.set(kind, wanted);
            }
            Ok(())
        })?;
        info!(user_id = %user, unit_id = %cargo, "cargo load updated");
        Ok(())
    }

    /// Check that `unit` may jump to `shard` and return its owner.
    fn check_ready_to_jump(&self, user: &UserId, unit: &UnitId, shard: &str) -> Result<User> {
        let endpoint = self.gateway.endpoint(shard)?;
        self.world.sector.system(&endpoint.system)?;
        let owner = self.world.registry.user(user)?;
        let jumping = owner.unit(unit)?;
        if jumping.is_moving() {
            return Err(ShardError::InvalidState(format!(
                "unit '{unit}' cannot jump while moving"
            )));
        }
        if jumping.location().system != endpoint.system {
            return Err(ShardError::InvalidState(format!(
                "unit '{unit}' is not in system '{}', where the wormhole to '{shard}' opens",
                endpoint.system
            )));
        }
        Ok(owner)
    }

    /// Where a unit stands. Scouts on a planet also report its resources.
    ///
    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] for an unknown user or unit.
    pub async fn unit_location(&self, user: &UserId, unit: &UnitId) -> Result<UnitLocation> {
        let unit = self.get_unit(user, unit).await?;
        let location = unit.location();
        let resources_quantity = match (&location.planet, unit.kind) {
            (Some(planet), UnitKind::Scout) => {
                Some(self.world.sector.planet(&location.system, planet)?.resources())
            }
            _ => None,
        };
        Ok(UnitLocation {
            system: location.system.clone(),
            planet: location.planet.clone(),
            resources_quantity,
        })
    }

    // ── Buildings ───────────────────────────────────────────────────────────

    /// Start constructing a building with one of the user's builders.
    ///
    /// # Errors
    ///
    /// See [`construction::start_construction`]; a mine without a resource
    /// category is an [`ShardError::InvalidArgument`].
    pub fn create_building(&self, user: &UserId, request: &BuildingRequest) -> Result<Building> {
        let kind = request.kind()?;
        construction::start_construction(
            &self.world,
            user,
            &request.builder_id,
            kind,
            self.world.timings.construction(),
        )
    }

    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] for an unknown user.
    pub fn list_buildings(&self, user: &UserId) -> Result<Vec<Building>> {
        self.world.registry.buildings(user)
    }

    /// Read a building, waiting for its construction unless it is imminent.
    ///
    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] for an unknown user or building, or
    /// if the construction is cancelled while waiting.
    pub async fn get_building(&self, user: &UserId, building: &BuildingId) -> Result<Building> {
        self.world.registry.building(user, building)?;
        construction::wait_if_in_construction(&self.world, user, building).await?;
        self.world.registry.building(user, building)
    }

    /// # Errors
    ///
    /// See [`construction::cancel_construction`].
    pub fn cancel_construction(&self, user: &UserId, building: &BuildingId) -> Result<Building> {
        construction::cancel_construction(&self.world, user, building)
    }

    /// Build a unit of `kind` at a finished star port, paying its cost.
    ///
    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] for an unknown user or building,
    /// [`ShardError::InvalidArgument`] if the building is not a star port,
    /// [`ShardError::InvalidState`] if it is unfinished, and
    /// [`ShardError::InsufficientResources`] if the user cannot pay, in
    /// which case nothing is debited.
    pub fn build_unit(&self, user: &UserId, star_port: &BuildingId, kind: UnitKind) -> Result<Unit> {
        let unit = self.world.registry.with_user_mut(user, |owner| {
            let port = owner.building(star_port)?;
            if !port.is_star_port() {
                return Err(ShardError::InvalidArgument(format!(
                    "building '{star_port}' is not a star port"
                )));
            }
            if !port.is_built() {
                return Err(ShardError::InvalidState(format!(
                    "star port '{star_port}' is not built yet"
                )));
            }
            let location = Location::landed(port.system.clone(), port.planet.clone());
            owner.resources.debit_all(&kind.cost())?;
            let unit = Unit::new(UnitId::generate(), kind, location);
            owner.upsert_unit(unit.clone());
            Ok(unit)
        })?;
        info!(user_id = %user, unit_id = %unit.id, kind = %kind, "unit built");
        Ok(unit)
    }

    // ── Sector ──────────────────────────────────────────────────────────────

    #[must_use]
    pub fn systems(&self) -> Vec<SystemSpec> {
        self.world.sector.systems().iter().map(|s| s.view()).collect()
    }

    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] for an unknown system.
    pub fn system(&self, name: &str) -> Result<SystemSpec> {
        Ok(self.world.sector.system(name)?.view())
    }

    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] for an unknown system.
    pub fn planets(&self, system: &str) -> Result<Vec<PlanetSpec>> {
        Ok(self.system(system)?.planets)
    }

    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] for an unknown system or planet.
    pub fn planet(&self, system: &str, planet: &str) -> Result<PlanetSpec> {
        Ok(self.world.sector.planet(system, planet)?.view())
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    /// Start the combat timer. Returns `false` if it was already running or
    /// no weapon exists.
    pub fn start_combat(&self) -> bool {
        let mut combat = self.combat.lock();
        if combat.is_some() {
            return false;
        }
        *combat = combat::start_combat(&self.world);
        combat.is_some()
    }

    /// Stop combat and every scheduled completion and extraction.
    pub fn shutdown(&self) {
        self.combat.lock().take();
        self.world.schedule.clear();
        info!(shard = %self.name, "shard stopped");
    }
}

fn validate_user_ids(path: &UserId, body: &UserId) -> Result<()> {
    for id in [path, body] {
        if !id.is_well_formed() {
            return Err(ShardError::InvalidArgument(format!(
                "user id '{id}' may only contain letters, digits and dashes"
            )));
        }
    }
    if path != body {
        return Err(ShardError::InvalidArgument(format!(
            "user id '{body}' in the body does not match '{path}'"
        )));
    }
    Ok(())
}

fn required_kind(request: &UnitRequest) -> Result<UnitKind> {
    request
        .kind
        .ok_or_else(|| ShardError::InvalidArgument(format!("unit '{}' has no type", request.id)))
}
