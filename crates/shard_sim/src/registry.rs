//! The entity registry.
//!
//! Owns every user aggregate, keyed by user id, plus reverse indexes from
//! unit and building ids to their owner. A user aggregate is the unit of
//! exclusive access: [`Registry::with_user_mut`] runs a closure while
//! holding that user's entry, so check-then-set transitions on any of its
//! units or buildings cannot interleave.
//!
//! No method holds more than one map entry at a time.

use std::collections::BTreeSet;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use shard_model::{Building, BuildingId, Result, ShardError, Unit, UnitId, User, UserId};

/// Registry of all users and the entities they own.
#[derive(Debug, Default)]
pub struct Registry {
    users: DashMap<UserId, User>,
    unit_owners: DashMap<UnitId, UserId>,
    building_owners: DashMap<BuildingId, UserId>,
}

struct OwnedIds {
    units: BTreeSet<UnitId>,
    buildings: BTreeSet<BuildingId>,
}

impl OwnedIds {
    fn empty() -> Self {
        Self {
            units: BTreeSet::new(),
            buildings: BTreeSet::new(),
        }
    }

    fn of(user: &User) -> Self {
        Self {
            units: user.units.iter().map(|u| u.id.clone()).collect(),
            buildings: user.buildings.iter().map(|b| b.id.clone()).collect(),
        }
    }
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Users ───────────────────────────────────────────────────────────────

    /// Insert `user` unless a user with the same id exists.
    ///
    /// Returns the stored user and whether it was inserted.
    pub fn insert_user_if_absent(&self, user: User) -> (User, bool) {
        let id = user.id.clone();
        let (stored, inserted) = match self.users.entry(id.clone()) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => (entry.insert(user).value().clone(), true),
        };
        if inserted {
            self.reindex(&id, &OwnedIds::empty(), &OwnedIds::of(&stored));
        }
        (stored, inserted)
    }

    #[must_use]
    pub fn contains_user(&self, id: &UserId) -> bool {
        self.users.contains_key(id)
    }

    /// A snapshot of one user.
    ///
    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] for an unknown user.
    pub fn user(&self, id: &UserId) -> Result<User> {
        self.with_user(id, User::clone)
    }

    /// A snapshot of every user, ordered by id.
    #[must_use]
    pub fn users(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.iter().map(|entry| entry.value().clone()).collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        users
    }

    /// Every user id, ordered.
    #[must_use]
    pub fn user_ids(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self.users.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Read one user under its shared lock.
    ///
    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] for an unknown user.
    pub fn with_user<R>(&self, id: &UserId, f: impl FnOnce(&User) -> R) -> Result<R> {
        let user = self
            .users
            .get(id)
            .ok_or_else(|| ShardError::not_found("user", id))?;
        Ok(f(user.value()))
    }

    /// Mutate one user under its exclusive lock.
    ///
    /// Changes made before the closure returns an error are kept, so the
    /// closure must validate before it mutates. Unit and building indexes
    /// are brought up to date afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] for an unknown user, or the
    /// closure's error.
    pub fn with_user_mut<R>(
        &self,
        id: &UserId,
        f: impl FnOnce(&mut User) -> Result<R>,
    ) -> Result<R> {
        let (result, before, after) = {
            let mut user = self
                .users
                .get_mut(id)
                .ok_or_else(|| ShardError::not_found("user", id))?;
            let before = OwnedIds::of(&user);
            let result = f(user.value_mut());
            let after = OwnedIds::of(&user);
            (result, before, after)
        };
        self.reindex(id, &before, &after);
        result
    }

    fn reindex(&self, owner: &UserId, before: &OwnedIds, after: &OwnedIds) {
        for gone in before.units.difference(&after.units) {
            self.unit_owners.remove_if(gone, |_, o| o == owner);
        }
        for added in after.units.difference(&before.units) {
            self.unit_owners.insert(added.clone(), owner.clone());
        }
        for gone in before.buildings.difference(&after.buildings) {
            self.building_owners.remove_if(gone, |_, o| o == owner);
        }
        for added in after.buildings.difference(&before.buildings) {
            self.building_owners.insert(added.clone(), owner.clone());
        }
    }

    // ── Ownership lookups ───────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] if no user owns the unit.
    pub fn owner_of_unit(&self, unit: &UnitId) -> Result<UserId> {
        self.unit_owners
            .get(unit)
            .map(|owner| owner.value().clone())
            .ok_or_else(|| ShardError::not_found("unit", unit))
    }

    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] if no user owns the building.
    pub fn owner_of_building(&self, building: &BuildingId) -> Result<UserId> {
        self.building_owners
            .get(building)
            .map(|owner| owner.value().clone())
            .ok_or_else(|| ShardError::not_found("building", building))
    }

    // ── Units ───────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] for an unknown user.
    pub fn units(&self, user: &UserId) -> Result<Vec<Unit>> {
        self.with_user(user, |u| u.units.clone())
    }

    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] for an unknown user or unit.
    pub fn unit(&self, user: &UserId, unit: &UnitId) -> Result<Unit> {
        self.with_user(user, |u| u.unit(unit).cloned())?
    }

    /// Add `unit` to `user`, replacing a unit with the same id.
    ///
    /// A unit id belongs to at most one user; a unit re-added under a new
    /// owner is taken away from the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] for an unknown user.
    pub fn add_unit(&self, user: &UserId, unit: Unit) -> Result<()> {
        if let Ok(previous) = self.owner_of_unit(&unit.id)
            && &previous != user
        {
            self.with_user_mut(&previous, |u| Ok(u.remove_unit(&unit.id)))?;
        }
        self.with_user_mut(user, |u| {
            u.upsert_unit(unit);
            Ok(())
        })
    }

    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] for an unknown user or unit.
    pub fn remove_unit(&self, user: &UserId, unit: &UnitId) -> Result<Unit> {
        self.with_user_mut(user, |u| {
            u.remove_unit(unit)
                .ok_or_else(|| ShardError::not_found("unit", unit))
        })
    }

    // ── Buildings ───────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] for an unknown user.
    pub fn buildings(&self, user: &UserId) -> Result<Vec<Building>> {
        self.with_user(user, |u| u.buildings.clone())
    }

    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] for an unknown user or building.
    pub fn building(&self, user: &UserId, building: &BuildingId) -> Result<Building> {
        self.with_user(user, |u| u.building(building).cloned())?
    }

    /// # Errors
    ///
    /// Returns [`ShardError::NotFound`] for an unknown user.
    pub fn add_building(&self, user: &UserId, building: Building) -> Result<()> {
        self.with_user_mut(user, |u| {
            u.add_building(building);
            Ok(())
        })
    }
}
