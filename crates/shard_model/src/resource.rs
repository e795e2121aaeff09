//! Resources, resource categories and inventories.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShardError};

/// A kind of resource found on planets and held by users and cargos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Carbon,
    Iron,
    Gold,
    Aluminium,
    Titanium,
    Water,
    Oxygen,
}

impl ResourceKind {
    /// Every resource kind.
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Carbon,
        ResourceKind::Iron,
        ResourceKind::Gold,
        ResourceKind::Aluminium,
        ResourceKind::Titanium,
        ResourceKind::Water,
        ResourceKind::Oxygen,
    ];

    /// The category a mine must be configured with to extract this kind.
    #[must_use]
    pub const fn category(self) -> ResourceCategory {
        match self {
            ResourceKind::Water => ResourceCategory::Liquid,
            ResourceKind::Oxygen => ResourceCategory::Gaseous,
            _ => ResourceCategory::Solid,
        }
    }

    /// Lowercase wire name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ResourceKind::Carbon => "carbon",
            ResourceKind::Iron => "iron",
            ResourceKind::Gold => "gold",
            ResourceKind::Aluminium => "aluminium",
            ResourceKind::Titanium => "titanium",
            ResourceKind::Water => "water",
            ResourceKind::Oxygen => "oxygen",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Solid kinds ordered from most to least prioritised. Ties on availability
/// are broken toward the earliest entry.
pub const SOLID_PRIORITY: [ResourceKind; 5] = [
    ResourceKind::Titanium,
    ResourceKind::Gold,
    ResourceKind::Aluminium,
    ResourceKind::Iron,
    ResourceKind::Carbon,
];

/// The family of resources a mine extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceCategory {
    Solid,
    Liquid,
    Gaseous,
}

impl ResourceCategory {
    /// Choose the kind to extract next from `available`, or `None` when the
    /// category is exhausted.
    ///
    /// Liquid always yields water and gaseous always yields oxygen. Solid
    /// picks the most abundant solid kind; among kinds tied at that maximum
    /// the one earliest in [`SOLID_PRIORITY`] wins.
    #[must_use]
    pub fn select(self, available: &ResourceBag) -> Option<ResourceKind> {
        match self {
            ResourceCategory::Liquid => Some(ResourceKind::Water).filter(|k| available.get(*k) > 0),
            ResourceCategory::Gaseous => {
                Some(ResourceKind::Oxygen).filter(|k| available.get(*k) > 0)
            }
            ResourceCategory::Solid => {
                let mut best: Option<(ResourceKind, u32)> = None;
                for kind in SOLID_PRIORITY {
                    let count = available.get(kind);
                    if count == 0 {
                        continue;
                    }
                    // Strictly greater: an equal count later in the list loses.
                    if best.is_none_or(|(_, max)| count > max) {
                        best = Some((kind, count));
                    }
                }
                best.map(|(kind, _)| kind)
            }
        }
    }
}

/// A non-negative inventory of resources.
///
/// Missing kinds read as zero. Debits that would go below zero are rejected
/// instead of clamped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceBag(BTreeMap<ResourceKind, u32>);

impl ResourceBag {
    /// An empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// An inventory listing every kind explicitly at zero.
    #[must_use]
    pub fn zeroed() -> Self {
        ResourceKind::ALL.into_iter().map(|kind| (kind, 0)).collect()
    }

    /// Quantity held of `kind`.
    #[must_use]
    pub fn get(&self, kind: ResourceKind) -> u32 {
        self.0.get(&kind).copied().unwrap_or(0)
    }

    /// Overwrite the quantity of `kind`.
    pub fn set(&mut self, kind: ResourceKind, quantity: u32) {
        self.0.insert(kind, quantity);
    }

    /// Add `quantity` of `kind`.
    pub fn credit(&mut self, kind: ResourceKind, quantity: u32) {
        let entry = self.0.entry(kind).or_insert(0);
        *entry = entry.saturating_add(quantity);
    }

    /// Remove `quantity` of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`ShardError::InsufficientResources`] and leaves the
    /// inventory untouched if less than `quantity` is held.
    pub fn debit(&mut self, kind: ResourceKind, quantity: u32) -> Result<()> {
        let available = self.get(kind);
        let remaining = available
            .checked_sub(quantity)
            .ok_or(ShardError::InsufficientResources {
                kind,
                required: quantity,
                available,
            })?;
        self.0.insert(kind, remaining);
        Ok(())
    }

    /// Check that every quantity in `cost` is held.
    ///
    /// # Errors
    ///
    /// Returns [`ShardError::InsufficientResources`] for the first kind that
    /// falls short.
    pub fn covers(&self, cost: &ResourceBag) -> Result<()> {
        for (kind, required) in cost.iter() {
            let available = self.get(kind);
            if available < required {
                return Err(ShardError::InsufficientResources {
                    kind,
                    required,
                    available,
                });
            }
        }
        Ok(())
    }

    /// Debit every quantity in `cost`, or nothing at all.
    ///
    /// # Errors
    ///
    /// Returns [`ShardError::InsufficientResources`] without modifying the
    /// inventory if any kind falls short.
    pub fn debit_all(&mut self, cost: &ResourceBag) -> Result<()> {
        self.covers(cost)?;
        for (kind, quantity) in cost.iter() {
            self.debit(kind, quantity)?;
        }
        Ok(())
    }

    /// Remove one unit of the kind selected by `category`, returning it.
    ///
    /// Returns `None` and leaves the inventory untouched when the category
    /// is exhausted.
    pub fn take_one(&mut self, category: ResourceCategory) -> Option<ResourceKind> {
        let kind = category.select(self)?;
        self.debit(kind, 1).ok()?;
        Some(kind)
    }

    /// Iterate over `(kind, quantity)` pairs in kind order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, u32)> + '_ {
        self.0.iter().map(|(kind, quantity)| (*kind, *quantity))
    }

    /// Returns `true` if every listed quantity is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.values().all(|quantity| *quantity == 0)
    }
}

impl FromIterator<(ResourceKind, u32)> for ResourceBag {
    fn from_iter<I: IntoIterator<Item = (ResourceKind, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[(ResourceKind, u32); N]> for ResourceBag {
    fn from(entries: [(ResourceKind, u32); N]) -> Self {
        entries.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ResourceKind::*;

    #[test]
    fn test_solid_prefers_most_abundant_then_priority() {
        let mut bag = ResourceBag::from([
            (Titanium, 0),
            (Gold, 3),
            (Aluminium, 3),
            (Iron, 5),
            (Carbon, 5),
        ]);
        assert_eq!(bag.take_one(ResourceCategory::Solid), Some(Iron));
        assert_eq!(bag.get(Iron), 4);
        assert_eq!(bag.take_one(ResourceCategory::Solid), Some(Carbon));
        assert_eq!(bag.get(Carbon), 4);
    }

    #[test]
    fn test_solid_tie_broken_toward_rarest() {
        let bag = ResourceBag::from([(Carbon, 2), (Titanium, 2), (Gold, 2)]);
        assert_eq!(ResourceCategory::Solid.select(&bag), Some(Titanium));
    }

    #[test]
    fn test_solid_ignores_liquids_and_gases() {
        let bag = ResourceBag::from([(Water, 100), (Oxygen, 100), (Gold, 1)]);
        assert_eq!(ResourceCategory::Solid.select(&bag), Some(Gold));
    }

    #[test]
    fn test_exhausted_categories_yield_nothing() {
        let mut bag = ResourceBag::from([(Water, 0), (Iron, 3)]);
        assert_eq!(bag.take_one(ResourceCategory::Liquid), None);
        assert_eq!(bag.take_one(ResourceCategory::Gaseous), None);
        assert_eq!(bag.get(Iron), 3);

        let empty = ResourceBag::new();
        assert_eq!(ResourceCategory::Solid.select(&empty), None);
    }

    #[test]
    fn test_liquid_and_gaseous_are_fixed_kinds() {
        let mut bag = ResourceBag::from([(Water, 2), (Oxygen, 1)]);
        assert_eq!(bag.take_one(ResourceCategory::Liquid), Some(Water));
        assert_eq!(bag.take_one(ResourceCategory::Gaseous), Some(Oxygen));
        assert_eq!(bag.get(Water), 1);
        assert_eq!(bag.get(Oxygen), 0);
    }

    #[test]
    fn test_debit_rejects_overdraw() {
        let mut bag = ResourceBag::from([(Iron, 3)]);
        let err = bag.debit(Iron, 4).unwrap_err();
        assert!(matches!(
            err,
            ShardError::InsufficientResources {
                kind: Iron,
                required: 4,
                available: 3
            }
        ));
        assert_eq!(bag.get(Iron), 3);
    }

    #[test]
    fn test_debit_all_is_all_or_nothing() {
        let mut bag = ResourceBag::from([(Iron, 10)]);
        let cost = ResourceBag::from([(Carbon, 5), (Iron, 10)]);
        assert!(bag.debit_all(&cost).is_err());
        assert_eq!(bag.get(Iron), 10);

        bag.credit(Carbon, 5);
        bag.debit_all(&cost).unwrap();
        assert!(bag.is_empty());
    }

    #[test]
    fn test_bag_serializes_with_lowercase_keys() {
        let bag = ResourceBag::from([(Aluminium, 2)]);
        assert_eq!(serde_json::to_string(&bag).unwrap(), r#"{"aluminium":2}"#);
    }

    #[test]
    fn test_categories() {
        assert_eq!(Water.category(), ResourceCategory::Liquid);
        assert_eq!(Oxygen.category(), ResourceCategory::Gaseous);
        assert!(SOLID_PRIORITY.iter().all(|k| k.category() == ResourceCategory::Solid));
    }
}
