//! Weapon catalogue.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A weapon mounted on a combat unit.
///
/// A weapon fires whenever the second of the day is a multiple of its fire
/// rate, so weapons with different rates keep independent cadences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    /// Damage applied to the target on each shot.
    pub damage: i32,
    /// Seconds between shots.
    pub fire_rate_secs: u32,
}

impl Weapon {
    /// Light cannon: 10 damage every 6 seconds.
    pub const CANNON: Weapon = Weapon {
        damage: 10,
        fire_rate_secs: 6,
    };

    /// Bomb: 400 damage every minute.
    pub const BOMB: Weapon = Weapon {
        damage: 400,
        fire_rate_secs: 60,
    };

    /// Every weapon type the shard knows about.
    pub const KNOWN: [Weapon; 2] = [Weapon::CANNON, Weapon::BOMB];

    /// Returns `true` if this weapon fires at `second_of_day`.
    #[must_use]
    pub fn fires_at(&self, second_of_day: u32) -> bool {
        self.fire_rate_secs != 0 && second_of_day % self.fire_rate_secs == 0
    }

    /// The fire rate as a duration.
    #[must_use]
    pub fn fire_rate(&self) -> Duration {
        Duration::from_secs(u64::from(self.fire_rate_secs))
    }

    /// The shortest fire rate among `weapons`, or `None` if there are none.
    #[must_use]
    pub fn min_fire_rate(weapons: &[Weapon]) -> Option<Duration> {
        weapons
            .iter()
            .filter(|w| w.fire_rate_secs != 0)
            .map(Weapon::fire_rate)
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cadence_against_second_of_day() {
        assert!(Weapon::CANNON.fires_at(0));
        assert!(Weapon::CANNON.fires_at(12));
        assert!(!Weapon::CANNON.fires_at(13));
        assert!(Weapon::BOMB.fires_at(120));
        assert!(!Weapon::BOMB.fires_at(66));
    }

    #[test]
    fn test_min_fire_rate() {
        assert_eq!(
            Weapon::min_fire_rate(&Weapon::KNOWN),
            Some(Duration::from_secs(6))
        );
        assert_eq!(Weapon::min_fire_rate(&[]), None);
    }
}
