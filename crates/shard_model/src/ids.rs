//! Identifier types.
//!
//! Users are keyed by caller-supplied ids; units and buildings get a UUID v4
//! when created locally but keep their original id when they arrive from
//! another shard or are placed by an administrator. All three are opaque
//! strings on the wire.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifies a user. Supplied by the caller on creation.
    UserId
);

string_id!(
    /// Identifies a unit across shards.
    UnitId
);

string_id!(
    /// Identifies a building.
    BuildingId
);

impl UserId {
    /// Returns `true` if the id is non-empty and only contains ASCII letters,
    /// digits and dashes.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty() && self.0.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = UnitId::generate();
        let b = UnitId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_user_id_validation() {
        assert!(UserId::from("player-1").is_well_formed());
        assert!(!UserId::from("").is_well_formed());
        assert!(!UserId::from("bad id").is_well_formed());
        assert!(!UserId::from("semi;colon").is_well_formed());
    }

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let id = BuildingId::from("b-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"b-1\"");
    }
}
