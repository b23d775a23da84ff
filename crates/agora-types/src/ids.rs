//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every entity in the world carries a strongly-typed ID so identifiers
//! cannot be mixed up at compile time. IDs minted at runtime by the
//! simulation are derived from the run's seeded RNG (see
//! [`from_random_bytes`](AgentId::from_random_bytes)) so that two runs with
//! the same seed produce the same world. `new()` uses UUID v7 and is meant
//! for metadata that is not part of replayed state (event ids, fixtures).

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Build a version 4 identifier from caller-supplied random bytes.
            ///
            /// Used with the simulation RNG so replays mint identical ids.
            pub const fn from_random_bytes(bytes: [u8; 16]) -> Self {
                Self(uuid::Builder::from_random_bytes(bytes).into_uuid())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for an agent.
    AgentId
}

define_id! {
    /// Unique identifier for a resource spawn point.
    SpawnId
}

define_id! {
    /// Unique identifier for a shelter.
    ShelterId
}

define_id! {
    /// Unique identifier for an event in the append-only log.
    EventId
}

define_id! {
    /// Unique identifier for an agent memory.
    MemoryId
}

define_id! {
    /// Unique identifier for an employment contract and its escrow.
    EmploymentId
}

define_id! {
    /// Unique identifier for a broadcast signal.
    SignalId
}

define_id! {
    /// Unique identifier for an issued credential.
    CredentialId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_bytes_are_deterministic() {
        let a = AgentId::from_random_bytes([7; 16]);
        let b = AgentId::from_random_bytes([7; 16]);
        assert_eq!(a, b);
        assert_eq!(a.into_inner().get_version_num(), 4);
    }

    #[test]
    fn v7_ids_are_unique() {
        assert_ne!(EventId::new(), EventId::new());
    }

    #[test]
    fn id_serializes_as_plain_uuid() {
        let id = AgentId::from(Uuid::nil());
        let json = serde_json::to_string(&id).ok();
        assert_eq!(
            json.as_deref(),
            Some("\"00000000-0000-0000-0000-000000000000\"")
        );
    }
}
