//! Shared type definitions for the Agora simulation.
//!
//! This crate is the single source of truth for the data model used across
//! the workspace. Wire-facing types also derive `ts-rs` bindings so that
//! dashboards and out-of-process decision agents share the same shapes.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for every entity identifier
//! - [`enums`] -- Resources, agent states, actions, events, and other tags
//! - [`structs`] -- Entities: agents, spawns, shelters, social graph, economy
//! - [`actions`] -- Intents, decisions, deltas, and the action result contract
//! - [`observation`] -- The per-tick payload handed to decision sources

pub mod actions;
pub mod enums;
pub mod ids;
pub mod observation;
pub mod structs;

pub use actions::{
    ActionIntent, ActionParams, ActionResult, AgentDelta, Decision, Referral, WorldEffect,
};
pub use enums::{
    ActionType, AgentStatus, ClaimType, CompassDirection, DiscoveryType, EmploymentStatus,
    EventType, MemoryKind, PaymentType, Personality, ResourceType, ScentStrength, Valence,
};
pub use ids::{
    AgentId, CredentialId, EmploymentId, EventId, MemoryId, ShelterId, SignalId, SpawnId,
};
pub use observation::{
    LastActionResult, NearbyAgent, NearbyName, NearbyResource, NearbyShelter, Observation,
    RelationshipView, ScentReading, SelfState,
};
pub use structs::{
    Agent, Credential, Employment, Event, KnowledgeRecord, LocationClaim, LocationName, Memory,
    Position, Relationship, ResourceSpawn, ScentTrace, SharedInfo, Shelter, Signal, VITAL_MAX,
    VITAL_MIN,
};

#[cfg(test)]
mod tests {
    #[test]
    fn export_bindings() {
        // Exporting writes TypeScript files under `bindings/`.
        use ts_rs::TS;

        let _ = crate::ids::AgentId::export_all();
        let _ = crate::ids::EventId::export_all();

        let _ = crate::enums::ActionType::export_all();
        let _ = crate::enums::EventType::export_all();
        let _ = crate::enums::ScentStrength::export_all();

        let _ = crate::structs::Agent::export_all();
        let _ = crate::structs::Event::export_all();
        let _ = crate::structs::KnowledgeRecord::export_all();

        let _ = crate::actions::ActionParams::export_all();
        let _ = crate::actions::Decision::export_all();
        let _ = crate::actions::ActionResult::export_all();

        let _ = crate::observation::Observation::export_all();
    }
}
