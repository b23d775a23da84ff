//! Error types for the agora-agents crate.
//!
//! [`ActionError`] is the validation tier: its `Display` text is the
//! user-facing reason placed into a failed `ActionResult` and fed back to the
//! agent. [`AgentError`] is for internal faults in state bookkeeping.

use agora_types::{ActionType, AgentId, CredentialId, EmploymentId, ResourceType};
use agora_world::Axis;
use rust_decimal::Decimal;

/// Reasons an intent is rejected. These are ordinary outcomes, not faults.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    /// A destination coordinate lies outside the grid.
    #[error("Invalid position: {axis}={value} is outside the world (0..{size})")]
    InvalidPosition {
        /// Offending axis.
        axis: Axis,
        /// Offending coordinate value.
        value: i32,
        /// Side length of the world.
        size: i32,
    },

    /// The agent already stands on the destination.
    #[error("Already at destination")]
    AlreadyAtDestination,

    /// The agent cannot pay the energy cost.
    #[error("Insufficient energy: need {required} ({breakdown}), have {available:.1}")]
    InsufficientEnergy {
        /// Energy required after rounding up.
        required: f64,
        /// Energy the agent has.
        available: f64,
        /// Every factor contributing to `required`.
        breakdown: String,
    },

    /// The acting agent is dead.
    #[error("Agent is dead")]
    AgentDead,

    /// The target agent does not exist.
    #[error("Target agent {0} does not exist")]
    TargetNotFound(AgentId),

    /// The target agent is dead.
    #[error("Target agent {0} is dead")]
    TargetDead(AgentId),

    /// The action may not target its own actor.
    #[error("Cannot target yourself")]
    CannotTargetSelf,

    /// The target is farther away than the action allows.
    #[error("Target is {distance} cells away, maximum is {range}")]
    OutOfRange {
        /// Manhattan distance to the target.
        distance: u32,
        /// Maximum allowed distance.
        range: u32,
    },

    /// The target is not on an adjacent cell.
    #[error("Target must be adjacent, but is {distance} cells away")]
    NotAdjacent {
        /// Manhattan distance to the target.
        distance: u32,
    },

    /// A deceptive claim was too short or too long.
    #[error("Claim must be between 5 and 500 characters, got {length}")]
    ClaimLength {
        /// Length in characters.
        length: usize,
    },

    /// A deceptive claim used an unlisted category.
    #[error("Unknown claim type: {0}")]
    UnknownClaimType(String),

    /// Nothing to gather at the current cell.
    #[error("No resource spawn at the current position")]
    NoResourceHere,

    /// The spawn at the current cell is empty.
    #[error("Resource spawn is depleted")]
    ResourceDepleted,

    /// The agent does not hold enough of an item.
    #[error("Not enough {item:?}: need {requested}, have {held}")]
    ItemNotHeld {
        /// Item required.
        item: ResourceType,
        /// Units required.
        requested: u32,
        /// Units held.
        held: u32,
    },

    /// The item cannot be eaten.
    #[error("{0:?} is not edible")]
    NotConsumable(ResourceType),

    /// Someone lacks the currency for the action.
    #[error("Insufficient funds: need {required}, have {available}")]
    InsufficientFunds {
        /// Amount required.
        required: Decimal,
        /// Amount available.
        available: Decimal,
    },

    /// The asking price is above what the goods are worth.
    #[error("Price {price} exceeds the most these goods can fetch ({ceiling})")]
    PriceTooHigh {
        /// Asking price.
        price: Decimal,
        /// Highest allowed price.
        ceiling: Decimal,
    },

    /// A parameter is malformed.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The employment contract does not exist.
    #[error("Employment {0} does not exist")]
    EmploymentNotFound(EmploymentId),

    /// The employment contract is not in a state that allows the action.
    #[error("Employment unavailable: {0}")]
    EmploymentUnavailable(String),

    /// Only the employer may settle a contract.
    #[error("Only the employer can pay this worker")]
    NotEmployer,

    /// No salary is currently owed.
    #[error("Nothing is owed on this contract")]
    NothingOwed,

    /// Another agent already holds the cell.
    #[error("Location already claimed by {0}")]
    AlreadyClaimed(AgentId),

    /// The actor already holds the cell.
    #[error("You already hold a claim on this location")]
    AlreadyYours,

    /// A proposed name failed validation.
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// The actor has no knowledge of the subject.
    #[error("You know nothing about agent {0}")]
    UnknownSubject(AgentId),

    /// The credential does not exist.
    #[error("Credential {0} does not exist")]
    CredentialNotFound(CredentialId),

    /// Only the issuer may revoke a credential.
    #[error("Only the issuer can revoke this credential")]
    NotIssuer,

    /// The credential was already revoked.
    #[error("Credential was already revoked")]
    AlreadyRevoked,

    /// An identical live credential exists.
    #[error("An active credential with this title already exists")]
    DuplicateCredential,

    /// A parent does not meet the requirements for offspring.
    #[error("Cannot spawn offspring: {0}")]
    OffspringRequirements(String),

    /// No handler is registered for the action type.
    #[error("No handler registered for action {0}")]
    NoHandler(ActionType),

    /// The action lost a same-tick race for a shared resource.
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Internal faults while maintaining agent state.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The agent does not exist.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),
}
