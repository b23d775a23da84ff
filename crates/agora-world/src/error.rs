//! Error types for the `agora-world` crate.

use agora_types::Position;

/// Errors that can occur in world-model operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A position lies outside the grid.
    #[error("position {position} is outside the {size}x{size} world")]
    OutOfBounds {
        /// The offending position.
        position: Position,
        /// Side length of the world.
        size: i32,
    },

    /// The configured world size cannot hold a grid.
    #[error("invalid world size: {0}")]
    InvalidWorldSize(i32),

    /// A proposed location name failed validation.
    #[error("invalid location name: {reason}")]
    InvalidName {
        /// What was wrong with the name.
        reason: String,
    },

    /// Arithmetic overflow during a checked operation.
    #[error("arithmetic overflow in world calculation")]
    ArithmeticOverflow,
}
