//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and shutdown.

use agora_core::genesis::GenesisError;
use agora_core::{ConfigError, SchedulerError, StoreError};
use agora_db::DbError;
use agora_observer::ServerError;

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// A fresh world could not be generated.
    #[error("genesis error: {source}")]
    Genesis {
        /// The underlying genesis error.
        #[from]
        source: GenesisError,
    },

    /// Connecting to or migrating a backing store failed.
    #[error("database error: {source}")]
    Db {
        /// The underlying database error.
        #[from]
        source: DbError,
    },

    /// A store operation during startup failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },

    /// The scheduler refused to start.
    #[error("scheduler error: {source}")]
    Scheduler {
        /// The underlying scheduler error.
        #[from]
        source: SchedulerError,
    },

    /// The control surface failed to bind or serve.
    #[error("observer error: {source}")]
    Observer {
        /// The underlying server error.
        #[from]
        source: ServerError,
    },

    /// NATS connection failed.
    #[error("NATS error: {message}")]
    Nats {
        /// Description of the NATS failure.
        message: String,
    },
}
