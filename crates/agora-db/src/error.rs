//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`sqlx`] and [`fred`] errors. At the [`WorldStore`] and [`ScentStore`]
//! seams they are narrowed into [`StoreError`] so the scheduler can tell an
//! unreachable backend from a rejected write.
//!
//! [`WorldStore`]: agora_core::WorldStore
//! [`ScentStore`]: agora_core::ScentStore

use agora_core::StoreError;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A `Dragonfly`/Redis operation failed.
    #[error("Dragonfly error: {0}")]
    Dragonfly(#[from] fred::error::Error),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row does not describe a valid entity.
    #[error("Corrupt row {kind}/{key}: {reason}")]
    CorruptRow {
        /// Entity kind of the row.
        kind: String,
        /// Key of the row.
        key: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<DbError> for StoreError {
    fn from(error: DbError) -> Self {
        let message = error.to_string();
        match error {
            DbError::Postgres(
                sqlx::Error::Io(_)
                | sqlx::Error::PoolTimedOut
                | sqlx::Error::PoolClosed
                | sqlx::Error::WorkerCrashed,
            ) => Self::Unavailable(message),
            DbError::Dragonfly(e)
                if matches!(
                    e.kind(),
                    fred::error::ErrorKind::IO
                        | fred::error::ErrorKind::Timeout
                        | fred::error::ErrorKind::Canceled
                ) =>
            {
                Self::Unavailable(message)
            }
            DbError::Serialization(_) | DbError::CorruptRow { .. } => {
                Self::Serialization(message)
            }
            _ => Self::Backend(message),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeouts_read_as_unavailable() {
        let err: StoreError = DbError::Postgres(sqlx::Error::PoolTimedOut).into();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[test]
    fn bad_rows_read_as_serialization() {
        let err: StoreError = DbError::CorruptRow {
            kind: "agent".to_owned(),
            key: "x".to_owned(),
            reason: "bad id".to_owned(),
        }
        .into();
        assert!(matches!(err, StoreError::Serialization(_)));

        let err: StoreError = DbError::Config("nope".to_owned()).into();
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
