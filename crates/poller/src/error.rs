//! Poller error types

use contracts::ContractError;
use thiserror::Error;

/// Poller errors
#[derive(Debug, Error)]
pub enum PollerError {
    /// An item with this name is already registered
    #[error("item '{name}' already exists")]
    ItemExists { name: String },

    /// No item with this name
    #[error("item '{name}' not found")]
    NotFound { name: String },

    /// `start`/`run` called on a poller that was already started
    #[error("poller is already running")]
    AlreadyRunning,

    /// The cycle task has exited
    #[error("poller has stopped")]
    Stopped,

    /// The cycle task panicked or was cancelled
    #[error("poller task failed: {message}")]
    TaskFailed { message: String },

    /// Invalid item definition
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl PollerError {
    pub fn item_exists(name: impl Into<String>) -> Self {
        Self::ItemExists { name: name.into() }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }
}
