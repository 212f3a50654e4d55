//! Error types for hot key registration

use thiserror::Error;

use crate::platform::PlatformError;
use crate::registration::ContextState;

/// Errors surfaced to callers of the registry
#[derive(Debug, Error)]
pub enum HotKeyError {
    /// A hot key with this id is already registered
    #[error("a hot key with id '{0}' is already registered")]
    DuplicateId(String),

    /// Hot key ids must be non-empty
    #[error("hot key id must not be empty")]
    EmptyId,

    /// The platform refused one of the registration steps
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// The caller stopped waiting before the listener reported an outcome
    #[error("registration of hot key '{id}' interrupted: {reason}")]
    WaitInterrupted { id: String, reason: String },

    /// A context can only be registered once
    #[error("hot key '{id}' cannot be registered while {state}")]
    NotRegistrable { id: String, state: ContextState },

    /// Every registration id is leased by a live hot key
    #[error("no registration id available")]
    RegistrationIdsExhausted,

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),

    #[error("invalid shortcut '{input}': {reason}")]
    InvalidShortcut { input: String, reason: String },
}

/// Result type for hot key operations
pub type HotKeyResult<T> = Result<T, HotKeyError>;
