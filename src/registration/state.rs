//! Lifecycle states of a registration context

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Where a registration context is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ContextState {
    /// Constructed, no platform resources yet
    #[default]
    Created,
    /// Listener thread is acquiring resources and binding the combination
    Registering,
    /// Bound; the listener is waiting for messages
    Active,
    /// Unregister requested; the listener is releasing resources
    Unregistering,
    /// Terminal; all resources released (or their release attempted)
    Closed,
    /// Terminal; registration did not succeed
    Failed,
}

impl ContextState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Registering,
            2 => Self::Active,
            3 => Self::Unregistering,
            4 => Self::Closed,
            _ => Self::Failed,
        }
    }

    /// Whether no further transitions can happen
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextState::Created => write!(f, "Created"),
            ContextState::Registering => write!(f, "Registering"),
            ContextState::Active => write!(f, "Active"),
            ContextState::Unregistering => write!(f, "Unregistering"),
            ContextState::Closed => write!(f, "Closed"),
            ContextState::Failed => write!(f, "Failed"),
        }
    }
}

/// State shared between the owner and the listener thread
#[derive(Debug, Default)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn get(&self) -> ContextState {
        ContextState::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub(crate) fn set(&self, state: ContextState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }
}
