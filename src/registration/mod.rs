//! Registration contexts
//!
//! One context per hot key, each with its own listener thread:
//! - Created: constructed, nothing acquired
//! - Registering: listener acquiring resources, caller blocked
//! - Active: bound, listener waiting for messages
//! - Unregistering: listener releasing resources
//! - Closed / Failed: terminal

mod context;
mod id;
mod state;

pub use context::{RegistrationContext, TeardownReport};
pub use id::RegistrationId;
pub use state::ContextState;
