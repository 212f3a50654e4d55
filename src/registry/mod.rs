//! Hot key registry

mod manager;

pub use manager::{HotKeyManager, ManagerConfig};
