//! Events delivered to hot key handlers
//!
//! A fresh `HotKeyEvent` is built for every firing and handed to the
//! handler synchronously on the hot key's listener thread.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::hotkey::HotKey;

/// Callback invoked on the listener thread each time a hot key fires
pub type HotKeyHandler = Arc<dyn Fn(&HotKeyEvent) + Send + Sync>;

/// A single firing of a registered hot key
#[derive(Debug, Clone)]
pub struct HotKeyEvent {
    hot_key: HotKey,
    fired_at: Instant,
}

impl HotKeyEvent {
    pub(crate) fn new(hot_key: HotKey) -> Self {
        Self {
            hot_key,
            fired_at: Instant::now(),
        }
    }

    /// The hot key that fired
    pub fn hot_key(&self) -> &HotKey {
        &self.hot_key
    }

    /// When the listener picked up the firing
    pub fn fired_at(&self) -> Instant {
        self.fired_at
    }
}

impl fmt::Display for HotKeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HOTKEY_FIRED {} ({})", self.hot_key.id(), self.hot_key)
    }
}
