//! Hot key definitions
//!
//! Modifier flags, key codes, shortcut text and the `HotKey` value type
//! handed to the registry.

mod definition;
mod keys;
mod shortcut;

pub use definition::{HotKey, HotKeyData};
pub use keys::{has_alt, has_control, has_shift, has_win, key_text, parse_key, KeyCode, Modifiers};
pub use shortcut::{shortcut_text, Shortcut};
