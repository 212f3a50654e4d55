//! hotkeys: system-wide keyboard shortcuts
//!
//! Registers modifier + key combinations with the operating system and runs
//! a callback whenever one is pressed, whichever application has focus.
//!
//! - One listener thread per hot key, blocking on its own message queue
//! - Registration is synchronous: the caller learns whether binding worked
//! - Removal posts an unregister request; teardown finishes on the listener
//!
//! ```
//! use std::sync::Arc;
//! use hotkeys::{HotKeyManager, KeyCode, Modifiers};
//! use hotkeys::platform::simulated::SimulatedPlatform;
//!
//! let manager = HotKeyManager::new(Arc::new(SimulatedPlatform::new()));
//! let key = KeyCode::from_char('A').unwrap();
//! manager.add("id1", Modifiers::ALT, key, |event| {
//!     println!("hot key detected: {}", event.hot_key());
//! })?;
//! manager.remove_hot_key("id1");
//! # Ok::<(), hotkeys::HotKeyError>(())
//! ```

pub mod error;
pub mod events;
pub mod hotkey;
pub mod platform;
pub mod registration;
pub mod registry;

pub use error::{HotKeyError, HotKeyResult};
pub use events::{HotKeyEvent, HotKeyHandler};
pub use hotkey::{shortcut_text, HotKey, KeyCode, Modifiers, Shortcut};
pub use platform::{Platform, PlatformError, Stage};
pub use registration::{ContextState, RegistrationContext, RegistrationId, TeardownReport};
pub use registry::{HotKeyManager, ManagerConfig};

/// The binding service for the current operating system
#[cfg(target_os = "windows")]
pub type NativePlatform = platform::windows::WindowsPlatform;
