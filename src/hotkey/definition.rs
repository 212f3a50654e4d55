//! The hot key value type

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::keys::{KeyCode, Modifiers};
use super::shortcut::Shortcut;

/// Opaque caller data carried through to every fired event
pub type HotKeyData = Arc<dyn Any + Send + Sync>;

/// A hot key: a caller-chosen id bound to a modifier + key combination
///
/// Immutable once constructed. Cloning is cheap; attached data is shared.
#[derive(Clone)]
pub struct HotKey {
    id: String,
    shortcut: Shortcut,
    data: Option<HotKeyData>,
}

impl HotKey {
    /// Create a hot key without attached data
    pub fn new(id: impl Into<String>, modifiers: Modifiers, key_code: KeyCode) -> Self {
        Self::from_shortcut(id, Shortcut::new(modifiers, key_code))
    }

    /// Create a hot key from an already assembled shortcut
    pub fn from_shortcut(id: impl Into<String>, shortcut: Shortcut) -> Self {
        Self {
            id: id.into(),
            shortcut,
            data: None,
        }
    }

    /// Attach caller data, replacing any previous value
    pub fn with_data<T: Any + Send + Sync>(mut self, data: T) -> Self {
        self.data = Some(Arc::new(data));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn modifiers(&self) -> Modifiers {
        self.shortcut.modifiers
    }

    pub fn key_code(&self) -> KeyCode {
        self.shortcut.key_code
    }

    pub fn shortcut(&self) -> Shortcut {
        self.shortcut
    }

    /// Attached data, if present and of type `T`
    pub fn data<T: Any>(&self) -> Option<&T> {
        self.data.as_deref().and_then(|data| data.downcast_ref())
    }

    /// Attached data regardless of its type
    pub fn raw_data(&self) -> Option<&HotKeyData> {
        self.data.as_ref()
    }
}

impl fmt::Display for HotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.shortcut, f)
    }
}

impl fmt::Debug for HotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HotKey")
            .field("id", &self.id)
            .field("shortcut", &self.shortcut.to_string())
            .field("has_data", &self.data.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let key = KeyCode::from_char('S').unwrap();
        let hot_key = HotKey::new("save", Modifiers::CONTROL | Modifiers::ALT, key);
        assert_eq!(hot_key.id(), "save");
        assert_eq!(hot_key.modifiers(), Modifiers::CONTROL | Modifiers::ALT);
        assert_eq!(hot_key.key_code(), key);
        assert_eq!(hot_key.to_string(), "ALT+CTRL+S");
        assert!(hot_key.raw_data().is_none());
    }

    #[test]
    fn test_data_downcast() {
        let hot_key = HotKey::new("x", Modifiers::ALT, KeyCode::SPACE).with_data(42_u32);
        assert_eq!(hot_key.data::<u32>(), Some(&42));
        assert_eq!(hot_key.data::<String>(), None);

        let clone = hot_key.clone();
        assert!(Arc::ptr_eq(
            hot_key.raw_data().unwrap(),
            clone.raw_data().unwrap()
        ));
    }

    #[test]
    fn test_debug_hides_data() {
        let hot_key = HotKey::new("x", Modifiers::ALT, KeyCode::SPACE).with_data("secret");
        let debug = format!("{hot_key:?}");
        assert!(debug.contains("ALT+Space"));
        assert!(debug.contains("has_data: true"));
        assert!(!debug.contains("secret"));
    }
}
