//! Modifier key definitions and virtual key codes
//!
//! Modifier bits use the platform hot key convention (ALT=0x1, CONTROL=0x2,
//! SHIFT=0x4, WIN=0x8) so they can be handed to the binding service unchanged.

use std::fmt;

bitflags::bitflags! {
    /// Modifier keys that must be held for a hot key to fire
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u32 {
        /// Either ALT key must be held down
        const ALT = 0x0001;
        /// Either CTRL key must be held down
        const CONTROL = 0x0002;
        /// Either SHIFT key must be held down
        const SHIFT = 0x0004;
        /// Either WIN key must be held down
        const WIN = 0x0008;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::empty()
    }
}

impl Modifiers {
    /// META is the WIN key under another name (Command/Super on other keyboards)
    pub const META: Modifiers = Modifiers::WIN;
}

/// Check if the WIN modifier is part of the given flags
pub fn has_win(modifiers: Modifiers) -> bool {
    modifiers.intersects(Modifiers::WIN)
}

/// Check if the ALT modifier is part of the given flags
pub fn has_alt(modifiers: Modifiers) -> bool {
    modifiers.intersects(Modifiers::ALT)
}

/// Check if the CONTROL modifier is part of the given flags
pub fn has_control(modifiers: Modifiers) -> bool {
    modifiers.intersects(Modifiers::CONTROL)
}

/// Check if the SHIFT modifier is part of the given flags
pub fn has_shift(modifiers: Modifiers) -> bool {
    modifiers.intersects(Modifiers::SHIFT)
}

/// Platform virtual key code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub u32);

impl KeyCode {
    pub const BACKSPACE: Self = Self(0x08);
    pub const TAB: Self = Self(0x09);
    pub const ENTER: Self = Self(0x0D);
    pub const PAUSE: Self = Self(0x13);
    pub const CAPS_LOCK: Self = Self(0x14);
    pub const ESCAPE: Self = Self(0x1B);
    pub const SPACE: Self = Self(0x20);
    pub const PAGE_UP: Self = Self(0x21);
    pub const PAGE_DOWN: Self = Self(0x22);
    pub const END: Self = Self(0x23);
    pub const HOME: Self = Self(0x24);
    pub const LEFT: Self = Self(0x25);
    pub const UP: Self = Self(0x26);
    pub const RIGHT: Self = Self(0x27);
    pub const DOWN: Self = Self(0x28);
    pub const PRINT_SCREEN: Self = Self(0x2C);
    pub const INSERT: Self = Self(0x2D);
    pub const DELETE: Self = Self(0x2E);
    pub const NUMPAD_MULTIPLY: Self = Self(0x6A);
    pub const NUMPAD_ADD: Self = Self(0x6B);
    pub const NUMPAD_SUBTRACT: Self = Self(0x6D);
    pub const NUMPAD_DECIMAL: Self = Self(0x6E);
    pub const NUMPAD_DIVIDE: Self = Self(0x6F);

    const NUMPAD_0: u32 = 0x60;
    const F1: u32 = 0x70;

    /// Key code for an ASCII letter or digit (letters are case-insensitive)
    pub fn from_char(c: char) -> Option<Self> {
        if c.is_ascii_alphanumeric() {
            Some(Self(u32::from(c.to_ascii_uppercase())))
        } else {
            None
        }
    }

    /// Key code for function key `F<n>`, n in 1..=24
    pub fn function(n: u32) -> Option<Self> {
        (1..=24).contains(&n).then(|| Self(Self::F1 + n - 1))
    }

    /// Key code for numeric keypad digit `n`, n in 0..=9
    pub fn numpad(n: u32) -> Option<Self> {
        (n <= 9).then(|| Self(Self::NUMPAD_0 + n))
    }

    /// Raw platform value
    pub fn code(self) -> u32 {
        self.0
    }
}

impl From<u32> for KeyCode {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

/// Display names of keys that are not letters, digits, F-keys or keypad digits
const NAMED_KEYS: &[(KeyCode, &str)] = &[
    (KeyCode::BACKSPACE, "Backspace"),
    (KeyCode::TAB, "Tab"),
    (KeyCode::ENTER, "Enter"),
    (KeyCode::PAUSE, "Pause"),
    (KeyCode::CAPS_LOCK, "Caps Lock"),
    (KeyCode::ESCAPE, "Escape"),
    (KeyCode::SPACE, "Space"),
    (KeyCode::PAGE_UP, "Page Up"),
    (KeyCode::PAGE_DOWN, "Page Down"),
    (KeyCode::END, "End"),
    (KeyCode::HOME, "Home"),
    (KeyCode::LEFT, "Left"),
    (KeyCode::UP, "Up"),
    (KeyCode::RIGHT, "Right"),
    (KeyCode::DOWN, "Down"),
    (KeyCode::PRINT_SCREEN, "Print Screen"),
    (KeyCode::INSERT, "Insert"),
    (KeyCode::DELETE, "Delete"),
    (KeyCode::NUMPAD_MULTIPLY, "NumPad *"),
    (KeyCode::NUMPAD_ADD, "NumPad +"),
    (KeyCode::NUMPAD_SUBTRACT, "NumPad -"),
    (KeyCode::NUMPAD_DECIMAL, "NumPad ."),
    (KeyCode::NUMPAD_DIVIDE, "NumPad /"),
];

/// Alternative spellings accepted when parsing key names
const KEY_ALIASES: &[(&str, KeyCode)] = &[
    ("return", KeyCode::ENTER),
    ("esc", KeyCode::ESCAPE),
    ("del", KeyCode::DELETE),
    ("ins", KeyCode::INSERT),
    ("pgup", KeyCode::PAGE_UP),
    ("pageup", KeyCode::PAGE_UP),
    ("pgdn", KeyCode::PAGE_DOWN),
    ("pagedown", KeyCode::PAGE_DOWN),
    ("capslock", KeyCode::CAPS_LOCK),
    ("printscreen", KeyCode::PRINT_SCREEN),
];

/// Human-readable name of a key
pub fn key_text(key: KeyCode) -> String {
    let code = key.0;
    match code {
        0x30..=0x39 | 0x41..=0x5A => char::from(code as u8).to_string(),
        0x60..=0x69 => format!("NumPad-{}", code - KeyCode::NUMPAD_0),
        0x70..=0x87 => format!("F{}", code - KeyCode::F1 + 1),
        _ => NAMED_KEYS
            .iter()
            .find(|(named, _)| *named == key)
            .map(|(_, name)| (*name).to_string())
            .unwrap_or_else(|| format!("Unknown keyCode: 0x{code:x}")),
    }
}

/// Resolve a key name as produced by [`key_text`] (case-insensitive, some aliases)
pub fn parse_key(name: &str) -> Option<KeyCode> {
    let name = name.trim();
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return KeyCode::from_char(c);
    }

    let lower = name.to_ascii_lowercase();
    if let Some(n) = lower.strip_prefix("numpad-") {
        return n.parse().ok().and_then(KeyCode::numpad);
    }
    if let Some(n) = lower.strip_prefix('f') {
        if let Ok(n) = n.parse() {
            return KeyCode::function(n);
        }
    }

    NAMED_KEYS
        .iter()
        .find(|(_, named)| named.eq_ignore_ascii_case(name))
        .map(|(key, _)| *key)
        .or_else(|| {
            KEY_ALIASES
                .iter()
                .find(|(alias, _)| *alias == lower)
                .map(|(_, key)| *key)
        })
}

/// Split a trailing key name that itself contains `+` (e.g. `NumPad +`)
/// off `text`, returning the text before it and the key
pub(crate) fn split_trailing_plus_key(text: &str) -> Option<(&str, KeyCode)> {
    NAMED_KEYS
        .iter()
        .filter(|(_, name)| name.contains('+'))
        .find_map(|(key, name)| {
            let split = text.len().checked_sub(name.len())?;
            let tail = text.get(split..)?;
            tail.eq_ignore_ascii_case(name)
                .then(|| (&text[..split], *key))
        })
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&key_text(*self))
    }
}
