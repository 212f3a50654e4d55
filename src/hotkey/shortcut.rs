//! Shortcut text formatting and parsing
//!
//! A shortcut renders as its modifiers in the fixed order WIN, ALT, CTRL,
//! SHIFT followed by the key name, joined by `+` (e.g. `WIN+ALT+A`). A bare
//! key renders without any separator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::keys::{
    has_alt, has_control, has_shift, has_win, key_text, parse_key, split_trailing_plus_key, KeyCode,
    Modifiers,
};
use crate::error::HotKeyError;

/// A modifier + key combination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shortcut {
    pub modifiers: Modifiers,
    pub key_code: KeyCode,
}

impl Shortcut {
    pub fn new(modifiers: Modifiers, key_code: KeyCode) -> Self {
        Self {
            modifiers,
            key_code,
        }
    }

    /// Text segments in display order
    fn segments(&self) -> Vec<String> {
        let mut segments = Vec::with_capacity(5);
        if has_win(self.modifiers) {
            segments.push("WIN".to_string());
        }
        if has_alt(self.modifiers) {
            segments.push("ALT".to_string());
        }
        if has_control(self.modifiers) {
            segments.push("CTRL".to_string());
        }
        if has_shift(self.modifiers) {
            segments.push("SHIFT".to_string());
        }
        segments.push(key_text(self.key_code));
        segments
    }
}

/// Human-readable shortcut text, e.g. `CTRL+SHIFT+F5`
pub fn shortcut_text(modifiers: Modifiers, key_code: KeyCode) -> String {
    Shortcut::new(modifiers, key_code).to_string()
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments().join("+"))
    }
}

fn parse_modifier(token: &str) -> Option<Modifiers> {
    match token.to_ascii_uppercase().as_str() {
        "WIN" | "META" | "SUPER" | "CMD" | "COMMAND" => Some(Modifiers::WIN),
        "ALT" | "OPTION" => Some(Modifiers::ALT),
        "CTRL" | "CONTROL" => Some(Modifiers::CONTROL),
        "SHIFT" => Some(Modifiers::SHIFT),
        _ => None,
    }
}

impl FromStr for Shortcut {
    type Err = HotKeyError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| HotKeyError::InvalidShortcut {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let (modifier_text, key_code) = match split_trailing_plus_key(input.trim()) {
            Some((head, key_code)) => {
                let head = head.trim_end();
                let head = if head.is_empty() {
                    None
                } else {
                    Some(
                        head.strip_suffix('+')
                            .ok_or_else(|| invalid("missing '+' before key"))?,
                    )
                };
                (head, key_code)
            }
            None => {
                let (head, key) = match input.rsplit_once('+') {
                    Some((head, key)) => (Some(head), key.trim()),
                    None => (None, input.trim()),
                };
                if key.is_empty() {
                    return Err(invalid("empty segment"));
                }
                if parse_modifier(key).is_some() {
                    return Err(invalid("missing key after modifiers"));
                }
                let key_code =
                    parse_key(key).ok_or_else(|| invalid(&format!("unknown key '{key}'")))?;
                (head, key_code)
            }
        };

        let mut modifiers = Modifiers::empty();
        for token in modifier_text.into_iter().flat_map(|head| head.split('+')).map(str::trim) {
            if token.is_empty() {
                return Err(invalid("empty segment"));
            }
            let modifier =
                parse_modifier(token).ok_or_else(|| invalid(&format!("unknown modifier '{token}'")))?;
            modifiers |= modifier;
        }

        Ok(Self::new(modifiers, key_code))
    }
}

impl Serialize for Shortcut {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Shortcut {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
