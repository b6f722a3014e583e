//! Key events and canonical chord names.
//!
//! Every chord is reduced to one spelling before lookup: modifiers in the
//! fixed order `Ctrl+Shift+Alt+Meta`, then the normalized key token.
//! Two physically equivalent key presses always produce the same `Combo`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced when parsing a chord written as text (`"Ctrl+Shift+K"`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComboParseError {
    #[error("key combination is empty")]
    Empty,
    #[error("key combination has modifiers but no key")]
    MissingKey,
    #[error("key combination names more than one key: '{0}'")]
    ExtraKey(String),
}

/// Modifier flags carried by a keydown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self { ctrl: false, shift: false, alt: false, meta: false };

    pub fn any(&self) -> bool {
        self.ctrl || self.shift || self.alt || self.meta
    }
}

/// The kind of element a key event was delivered to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTarget {
    #[default]
    Document,
    TextInput,
    TextArea,
    Select,
    ContentEditable,
    Checkbox,
    Radio,
    Button,
    FileInput,
}

impl EventTarget {
    /// Text-entry controls and selects swallow plain keys.
    pub fn is_editable(self) -> bool {
        matches!(
            self,
            EventTarget::TextInput
                | EventTarget::TextArea
                | EventTarget::Select
                | EventTarget::ContentEditable
        )
    }
}

/// A single keydown, with the suppression flags a handler may set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: String,
    pub modifiers: Modifiers,
    pub target: EventTarget,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            modifiers: Modifiers::NONE,
            target: EventTarget::Document,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.modifiers.ctrl = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.modifiers.shift = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.modifiers.alt = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.modifiers.meta = true;
        self
    }

    pub fn on(mut self, target: EventTarget) -> Self {
        self.target = target;
        self
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Canonical chord string, e.g. `Ctrl+Shift+P`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Combo(String);

impl Combo {
    /// Build a combo from modifier flags and a raw key name.
    ///
    /// Returns `None` when the key is itself a modifier (a bare `Shift`
    /// press has no chord of its own).
    pub fn from_parts(modifiers: Modifiers, key: &str) -> Option<Self> {
        normalize_key(key).map(|token| Self::compose(modifiers, &token))
    }

    fn compose(modifiers: Modifiers, token: &str) -> Self {
        let mut out = String::new();
        for (on, name) in [
            (modifiers.ctrl, "Ctrl"),
            (modifiers.shift, "Shift"),
            (modifiers.alt, "Alt"),
            (modifiers.meta, "Meta"),
        ] {
            if on {
                out.push_str(name);
                out.push('+');
            }
        }
        out.push_str(token);
        Self(out)
    }

    /// Parse a chord written by hand. Modifier order and case do not matter.
    pub fn parse(input: &str) -> Result<Self, ComboParseError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ComboParseError::Empty);
        }

        // "+" and "Ctrl++" name the plus key itself.
        let (prefix, mut key) = if s == "+" {
            ("", Some("Plus".to_string()))
        } else if let Some(rest) = s.strip_suffix("++") {
            (rest, Some("Plus".to_string()))
        } else {
            (s, None)
        };

        let mut modifiers = Modifiers::NONE;
        for part in prefix.split('+').map(str::trim).filter(|p| !p.is_empty()) {
            match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" | "ctl" => modifiers.ctrl = true,
                "shift" => modifiers.shift = true,
                "alt" | "option" | "opt" => modifiers.alt = true,
                "meta" | "cmd" | "command" | "super" | "win" => modifiers.meta = true,
                _ => {
                    if key.is_some() {
                        return Err(ComboParseError::ExtraKey(part.to_string()));
                    }
                    key = Some(normalize_key(part).ok_or(ComboParseError::MissingKey)?);
                }
            }
        }

        let key = key.ok_or(ComboParseError::MissingKey)?;
        Ok(Self::compose(modifiers, &key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The key token without modifiers (`"P"` for `Ctrl+Shift+P`).
    pub fn key(&self) -> &str {
        self.0.rsplit('+').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for Combo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Combo {
    type Err = ComboParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Combo {
    type Error = ComboParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Combo> for String {
    fn from(combo: Combo) -> Self {
        combo.0
    }
}

/// Map a DOM key name onto its fixed token.
///
/// Special keys get one spelling, single characters are upper-cased and
/// modifier keys yield `None`.
pub fn normalize_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return None;
    }
    if key == " " {
        return Some("Space".to_string());
    }

    let lower = key.trim().to_ascii_lowercase();
    let token = match lower.as_str() {
        "control" | "ctrl" | "shift" | "alt" | "altgraph" | "meta" | "os" | "super" => {
            return None
        }
        "space" | "spacebar" => "Space",
        "esc" | "escape" => "Escape",
        "enter" | "return" => "Enter",
        "tab" => "Tab",
        "backspace" => "Backspace",
        "del" | "delete" => "Delete",
        "insert" => "Insert",
        "home" => "Home",
        "end" => "End",
        "pageup" => "PageUp",
        "pagedown" => "PageDown",
        "up" | "arrowup" => "ArrowUp",
        "down" | "arrowdown" => "ArrowDown",
        "left" | "arrowleft" => "ArrowLeft",
        "right" | "arrowright" => "ArrowRight",
        "+" | "plus" => "Plus",
        _ => {
            if let Some(n) = function_key_number(&lower) {
                return Some(format!("F{n}"));
            }
            if key.chars().count() == 1 {
                return Some(key.to_uppercase());
            }
            return Some(key.trim().to_string());
        }
    };
    Some(token.to_string())
}

fn function_key_number(lower: &str) -> Option<u8> {
    let digits = lower.strip_prefix('f')?;
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u8>().ok().filter(|n| (1..=24).contains(n))
}

/// Derive the canonical combo for a keydown. Pure; `None` for bare modifiers.
pub fn resolve_combination(event: &KeyEvent) -> Option<Combo> {
    Combo::from_parts(event.modifiers, &event.key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_press_order_does_not_matter() {
        let a = resolve_combination(&KeyEvent::new("k").ctrl().shift());
        let b = resolve_combination(&KeyEvent::new("K").shift().ctrl());
        assert_eq!(a, b);
        assert_eq!(a.unwrap().as_str(), "Ctrl+Shift+K");
    }

    #[test]
    fn special_keys_map_to_tokens() {
        assert_eq!(normalize_key(" ").as_deref(), Some("Space"));
        assert_eq!(normalize_key("Esc").as_deref(), Some("Escape"));
        assert_eq!(normalize_key("Up").as_deref(), Some("ArrowUp"));
        assert_eq!(normalize_key("f5").as_deref(), Some("F5"));
        assert_eq!(normalize_key("f").as_deref(), Some("F"));
        assert_eq!(normalize_key("/").as_deref(), Some("/"));
    }

    #[test]
    fn bare_modifier_has_no_combination() {
        assert!(resolve_combination(&KeyEvent::new("Control").ctrl()).is_none());
        assert!(resolve_combination(&KeyEvent::new("Shift").shift()).is_none());
    }

    #[test]
    fn parse_reorders_modifiers() {
        let combo: Combo = "meta+alt+shift+ctrl+p".parse().unwrap();
        assert_eq!(combo.as_str(), "Ctrl+Shift+Alt+Meta+P");
        assert_eq!(combo.key(), "P");
    }

    #[test]
    fn parse_plus_key() {
        assert_eq!(Combo::parse("Ctrl++").unwrap().as_str(), "Ctrl+Plus");
        assert_eq!(Combo::parse("+").unwrap().as_str(), "Plus");
    }

    #[test]
    fn parse_errors() {
        assert_eq!(Combo::parse("  "), Err(ComboParseError::Empty));
        assert_eq!(Combo::parse("Ctrl+Shift"), Err(ComboParseError::MissingKey));
        assert_eq!(
            Combo::parse("Ctrl+A+B"),
            Err(ComboParseError::ExtraKey("B".to_string()))
        );
    }

    #[test]
    fn parsed_and_resolved_agree() {
        let parsed = Combo::parse("alt+down").unwrap();
        let resolved = resolve_combination(&KeyEvent::new("ArrowDown").alt()).unwrap();
        assert_eq!(parsed, resolved);
    }

    #[test]
    fn editable_targets() {
        assert!(EventTarget::TextInput.is_editable());
        assert!(EventTarget::Select.is_editable());
        assert!(!EventTarget::Checkbox.is_editable());
        assert!(!EventTarget::Document.is_editable());
    }
}
