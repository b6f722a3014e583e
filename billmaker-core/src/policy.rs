//! Context suppression policy for shortcuts.
//!
//! Two allow-lists decide whether a matched chord may fire:
//! - inside an editable control only `allowed_in_inputs` chords fire;
//! - while a modal is open only `allowed_in_modals` chords fire.
//!
//! Both lists are plain configuration and can be replaced from `AppConfig`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::keys::{Combo, EventTarget};

/// Navigation, escape, save and help chords stay live inside inputs.
pub const DEFAULT_INPUT_ALLOW: &[&str] = &[
    "Escape",
    "Ctrl+S",
    "Ctrl+Enter",
    "F1",
    "Ctrl+/",
    "Alt+ArrowDown",
    "Alt+ArrowUp",
];

pub const DEFAULT_MODAL_ALLOW: &[&str] = &["Escape", "Alt+ArrowDown", "Alt+ArrowUp"];

fn combos(list: &[&str]) -> BTreeSet<Combo> {
    list.iter().filter_map(|s| Combo::parse(s).ok()).collect()
}

fn default_input_allow() -> BTreeSet<Combo> {
    combos(DEFAULT_INPUT_ALLOW)
}

fn default_modal_allow() -> BTreeSet<Combo> {
    combos(DEFAULT_MODAL_ALLOW)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortcutPolicy {
    #[serde(default = "default_input_allow")]
    pub allowed_in_inputs: BTreeSet<Combo>,
    #[serde(default = "default_modal_allow")]
    pub allowed_in_modals: BTreeSet<Combo>,
}

impl Default for ShortcutPolicy {
    fn default() -> Self {
        Self {
            allowed_in_inputs: default_input_allow(),
            allowed_in_modals: default_modal_allow(),
        }
    }
}

impl ShortcutPolicy {
    pub fn allow_in_inputs(&mut self, combo: Combo) {
        self.allowed_in_inputs.insert(combo);
    }

    pub fn allow_in_modals(&mut self, combo: Combo) {
        self.allowed_in_modals.insert(combo);
    }

    /// Gate for a resolved chord delivered to `target`.
    pub fn permits(&self, combo: &Combo, target: EventTarget, modal_open: bool) -> bool {
        if target.is_editable() && !self.allowed_in_inputs.contains(combo) {
            return false;
        }
        if modal_open && !self.allowed_in_modals.contains(combo) {
            return false;
        }
        true
    }
}
