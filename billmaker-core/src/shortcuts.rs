//! Shortcut Dispatcher - chord registry and keydown handling.
//!
//! Bindings are keyed by canonical `Combo`; registering the same chord
//! twice keeps the last binding. Dispatch never fails: handler errors are
//! logged and swallowed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, trace};

use crate::collaborators::CollaboratorError;
use crate::keys::{resolve_combination, Combo, KeyEvent};
use crate::markup::escape;
use crate::policy::ShortcutPolicy;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShortcutCategory {
    Navigation,
    Invoice,
    Customers,
    Products,
    View,
    Help,
}

impl ShortcutCategory {
    /// Panel order.
    pub const ALL: [ShortcutCategory; 6] = [
        ShortcutCategory::Navigation,
        ShortcutCategory::Invoice,
        ShortcutCategory::Customers,
        ShortcutCategory::Products,
        ShortcutCategory::View,
        ShortcutCategory::Help,
    ];

    pub fn title(self) -> &'static str {
        match self {
            ShortcutCategory::Navigation => "Navigation",
            ShortcutCategory::Invoice => "Invoice",
            ShortcutCategory::Customers => "Customers",
            ShortcutCategory::Products => "Products",
            ShortcutCategory::View => "View",
            ShortcutCategory::Help => "Help",
        }
    }
}

/// Failure raised by a bound action. Logged by the dispatcher, never rethrown.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

#[derive(Debug, Clone)]
pub struct ShortcutBinding<A> {
    pub combo: Combo,
    /// `None` still claims the chord: the keydown is suppressed, nothing runs.
    pub action: Option<A>,
    pub description: String,
    pub category: ShortcutCategory,
    pub enabled: bool,
}

/// The owner of the UI event loop, as seen by the dispatcher.
pub trait ShortcutHost<A> {
    fn modal_open(&self) -> bool {
        false
    }

    fn perform(&mut self, action: &A) -> Result<(), ActionError>;
}

/// What a single `dispatch` call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The dispatcher is switched off.
    Disabled,
    /// The keydown was a bare modifier.
    NoCombination,
    Unbound(Combo),
    /// Suppressed by the input or modal allow-list.
    Blocked(Combo),
    /// Matched a binding that is switched off.
    Inactive(Combo),
    Handled(Combo),
    /// The action ran and returned an error.
    Failed(Combo),
}

pub struct ShortcutDispatcher<A> {
    bindings: HashMap<Combo, ShortcutBinding<A>>,
    policy: ShortcutPolicy,
    enabled: bool,
}

impl<A: fmt::Debug> ShortcutDispatcher<A> {
    pub fn new(policy: ShortcutPolicy) -> Self {
        Self {
            bindings: HashMap::new(),
            policy,
            enabled: true,
        }
    }

    /// Store a binding, replacing any previous binding for the same chord.
    pub fn register(
        &mut self,
        combo: Combo,
        action: A,
        description: impl Into<String>,
        category: ShortcutCategory,
    ) {
        self.insert(combo, Some(action), description.into(), category);
    }

    /// Claim a chord without an action so the browser default never fires.
    pub fn reserve(
        &mut self,
        combo: Combo,
        description: impl Into<String>,
        category: ShortcutCategory,
    ) {
        self.insert(combo, None, description.into(), category);
    }

    fn insert(
        &mut self,
        combo: Combo,
        action: Option<A>,
        description: String,
        category: ShortcutCategory,
    ) {
        let binding = ShortcutBinding {
            combo: combo.clone(),
            action,
            description,
            category,
            enabled: true,
        };
        if self.bindings.insert(combo.clone(), binding).is_some() {
            debug!(combo = %combo, "replaced shortcut binding");
        }
    }

    pub fn unregister(&mut self, combo: &Combo) -> Option<ShortcutBinding<A>> {
        self.bindings.remove(combo)
    }

    pub fn binding(&self, combo: &Combo) -> Option<&ShortcutBinding<A>> {
        self.bindings.get(combo)
    }

    pub fn bindings(&self) -> impl Iterator<Item = &ShortcutBinding<A>> {
        self.bindings.values()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns false when no binding exists for `combo`.
    pub fn set_binding_enabled(&mut self, combo: &Combo, enabled: bool) -> bool {
        match self.bindings.get_mut(combo) {
            Some(binding) => {
                binding.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn policy(&self) -> &ShortcutPolicy {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut ShortcutPolicy {
        &mut self.policy
    }

    /// Context gate: editable targets and open modals restrict which chords fire.
    pub fn is_executable(&self, event: &KeyEvent, modal_open: bool) -> bool {
        match resolve_combination(event) {
            Some(combo) => self.policy.permits(&combo, event.target, modal_open),
            None => false,
        }
    }

    pub fn dispatch<H: ShortcutHost<A>>(
        &self,
        event: &mut KeyEvent,
        host: &mut H,
    ) -> DispatchOutcome {
        if !self.enabled {
            return DispatchOutcome::Disabled;
        }
        let Some(combo) = resolve_combination(event) else {
            return DispatchOutcome::NoCombination;
        };
        let Some(binding) = self.bindings.get(&combo) else {
            trace!(combo = %combo, "no binding");
            return DispatchOutcome::Unbound(combo);
        };
        if !self.policy.permits(&combo, event.target, host.modal_open()) {
            debug!(combo = %combo, target = ?event.target, "shortcut suppressed by context");
            return DispatchOutcome::Blocked(combo);
        }
        if !binding.enabled {
            return DispatchOutcome::Inactive(combo);
        }

        event.prevent_default();
        event.stop_propagation();

        let Some(action) = &binding.action else {
            return DispatchOutcome::Handled(combo);
        };
        match host.perform(action) {
            Ok(()) => {
                debug!(combo = %combo, action = ?action, "shortcut handled");
                DispatchOutcome::Handled(combo)
            }
            Err(err) => {
                error!(combo = %combo, action = ?action, error = %err, "shortcut action failed");
                DispatchOutcome::Failed(combo)
            }
        }
    }

    /// Bindings grouped by category in panel order, each group sorted by chord.
    pub fn grouped(&self) -> Vec<(ShortcutCategory, Vec<&ShortcutBinding<A>>)> {
        ShortcutCategory::ALL
            .iter()
            .filter_map(|&category| {
                let mut group: Vec<_> = self
                    .bindings
                    .values()
                    .filter(|b| b.category == category)
                    .collect();
                if group.is_empty() {
                    return None;
                }
                group.sort_by(|a, b| a.combo.cmp(&b.combo));
                Some((category, group))
            })
            .collect()
    }
}

impl<A: fmt::Debug> Default for ShortcutDispatcher<A> {
    fn default() -> Self {
        Self::new(ShortcutPolicy::default())
    }
}

/// Overlay listing every binding. Clicking outside it closes it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelpPanel {
    open: bool,
}

impl HelpPanel {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn toggle(&mut self) -> bool {
        self.open = !self.open;
        self.open
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Returns true when the click closed the panel.
    pub fn handle_click(&mut self, inside_panel: bool) -> bool {
        if self.open && !inside_panel {
            self.open = false;
            return true;
        }
        false
    }

    /// Panel markup, or `None` while closed.
    pub fn render<A: fmt::Debug>(&self, dispatcher: &ShortcutDispatcher<A>) -> Option<String> {
        if !self.open {
            return None;
        }
        let mut out = String::from(
            "<div class=\"shortcuts-panel\" role=\"dialog\" aria-label=\"Keyboard shortcuts\">\n",
        );
        out.push_str("  <h2>Keyboard Shortcuts</h2>\n");
        for (category, bindings) in dispatcher.grouped() {
            out.push_str(&format!(
                "  <section class=\"shortcut-category\">\n    <h3>{}</h3>\n    <ul>\n",
                category.title()
            ));
            for binding in bindings {
                let class = if binding.enabled { "shortcut" } else { "shortcut disabled" };
                out.push_str(&format!(
                    "      <li class=\"{}\"><kbd>{}</kbd><span>{}</span></li>\n",
                    class,
                    escape(binding.combo.as_str()),
                    escape(&binding.description)
                ));
            }
            out.push_str("    </ul>\n  </section>\n");
        }
        out.push_str("</div>\n");
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::EventTarget;

    #[derive(Debug, Clone, PartialEq)]
    enum TestAction {
        Save,
        Boom,
    }

    #[derive(Default)]
    struct Host {
        modal: bool,
        performed: Vec<TestAction>,
    }

    impl ShortcutHost<TestAction> for Host {
        fn modal_open(&self) -> bool {
            self.modal
        }

        fn perform(&mut self, action: &TestAction) -> Result<(), ActionError> {
            self.performed.push(action.clone());
            match action {
                TestAction::Boom => Err(ActionError::Failed("boom".into())),
                _ => Ok(()),
            }
        }
    }

    fn combo(s: &str) -> Combo {
        Combo::parse(s).unwrap()
    }

    fn dispatcher() -> ShortcutDispatcher<TestAction> {
        let mut d = ShortcutDispatcher::default();
        d.register(combo("Ctrl+S"), TestAction::Save, "Save", ShortcutCategory::Invoice);
        d.register(combo("Ctrl+B"), TestAction::Boom, "Explode", ShortcutCategory::View);
        d.reserve(combo("Ctrl+K"), "Reserved", ShortcutCategory::Help);
        d
    }

    #[test]
    fn dispatch_invokes_and_suppresses() {
        let d = dispatcher();
        let mut host = Host::default();
        let mut event = KeyEvent::new("s").ctrl();
        assert_eq!(d.dispatch(&mut event, &mut host), DispatchOutcome::Handled(combo("Ctrl+S")));
        assert!(event.default_prevented());
        assert!(event.propagation_stopped());
        assert_eq!(host.performed, vec![TestAction::Save]);
    }

    #[test]
    fn last_registration_wins() {
        let mut d = dispatcher();
        d.register(combo("shift+ctrl+s"), TestAction::Boom, "Other", ShortcutCategory::View);
        d.register(combo("Ctrl+Shift+S"), TestAction::Save, "Save as", ShortcutCategory::Invoice);
        assert_eq!(d.len(), 4);
        let binding = d.binding(&combo("Ctrl+Shift+S")).unwrap();
        assert_eq!(binding.description, "Save as");
    }

    #[test]
    fn unregister_is_noop_when_missing() {
        let mut d = dispatcher();
        assert!(d.unregister(&combo("Ctrl+Q")).is_none());
        assert!(d.unregister(&combo("Ctrl+S")).is_some());
        assert!(d.binding(&combo("Ctrl+S")).is_none());
    }

    #[test]
    fn action_error_is_swallowed() {
        let d = dispatcher();
        let mut host = Host::default();
        let mut event = KeyEvent::new("b").ctrl();
        assert_eq!(d.dispatch(&mut event, &mut host), DispatchOutcome::Failed(combo("Ctrl+B")));
        assert!(event.default_prevented());
    }

    #[test]
    fn binding_without_action_still_prevents_default() {
        let d = dispatcher();
        let mut host = Host::default();
        let mut event = KeyEvent::new("k").ctrl();
        assert_eq!(d.dispatch(&mut event, &mut host), DispatchOutcome::Handled(combo("Ctrl+K")));
        assert!(event.default_prevented());
        assert!(host.performed.is_empty());
    }

    #[test]
    fn blocked_inside_inputs_and_modals() {
        let d = dispatcher();
        let mut host = Host::default();

        let mut in_input = KeyEvent::new("b").ctrl().on(EventTarget::TextInput);
        assert!(matches!(d.dispatch(&mut in_input, &mut host), DispatchOutcome::Blocked(_)));
        assert!(!in_input.default_prevented());

        host.modal = true;
        let mut save = KeyEvent::new("s").ctrl();
        assert!(matches!(d.dispatch(&mut save, &mut host), DispatchOutcome::Blocked(_)));
        assert!(host.performed.is_empty());
    }

    #[test]
    fn disabled_dispatcher_and_binding() {
        let mut d = dispatcher();
        let mut host = Host::default();
        assert!(d.set_binding_enabled(&combo("Ctrl+S"), false));
        let mut event = KeyEvent::new("s").ctrl();
        assert!(matches!(d.dispatch(&mut event, &mut host), DispatchOutcome::Inactive(_)));
        assert!(!event.default_prevented());

        d.set_enabled(false);
        let mut event = KeyEvent::new("b").ctrl();
        assert_eq!(d.dispatch(&mut event, &mut host), DispatchOutcome::Disabled);
        assert!(host.performed.is_empty());
    }

    #[test]
    fn is_executable_follows_target() {
        let d = dispatcher();
        assert!(!d.is_executable(&KeyEvent::new("a").on(EventTarget::TextInput), false));
        assert!(d.is_executable(&KeyEvent::new("a"), false));
        assert!(!d.is_executable(&KeyEvent::new("Shift").shift(), false));
    }

    #[test]
    fn panel_groups_and_sorts() {
        let mut d = dispatcher();
        d.register(combo("Ctrl+A"), TestAction::Save, "Apply", ShortcutCategory::Invoice);
        let groups = d.grouped();
        let order: Vec<_> = groups.iter().map(|(c, _)| *c).collect();
        assert_eq!(
            order,
            vec![ShortcutCategory::Invoice, ShortcutCategory::View, ShortcutCategory::Help]
        );
        let invoice: Vec<_> = groups[0].1.iter().map(|b| b.combo.as_str()).collect();
        assert_eq!(invoice, vec!["Ctrl+A", "Ctrl+S"]);
    }

    #[test]
    fn panel_toggle_and_outside_click() {
        let d = dispatcher();
        let mut panel = HelpPanel::default();
        assert!(panel.render(&d).is_none());
        assert!(panel.toggle());
        let markup = panel.render(&d).unwrap();
        assert!(markup.contains("<kbd>Ctrl+S</kbd>"));
        assert!(!panel.handle_click(true));
        assert!(panel.is_open());
        assert!(panel.handle_click(false));
        assert!(!panel.is_open());
    }
}
