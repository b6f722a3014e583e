//! Focus-order navigation over the live list of focusable elements.

use std::collections::HashSet;
use tracing::trace;

/// Ordered focusable element ids plus the one that currently has focus.
///
/// The list is replaced wholesale whenever the document changes; focus
/// survives a refresh only if the focused element is still present.
/// Repeated ids keep their first position only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FocusRing {
    elements: Vec<String>,
    active: Option<String>,
}

impl FocusRing {
    pub fn new<I, S>(elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            elements: distinct(elements),
            active: None,
        }
    }

    /// Recompute after a DOM mutation.
    pub fn refresh<I, S>(&mut self, elements: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.elements = distinct(elements);
        if let Some(active) = &self.active {
            if !self.elements.contains(active) {
                self.active = None;
            }
        }
        trace!(count = self.elements.len(), "focus ring refreshed");
    }

    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn current_index(&self) -> Option<usize> {
        let active = self.active.as_ref()?;
        self.elements.iter().position(|e| e == active)
    }

    /// Focus a specific element; false if it is not focusable.
    pub fn focus(&mut self, id: &str) -> bool {
        if self.elements.iter().any(|e| e == id) {
            self.active = Some(id.to_string());
            true
        } else {
            false
        }
    }

    pub fn focus_index(&mut self, index: usize) -> Option<&str> {
        let id = self.elements.get(index)?.clone();
        self.active = Some(id);
        self.active.as_deref()
    }

    pub fn blur(&mut self) {
        self.active = None;
    }

    pub fn focus_next(&mut self) -> Option<&str> {
        let len = self.elements.len();
        if len == 0 {
            return None;
        }
        let next = match self.current_index() {
            Some(i) => (i + 1) % len,
            None => 0,
        };
        self.focus_index(next)
    }

    pub fn focus_previous(&mut self) -> Option<&str> {
        let len = self.elements.len();
        if len == 0 {
            return None;
        }
        let previous = match self.current_index() {
            Some(i) => (i + len - 1) % len,
            None => len - 1,
        };
        self.focus_index(previous)
    }
}

fn distinct<I, S>(elements: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    elements
        .into_iter()
        .map(Into::into)
        .filter(|id: &String| seen.insert(id.clone()))
        .collect()
}
