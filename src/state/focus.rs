//! Focus System - Keyboard navigation and focus state
//!
//! Manages focus state and navigation for one mounted tree:
//! - the focusable registry, in registration (document) order
//! - focus cycling (`focus_next` / `focus_previous`, wrapping at both ends)
//! - focus history for restoration
//! - queued [`FocusChange`] notifications
//!
//! The manager never touches the node tree. Changes are queued and drained
//! by the instance, which hands them to focus listeners.
//!
//! # Example
//!
//! ```
//! use weft::state::FocusManager;
//! # use weft::{NodeKind, NodeTree, Style};
//! # let mut tree = NodeTree::new();
//! # let a = tree.create_node(NodeKind::Box, Style::new()).unwrap();
//! # let b = tree.create_node(NodeKind::Box, Style::new()).unwrap();
//!
//! let mut focus = FocusManager::new();
//! focus.register(a);
//! focus.register(b);
//!
//! assert!(focus.focus_next());
//! assert_eq!(focus.focused(), Some(a));
//! focus.focus_next();
//! focus.focus_next();
//! assert_eq!(focus.focused(), Some(a));
//! ```

use std::collections::VecDeque;

use tracing::trace;

use crate::engine::NodeId;

const MAX_HISTORY: usize = 10;

/// One transition of the focused node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusChange {
    pub previous: Option<NodeId>,
    pub current: Option<NodeId>,
}

#[derive(Debug)]
pub struct FocusManager {
    order: Vec<NodeId>,
    focused: Option<NodeId>,
    history: VecDeque<NodeId>,
    pending: Vec<FocusChange>,
    enabled: bool,
}

impl Default for FocusManager {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusManager {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            focused: None,
            history: VecDeque::with_capacity(MAX_HISTORY),
            pending: Vec::new(),
            enabled: true,
        }
    }

    // =========================================================================
    // Registry
    // =========================================================================

    /// Append `id` to the tab order. Registering twice is a no-op.
    pub fn register(&mut self, id: NodeId) {
        if !self.order.contains(&id) {
            self.order.push(id);
        }
    }

    /// Drop `id` from the tab order and history, blurring it if focused.
    pub fn unregister(&mut self, id: NodeId) {
        self.order.retain(|&n| n != id);
        self.history.retain(|&n| n != id);
        if self.focused == Some(id) {
            self.set_focus(None);
        }
    }

    pub fn is_registered(&self, id: NodeId) -> bool {
        self.order.contains(&id)
    }

    /// Focusable ids in tab order.
    pub fn focusables(&self) -> &[NodeId] {
        &self.order
    }

    // =========================================================================
    // State
    // =========================================================================

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    pub fn has_focus(&self) -> bool {
        self.focused.is_some()
    }

    pub fn is_focused(&self, id: NodeId) -> bool {
        self.focused == Some(id)
    }

    /// Re-enable navigation after [`disable`](Self::disable).
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Stop all focus movement. The current focus is kept.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Move focus to the next focusable, wrapping from last to first.
    pub fn focus_next(&mut self) -> bool {
        self.step(1)
    }

    /// Move focus to the previous focusable, wrapping from first to last.
    pub fn focus_previous(&mut self) -> bool {
        self.step(-1)
    }

    fn step(&mut self, direction: isize) -> bool {
        if !self.enabled || self.order.is_empty() {
            return false;
        }
        let len = self.order.len() as isize;
        let position = self
            .focused
            .and_then(|id| self.order.iter().position(|&n| n == id));
        let next = match position {
            None if direction > 0 => 0,
            None => len - 1,
            Some(pos) => (pos as isize + direction).rem_euclid(len),
        };
        let target = self.order[next as usize];
        if self.focused == Some(target) {
            return false;
        }
        self.save_history();
        self.set_focus(Some(target));
        true
    }

    /// Focus a registered node. Returns false for unknown ids or when
    /// navigation is disabled.
    pub fn focus(&mut self, id: NodeId) -> bool {
        if !self.enabled || !self.is_registered(id) {
            return false;
        }
        if self.focused != Some(id) {
            self.save_history();
            self.set_focus(Some(id));
        }
        true
    }

    /// Clear focus.
    pub fn blur(&mut self) {
        if self.focused.is_some() {
            self.save_history();
            self.set_focus(None);
        }
    }

    pub fn focus_first(&mut self) -> bool {
        match self.order.first() {
            Some(&id) => self.focus(id),
            None => false,
        }
    }

    pub fn focus_last(&mut self) -> bool {
        match self.order.last() {
            Some(&id) => self.focus(id),
            None => false,
        }
    }

    // =========================================================================
    // History
    // =========================================================================

    fn save_history(&mut self) {
        if let Some(current) = self.focused {
            self.history.push_back(current);
            if self.history.len() > MAX_HISTORY {
                self.history.pop_front();
            }
        }
    }

    /// Re-focus the most recently focused node that is still registered.
    pub fn restore_previous(&mut self) -> bool {
        if !self.enabled {
            return false;
        }
        while let Some(id) = self.history.pop_back() {
            if self.is_registered(id) && self.focused != Some(id) {
                self.set_focus(Some(id));
                return true;
            }
        }
        false
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    fn set_focus(&mut self, next: Option<NodeId>) {
        let previous = self.focused;
        if previous == next {
            return;
        }
        self.focused = next;
        trace!(?previous, current = ?next, "focus changed");
        self.pending.push(FocusChange {
            previous,
            current: next,
        });
    }

    /// Drain queued changes, oldest first.
    pub fn take_changes(&mut self) -> Vec<FocusChange> {
        std::mem::take(&mut self.pending)
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.pending.is_empty()
    }
}
