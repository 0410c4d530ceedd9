//! Global Keys Module - Built-in keyboard shortcuts
//!
//! Runs before any subscriber sees a key:
//! - Ctrl+C: exit (consumed)
//! - Tab: focus next component (consumed)
//! - Shift+Tab: focus previous component (consumed)
//! - Esc: blur the focused component (still delivered)
//!
//! Focus keys only apply while a focusable is registered and navigation is
//! enabled; otherwise the key falls through to subscribers.

use super::focus::FocusManager;
use crate::input::Key;

/// Outcome of running a key through the global shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalAction {
    /// Tear the instance down.
    Exit,
    /// Swallowed; subscribers never see it.
    Consumed,
    /// Deliver to subscribers as usual.
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalKeys {
    pub exit_on_ctrl_c: bool,
    pub focus_navigation: bool,
}

impl Default for GlobalKeys {
    fn default() -> Self {
        Self {
            exit_on_ctrl_c: true,
            focus_navigation: true,
        }
    }
}

impl GlobalKeys {
    pub fn handle(&self, key: &Key, focus: &mut FocusManager) -> GlobalAction {
        if self.exit_on_ctrl_c && key.is_ctrl('c') {
            return GlobalAction::Exit;
        }
        if !self.focus_navigation || !focus.is_enabled() {
            return GlobalAction::Continue;
        }

        if key.tab && !key.ctrl && !key.meta {
            if focus.focusables().is_empty() {
                return GlobalAction::Continue;
            }
            if key.shift {
                focus.focus_previous();
            } else {
                focus.focus_next();
            }
            return GlobalAction::Consumed;
        }

        if key.escape && !key.meta {
            focus.blur();
        }
        GlobalAction::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NodeId;

    fn focus_with(n: u64) -> FocusManager {
        let mut focus = FocusManager::new();
        for i in 1..=n {
            focus.register(NodeId(i));
        }
        focus
    }

    #[test]
    fn test_ctrl_c_exits() {
        let mut focus = focus_with(0);
        let keys = GlobalKeys::default();
        assert_eq!(keys.handle(&Key::ctrl('c'), &mut focus), GlobalAction::Exit);
        assert_eq!(keys.handle(&Key::char('c'), &mut focus), GlobalAction::Continue);
    }

    #[test]
    fn test_ctrl_c_passes_through_when_disabled() {
        let mut focus = focus_with(0);
        let keys = GlobalKeys {
            exit_on_ctrl_c: false,
            ..GlobalKeys::default()
        };
        assert_eq!(keys.handle(&Key::ctrl('c'), &mut focus), GlobalAction::Continue);
    }

    #[test]
    fn test_tab_and_shift_tab_cycle() {
        let mut focus = focus_with(2);
        let keys = GlobalKeys::default();

        assert_eq!(keys.handle(&Key::tab(), &mut focus), GlobalAction::Consumed);
        assert_eq!(focus.focused(), Some(NodeId(1)));
        keys.handle(&Key::tab(), &mut focus);
        assert_eq!(focus.focused(), Some(NodeId(2)));

        let shift_tab = Key {
            shift: true,
            ..Key::tab()
        };
        keys.handle(&shift_tab, &mut focus);
        assert_eq!(focus.focused(), Some(NodeId(1)));
    }

    #[test]
    fn test_tab_without_focusables_falls_through() {
        let mut focus = focus_with(0);
        assert_eq!(
            GlobalKeys::default().handle(&Key::tab(), &mut focus),
            GlobalAction::Continue
        );
    }

    #[test]
    fn test_escape_blurs_and_continues() {
        let mut focus = focus_with(1);
        focus.focus_first();
        assert_eq!(
            GlobalKeys::default().handle(&Key::escape(), &mut focus),
            GlobalAction::Continue
        );
        assert_eq!(focus.focused(), None);
    }

    #[test]
    fn test_navigation_off() {
        let mut focus = focus_with(2);
        let keys = GlobalKeys {
            focus_navigation: false,
            ..GlobalKeys::default()
        };
        assert_eq!(keys.handle(&Key::tab(), &mut focus), GlobalAction::Continue);
        assert_eq!(focus.focused(), None);
    }
}
