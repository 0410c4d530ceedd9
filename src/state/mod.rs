//! State Module - Per-instance interaction state
//!
//! - **Focus** - focusable registry, Tab cycling, history, change queue
//! - **Keyboard** - input subscriber registry and fan-out dispatch
//! - **Global keys** - Ctrl+C, Tab, Shift+Tab, Esc
//!
//! Nothing here is process-wide: every mounted instance owns its own.

mod focus;
mod global_keys;
mod keyboard;

pub use focus::{FocusChange, FocusManager};
pub use global_keys::{GlobalAction, GlobalKeys};
pub use keyboard::{InputDispatcher, Propagation, SubscribeOptions, SubscriptionId};
