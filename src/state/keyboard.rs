//! Keyboard Module - Input subscriber registry
//!
//! Fans decoded [`InputEvent`]s out to subscribers in subscription order.
//! Does NOT own stdin (that is [`crate::input::StdinReader`]).
//! Does NOT handle global shortcuts (that is [`super::global_keys`]).
//!
//! Every active subscriber sees every event unless an earlier one returns
//! [`Propagation::Handled`]. Inactive subscribers keep their place in the
//! order and are skipped.
//!
//! # Example
//!
//! ```
//! use weft::input::{InputEvent, Key};
//! use weft::state::{InputDispatcher, Propagation, SubscribeOptions};
//!
//! let mut dispatcher: InputDispatcher<Vec<String>> = InputDispatcher::new();
//! dispatcher.subscribe(
//!     |event: &InputEvent, log: &mut Vec<String>| {
//!         log.push(format!("{event:?}"));
//!     },
//!     SubscribeOptions::default(),
//! );
//!
//! let mut log = Vec::new();
//! let result = dispatcher.dispatch(&InputEvent::Key(Key::char('a')), &mut log);
//! assert_eq!(result, Propagation::Continue);
//! assert_eq!(log.len(), 1);
//! ```

use std::fmt;

use crate::input::InputEvent;

/// What a handler did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    /// Stop: later subscribers do not see the event.
    Handled,
    #[default]
    Continue,
}

impl From<()> for Propagation {
    fn from(_: ()) -> Self {
        Propagation::Continue
    }
}

/// `true` means handled.
impl From<bool> for Propagation {
    fn from(handled: bool) -> Self {
        if handled {
            Propagation::Handled
        } else {
            Propagation::Continue
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeOptions {
    pub is_active: bool,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self { is_active: true }
    }
}

impl SubscribeOptions {
    pub fn inactive() -> Self {
        Self { is_active: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Handler<C> = Box<dyn FnMut(&InputEvent, &mut C) -> Propagation>;

struct Subscription<C> {
    id: SubscriptionId,
    active: bool,
    handler: Handler<C>,
}

/// Subscriber registry. `C` is the context handed to every handler.
pub struct InputDispatcher<C> {
    subscriptions: Vec<Subscription<C>>,
    next_id: u64,
}

impl<C> Default for InputDispatcher<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for InputDispatcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputDispatcher")
            .field("subscriptions", &self.subscriptions.len())
            .field("active", &self.active_count())
            .finish()
    }
}

impl<C> InputDispatcher<C> {
    pub fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
            next_id: 0,
        }
    }

    /// Add a subscriber at the end of the order.
    ///
    /// Handlers may return `()` (continue), a `bool` (true = handled) or a
    /// [`Propagation`].
    pub fn subscribe<F, R>(&mut self, mut handler: F, options: SubscribeOptions) -> SubscriptionId
    where
        F: FnMut(&InputEvent, &mut C) -> R + 'static,
        R: Into<Propagation>,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id,
            active: options.is_active,
            handler: Box::new(move |event, ctx| handler(event, ctx).into()),
        });
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    /// Returns false if `id` was not subscribed.
    pub fn set_active(&mut self, id: SubscriptionId, active: bool) -> bool {
        match self.subscriptions.iter_mut().find(|s| s.id == id) {
            Some(sub) => {
                sub.active = active;
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, id: SubscriptionId) -> bool {
        self.subscriptions.iter().any(|s| s.id == id && s.active)
    }

    pub fn active_count(&self) -> usize {
        self.subscriptions.iter().filter(|s| s.active).count()
    }

    pub fn has_active(&self) -> bool {
        self.subscriptions.iter().any(|s| s.active)
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Drop every subscriber.
    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }

    /// Deliver `event` to active subscribers in order. Returns
    /// [`Propagation::Handled`] if one of them stopped it.
    pub fn dispatch(&mut self, event: &InputEvent, ctx: &mut C) -> Propagation {
        for sub in self.subscriptions.iter_mut().filter(|s| s.active) {
            if (sub.handler)(event, ctx) == Propagation::Handled {
                return Propagation::Handled;
            }
        }
        Propagation::Continue
    }
}
