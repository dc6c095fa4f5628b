//! Token-guarded publish/subscribe.
//!
//! Observers are held weakly: subscribing never keeps an observer alive, and
//! an observer that has been dropped is skipped (and pruned) on the next
//! notification.
//!
//! Every notification round carries a [`Token`]. While an [`Observable`] is
//! notifying, it remembers its own token. A receiver that reacts to an update
//! by changing itself forwards the *received* token with
//! [`Observable::notify_with`], so when the echo comes back to the originator
//! it can recognize it with [`Observable::is_echo`] and stop the cycle.

use crate::shapes::{ShapeColor, SharedShape};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Weak;
use uuid::Uuid;

/// Identifier of one notification round.
pub type Token = Uuid;

/// Snapshot of an entity's observable state, sent along with its changes.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityState {
    /// Display name, e.g. `"Circle 3"`.
    pub name: String,
    /// Activation (selection) flag.
    pub active: bool,
    /// The entity's own color, independent of the selection highlight.
    pub color: ShapeColor,
}

/// Payload of a notification.
#[derive(Debug, Clone)]
pub enum Change {
    /// An entity's geometry, color or activation changed.
    State(EntityState),
    /// A group gained a child.
    NewChild(EntityState, SharedShape),
    /// The entity is being destroyed.
    Removed,
    /// A tree node's check state was changed by the user.
    CheckState(bool),
}

/// Receiver side of the protocol.
pub trait Observer {
    fn update(&self, token: Token, change: &Change);
}

/// Sender side of the protocol.
#[derive(Default)]
pub struct Observable {
    observers: RefCell<Vec<Weak<dyn Observer>>>,
    token: Cell<Option<Token>>,
}

impl Observable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer. Subscribing the same observer twice has no effect.
    pub fn subscribe(&self, observer: Weak<dyn Observer>) {
        let mut observers = self.observers.borrow_mut();
        if !observers.iter().any(|o| Weak::ptr_eq(o, &observer)) {
            observers.push(observer);
        }
    }

    /// Remove an observer. No-op if it was never subscribed.
    pub fn unsubscribe(&self, observer: &Weak<dyn Observer>) {
        self.observers
            .borrow_mut()
            .retain(|o| !Weak::ptr_eq(o, observer));
    }

    /// Number of observers that are still alive.
    pub fn observer_count(&self) -> usize {
        self.observers
            .borrow()
            .iter()
            .filter(|o| o.strong_count() > 0)
            .count()
    }

    /// The token of the notification round currently in flight, if any.
    pub fn current_token(&self) -> Option<Token> {
        self.token.get()
    }

    /// Whether `token` belongs to a round this observable started.
    pub fn is_echo(&self, token: Token) -> bool {
        self.token.get() == Some(token)
    }

    /// Start a fresh notification round.
    pub fn notify(&self, change: Change) -> Token {
        let token = Uuid::new_v4();
        self.notify_with(token, change);
        token
    }

    /// Notify observers as part of an existing round identified by `token`.
    pub fn notify_with(&self, token: Token, change: Change) {
        // Collect strong handles first so observers may (un)subscribe while
        // being notified.
        let targets: Vec<_> = {
            let mut observers = self.observers.borrow_mut();
            observers.retain(|o| o.strong_count() > 0);
            observers.iter().filter_map(Weak::upgrade).collect()
        };
        if targets.is_empty() {
            return;
        }

        let previous = self.token.replace(Some(token));
        for observer in targets {
            observer.update(token, &change);
        }
        self.token.set(previous);
    }
}

impl fmt::Debug for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("observers", &format!("<{} observers>", self.observer_count()))
            .field("token", &self.token.get())
            .finish()
    }
}
