//! Synchronous observer plumbing.
//!
//! A [`Notifier`] owns a list of callbacks and invokes them inline,
//! on the caller's stack, whenever [`notify`](Notifier::notify) runs.
//! There is no queue and no thread: by the time a mutating call
//! returns, every subscriber has already observed the change.
//!
//! Subscribers are cancelled through the [`Subscription`] handle rather
//! than by re-entering the notifier, so a component can unhook itself
//! during teardown without borrowing the notifier's owner.

use alloc::{boxed::Box, rc::Rc, vec::Vec};
use core::cell::Cell;

/// Handle for one registered callback.
///
/// Cancellation is explicit: dropping the handle leaves the callback
/// installed. After [`cancel`](Self::cancel) the callback is skipped and
/// removed on the next dispatch.
#[derive(Debug)]
pub struct Subscription {
    alive: Rc<Cell<bool>>,
}

impl Subscription {
    /// Stops future deliveries to this callback.
    pub fn cancel(&self) {
        self.alive.set(false);
    }

    /// True until [`cancel`](Self::cancel) is called.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.alive.get()
    }
}

type Callback<E> = Box<dyn FnMut(&E)>;

/// Owner side of the observer relationship.
pub struct Notifier<E> {
    subscribers: Vec<(Rc<Cell<bool>>, Callback<E>)>,
}

impl<E> Notifier<E> {
    /// Creates a notifier with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    /// Registers `callback` and returns its cancellation handle.
    pub fn subscribe(&mut self, callback: impl FnMut(&E) + 'static) -> Subscription {
        let alive = Rc::new(Cell::new(true));
        self.subscribers.push((Rc::clone(&alive), Box::new(callback)));
        Subscription { alive }
    }

    /// Delivers `event` to every live subscriber, in subscription order.
    ///
    /// Cancelled entries are pruned as they are encountered. A callback
    /// that cancels its own subscription still completes the current
    /// delivery and is dropped on the next one.
    pub fn notify(&mut self, event: &E) {
        self.subscribers.retain_mut(|(alive, callback)| {
            if !alive.get() {
                return false;
            }
            callback(event);
            true
        });
    }

    /// Number of entries still registered, cancelled or not.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<E> Default for Notifier<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> core::fmt::Debug for Notifier<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Notifier")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
