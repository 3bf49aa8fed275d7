//! Scoped subscriptions.
//!
//! Registering a handler returns a [`Subscription`]. Dropping it removes the
//! handler before the next notification; nothing relies on the handle's owner
//! being collected or remembering to call an unsubscribe method.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

trait Unsubscribe: Send + Sync {
    fn unsubscribe(&self, id: u64);
}

/// Handlers registered for one kind of notification.
pub(crate) struct Subscribers<T> {
    inner: Mutex<Registry<T>>,
}

struct Registry<T> {
    next_id: u64,
    handlers: Vec<(u64, Handler<T>)>,
}

impl<T: 'static> Subscribers<T> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self { inner: Mutex::new(Registry { next_id: 0, handlers: Vec::new() }) })
    }

    pub(crate) fn subscribe(
        self: &Arc<Self>,
        handler: impl Fn(&T) + Send + Sync + 'static,
    ) -> Subscription {
        let mut registry = self.inner.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.handlers.push((id, Arc::new(handler)));

        let weak: Weak<Self> = Arc::downgrade(self);
        Subscription { id, registry: weak }
    }

    /// Call every handler with `value`, in registration order.
    ///
    /// Handlers run without the registry lock held, so they may subscribe or
    /// drop subscriptions themselves. A handler removed during this call is
    /// not called.
    pub(crate) fn notify(&self, value: &T) {
        let handlers: Vec<(u64, Handler<T>)> = self.inner.lock().handlers.clone();
        for (id, handler) in handlers {
            if self.is_registered(id) {
                handler(value);
            }
        }
    }

    /// Remove every handler.
    pub(crate) fn clear(&self) {
        self.inner.lock().handlers.clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().handlers.len()
    }

    fn is_registered(&self, id: u64) -> bool {
        self.inner.lock().handlers.iter().any(|(h, _)| *h == id)
    }
}

impl<T: 'static> Unsubscribe for Subscribers<T> {
    fn unsubscribe(&self, id: u64) {
        self.inner.lock().handlers.retain(|(h, _)| *h != id);
    }
}

/// Keeps a handler registered. Dropping it unregisters the handler.
#[must_use = "dropping a Subscription unregisters its handler immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<dyn Unsubscribe>,
}

impl Subscription {
    /// Unregister the handler now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish_non_exhaustive()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unsubscribe(self.id);
        }
    }
}
