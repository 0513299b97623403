// Copyright (c) 2026 minewatch contributors
// Licensed under the MIT License. See LICENSE file in the project root.

//! Ordered observer lists

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::error;

/// Handle returned by a subscription, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

impl SubscriptionId {
    /// Unique across every observer list in the process
    fn next() -> Self {
        Self(NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed))
    }
}

/// Handlers in registration order
pub(crate) struct ObserverList<F: ?Sized> {
    label: &'static str,
    entries: Vec<(SubscriptionId, Arc<F>)>,
}

impl<F: ?Sized> ObserverList<F> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            entries: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, handler: Arc<F>) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.entries.push((id, handler));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Handlers to call; taken so state can be released before invoking them
    pub fn snapshot(&self) -> Dispatch<F> {
        Dispatch {
            label: self.label,
            handlers: self.entries.iter().map(|(_, h)| Arc::clone(h)).collect(),
        }
    }
}

/// A frozen set of handlers ready to be invoked
pub(crate) struct Dispatch<F: ?Sized> {
    label: &'static str,
    handlers: Vec<Arc<F>>,
}

impl<F: ?Sized> Dispatch<F> {
    /// Call every handler in order. A panicking handler is logged and
    /// skipped; the rest still run.
    pub fn each(&self, mut call: impl FnMut(&F)) {
        for (index, handler) in self.handlers.iter().enumerate() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| call(&**handler)));
            if let Err(payload) = outcome {
                error!(
                    "{} subscriber #{} panicked: {}",
                    self.label,
                    index,
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
