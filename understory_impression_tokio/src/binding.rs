// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-element adapter between a UI node and its tracker.

use hashbrown::HashMap;
use kurbo::{Rect, Size};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::trace;
use understory_impression::GeometryOutcome;

use crate::ImpressionKey;
use crate::channel::{Impression, KeyListener};
use crate::error::TrackerError;
use crate::tracker::ImpressionTracker;

/// Connects one mounted element to an [`ImpressionTracker`].
///
/// The host creates a binding when the element mounts, forwards layout
/// results through [`update`](Self::update), and drops the binding when the
/// element unmounts. Dropping disposes the key, so an element that disappears
/// mid-dwell never fires.
///
/// The tracker is handed in explicitly; there is no ambient lookup.
///
/// Each key has one live binding. Binding a key that is already bound, as a
/// recycled list cell does, supersedes the old binding: dropping the old one
/// afterwards leaves the key's dwell alone.
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use kurbo::{Rect, Size};
/// use understory_impression::ManualClock;
/// use understory_impression_tokio::{ImpressionTracker, TrackerConfig};
///
/// # fn main() -> Result<(), understory_impression_tokio::TrackerError> {
/// let clock = Arc::new(ManualClock::new());
/// let tracker = ImpressionTracker::with_clock(TrackerConfig::default(), Arc::clone(&clock))?;
/// let viewport = Rect::new(0.0, 0.0, 400.0, 800.0);
///
/// let card = tracker.bind("card-3");
/// card.update(Size::new(100.0, 100.0), Rect::new(0.0, 0.0, 100.0, 100.0), viewport);
/// assert!(tracker.is_tracking(&"card-3"));
///
/// // Unmounted before the dwell completed.
/// drop(card);
/// assert!(!tracker.is_tracking(&"card-3"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ElementBinding<K: ImpressionKey> {
    tracker: ImpressionTracker<K>,
    key: K,
    generation: u64,
}

impl<K: ImpressionKey> ElementBinding<K> {
    pub(crate) fn new(tracker: ImpressionTracker<K>, key: K, generation: u64) -> Self {
        Self {
            tracker,
            key,
            generation,
        }
    }

    /// Returns the element's key.
    #[must_use]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Returns the tracker this element reports to.
    #[must_use]
    pub fn tracker(&self) -> &ImpressionTracker<K> {
        &self.tracker
    }

    /// Forwards a layout pass for this element.
    pub fn update(&self, size: Size, bounds: Rect, viewport: Rect) -> GeometryOutcome {
        self.tracker
            .on_geometry_update(self.key.clone(), size, bounds, viewport)
    }

    /// Returns `true` if this element's impression has fired.
    #[must_use]
    pub fn is_impressed(&self) -> bool {
        self.tracker.is_confirmed(&self.key)
    }

    /// Subscribes to this element's impression.
    #[must_use]
    pub fn listen(&self) -> KeyListener<K> {
        self.tracker.listen(self.key.clone())
    }

    /// Calls `callback` once when this element's impression fires.
    ///
    /// The subscription is made before this returns, so any impression
    /// confirmed afterwards is seen. An impression that already fired is not
    /// replayed. The listener task ends after the callback runs or when the
    /// tracker goes away; abort the returned handle to cancel it earlier.
    pub fn on_impression<F>(&self, callback: F) -> Result<JoinHandle<()>, TrackerError>
    where
        F: FnOnce(Impression<K>) + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| TrackerError::NoRuntime)?;
        let listener = self.listen();
        Ok(runtime.spawn(async move {
            if let Some(impression) = listener.wait().await {
                callback(impression);
            }
        }))
    }
}

impl<K: ImpressionKey> Drop for ElementBinding<K> {
    fn drop(&mut self) {
        if self.tracker.unbind(&self.key, self.generation) {
            self.tracker.on_dispose(&self.key);
        } else {
            trace!(key = ?self.key, "superseded binding dropped");
        }
    }
}

/// Newest binding generation per bound key.
#[derive(Debug)]
pub(crate) struct BindingTable<K> {
    live: HashMap<K, u64>,
    next: u64,
}

impl<K> Default for BindingTable<K> {
    fn default() -> Self {
        Self {
            live: HashMap::new(),
            next: 0,
        }
    }
}

impl<K: ImpressionKey> BindingTable<K> {
    pub(crate) fn bind(&mut self, key: K) -> u64 {
        let generation = self.next;
        self.next += 1;
        self.live.insert(key, generation);
        generation
    }

    pub(crate) fn unbind(&mut self, key: &K, generation: u64) -> bool {
        if self.live.get(key) == Some(&generation) {
            self.live.remove(key);
            true
        } else {
            false
        }
    }
}
