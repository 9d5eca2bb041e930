// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Delivery of confirmed impressions.
//!
//! Two kinds of subscription exist. Per-key listeners are indexed by key and
//! woken directly when that key is confirmed, so dispatch costs O(listeners of
//! that key). Streams see every impression; each has its own unbounded queue,
//! so a slow reader delays only itself and never loses an impression.

use hashbrown::HashMap;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

use crate::ImpressionKey;

/// A confirmed impression, as delivered to subscribers.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Impression<K> {
    /// The element's key.
    pub key: K,
    /// Loop counter of the tick that confirmed it.
    pub iteration: u64,
}

/// Receives every impression emitted after it was created.
///
/// There is no replay: impressions emitted before [`subscribe`] was called are
/// never seen. Impressions queue until read, so a stream that is never read
/// holds on to every impression of its tracker. Dropping the stream
/// unsubscribes.
///
/// [`subscribe`]: crate::ImpressionTracker::subscribe
#[derive(Debug)]
pub struct ImpressionStream<K> {
    rx: mpsc::UnboundedReceiver<Impression<K>>,
}

impl<K: ImpressionKey> ImpressionStream<K> {
    /// Waits for the next impression.
    ///
    /// Returns `None` once every handle to the tracker has been dropped and
    /// the queued impressions have been read.
    pub async fn recv(&mut self) -> Option<Impression<K>> {
        self.rx.recv().await
    }

    /// Returns the next impression if one is already queued.
    pub fn try_recv(&mut self) -> Option<Impression<K>> {
        self.rx.try_recv().ok()
    }
}

/// Waits for the impression of one key.
///
/// Created by [`ImpressionTracker::listen`](crate::ImpressionTracker::listen).
/// The listener fires at most once; an impression confirmed before it was
/// created is not replayed.
#[derive(Debug)]
pub struct KeyListener<K> {
    key: K,
    rx: oneshot::Receiver<Impression<K>>,
}

impl<K: ImpressionKey> KeyListener<K> {
    /// Returns the key being listened for.
    #[must_use]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Waits for this key's impression.
    ///
    /// Returns `None` if the tracker goes away first.
    pub async fn wait(self) -> Option<Impression<K>> {
        self.rx.await.ok()
    }

    /// Returns this key's impression if it has already fired.
    pub fn try_take(&mut self) -> Option<Impression<K>> {
        self.rx.try_recv().ok()
    }
}

/// Subscription tables for one tracker.
pub(crate) struct Dispatcher<K> {
    listeners: Mutex<HashMap<K, Vec<oneshot::Sender<Impression<K>>>>>,
    streams: Mutex<Vec<mpsc::UnboundedSender<Impression<K>>>>,
}

impl<K: ImpressionKey> Dispatcher<K> {
    pub(crate) fn new() -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
            streams: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn subscribe(&self) -> ImpressionStream<K> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut streams = self.streams.lock();
        streams.retain(|tx| !tx.is_closed());
        streams.push(tx);
        ImpressionStream { rx }
    }

    pub(crate) fn listen(&self, key: K) -> KeyListener<K> {
        let (tx, rx) = oneshot::channel();
        let mut listeners = self.listeners.lock();
        let waiting = listeners.entry(key.clone()).or_default();
        waiting.retain(|tx| !tx.is_closed());
        waiting.push(tx);
        KeyListener { key, rx }
    }

    /// Delivers one impression to the key's listeners and to every stream.
    pub(crate) fn dispatch(&self, impression: &Impression<K>) {
        if let Some(waiting) = self.listeners.lock().remove(&impression.key) {
            for tx in waiting {
                // The listener may have been dropped.
                let _ = tx.send(impression.clone());
            }
        }
        let mut streams = self.streams.lock();
        let before = streams.len();
        streams.retain(|tx| tx.send(impression.clone()).is_ok());
        if streams.len() != before {
            trace!(
                dropped = before - streams.len(),
                "impression streams closed"
            );
        }
    }

    /// Drops listeners that can no longer fire, for example after a reset.
    pub(crate) fn prune(&self) {
        self.listeners.lock().retain(|_, waiting| {
            waiting.retain(|tx| !tx.is_closed());
            !waiting.is_empty()
        });
        self.streams.lock().retain(|tx| !tx.is_closed());
    }

    /// Counts live listeners and streams.
    pub(crate) fn subscriber_count(&self) -> usize {
        let listeners: usize = self
            .listeners
            .lock()
            .values()
            .map(|waiting| waiting.iter().filter(|tx| !tx.is_closed()).count())
            .sum();
        let streams = self
            .streams
            .lock()
            .iter()
            .filter(|tx| !tx.is_closed())
            .count();
        listeners + streams
    }
}
