// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scope-keyed tracker registry.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;
use tracing::debug;
use understory_impression::Clock;

use crate::ImpressionKey;
use crate::clock::TokioClock;
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::tracker::ImpressionTracker;

/// Hands out one [`ImpressionTracker`] per caller-defined scope.
///
/// A scope is whatever owns a set of impressions: a screen, a tab, a list
/// instance. Elements in the same scope must share a tracker so their
/// impressions are deduplicated together; elements in different scopes are
/// fully independent. Hosts pass the registry (or the tracker it returns) down
/// their UI tree explicitly.
///
/// All trackers created by one registry share its config and clock.
///
/// ```rust
/// use understory_impression_tokio::{TrackerConfig, TrackerRegistry};
///
/// # fn main() -> Result<(), understory_impression_tokio::TrackerError> {
/// let registry = TrackerRegistry::<&str, u64>::new(TrackerConfig::default())?;
///
/// let home = registry.scope("home");
/// let search = registry.scope("search");
/// assert_eq!(registry.len(), 2);
///
/// // Asking again returns a handle to the same tracker.
/// registry.scope("home").reset();
/// assert_eq!(home.loop_counter(), None);
/// assert!(registry.get(&"home").is_some());
/// assert!(registry.remove(&"search").is_some());
/// # drop(search);
/// # Ok(())
/// # }
/// ```
pub struct TrackerRegistry<S, K: ImpressionKey> {
    config: TrackerConfig,
    clock: Arc<dyn Clock + Send + Sync>,
    scopes: Mutex<HashMap<S, ImpressionTracker<K>>>,
}

impl<S, K> TrackerRegistry<S, K>
where
    S: Clone + Eq + Hash,
    K: ImpressionKey,
{
    /// Creates a registry whose trackers read time from a [`TokioClock`].
    pub fn new(config: TrackerConfig) -> Result<Self, TrackerError> {
        Self::with_clock(config, TokioClock::new())
    }

    /// Creates a registry whose trackers all read `clock`.
    pub fn with_clock<C>(config: TrackerConfig, clock: C) -> Result<Self, TrackerError>
    where
        C: Clock + Send + Sync + 'static,
    {
        config.validate()?;
        Ok(Self {
            config,
            clock: Arc::new(clock),
            scopes: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the tracker for `scope`, creating it on first use.
    ///
    /// New trackers start inactive; call [`ImpressionTracker::start`] when the
    /// scope becomes visible.
    pub fn scope(&self, scope: S) -> ImpressionTracker<K> {
        self.scopes
            .lock()
            .entry(scope)
            .or_insert_with(|| {
                debug!("impression scope created");
                ImpressionTracker::from_parts(self.config, Arc::clone(&self.clock))
            })
            .clone()
    }

    /// Returns the tracker for `scope` if it exists.
    #[must_use]
    pub fn get(&self, scope: &S) -> Option<ImpressionTracker<K>> {
        self.scopes.lock().get(scope).cloned()
    }

    /// Removes `scope` and stops its sampling task.
    ///
    /// Outstanding handles to the tracker stay usable, but the registry will
    /// create a fresh tracker for the scope on the next [`scope`](Self::scope).
    pub fn remove(&self, scope: &S) -> Option<ImpressionTracker<K>> {
        let tracker = self.scopes.lock().remove(scope)?;
        tracker.stop();
        debug!("impression scope removed");
        Some(tracker)
    }

    /// Starts or stops sampling for every scope, for example when the whole
    /// application moves between foreground and background.
    ///
    /// Starting is all or nothing. If a scope fails to start, the scopes this
    /// call started are stopped again before the error is returned; scopes
    /// that were already running keep running.
    pub fn set_all_active(&self, active: bool) -> Result<(), TrackerError> {
        let trackers: Vec<_> = self.scopes.lock().values().cloned().collect();
        if !active {
            for tracker in &trackers {
                tracker.stop();
            }
            return Ok(());
        }
        let mut started: Vec<ImpressionTracker<K>> = Vec::new();
        for tracker in trackers {
            if tracker.is_active() {
                continue;
            }
            if let Err(err) = tracker.start() {
                for tracker in &started {
                    tracker.stop();
                }
                debug!(
                    rolled_back = started.len(),
                    "impression scopes failed to start"
                );
                return Err(err);
            }
            started.push(tracker);
        }
        Ok(())
    }

    /// Returns the number of scopes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scopes.lock().len()
    }

    /// Returns `true` if no scope has been created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scopes.lock().is_empty()
    }
}

impl<S, K: ImpressionKey> fmt::Debug for TrackerRegistry<S, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerRegistry")
            .field("config", &self.config)
            .field("scopes", &self.scopes.lock().len())
            .finish_non_exhaustive()
    }
}
