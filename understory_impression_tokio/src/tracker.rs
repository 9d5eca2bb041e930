// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared, lock-protected impression ledger with a lifecycle-bound sampler.

use std::fmt;
use std::ops::ControlFlow;
use std::sync::{Arc, Weak};
use std::time::Duration;

use kurbo::{Rect, Size};
use parking_lot::Mutex;
use tracing::{debug, info, trace};
use understory_impression::{
    Clock, GeometryOutcome, ImpressionLedger, LedgerDebugInfo, Tick, Visibility,
};

use crate::ImpressionKey;
use crate::binding::{BindingTable, ElementBinding};
use crate::channel::{Dispatcher, Impression, ImpressionStream, KeyListener};
use crate::clock::TokioClock;
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::sampler::SamplingTask;

/// Impression tracking for one scope, such as a screen or a list.
///
/// `ImpressionTracker` is a cheap, cloneable handle. All clones share one
/// [`ImpressionLedger`] behind a mutex, so geometry updates from layout
/// callbacks and ticks from the sampling loop never interleave.
///
/// The sampling loop is explicit: the host calls [`start`](Self::start) when
/// the scope becomes active and [`stop`](Self::stop) when it goes inactive
/// (or uses [`set_active`](Self::set_active) for both). Stopping keeps every
/// tracking and confirmed entry; only the periodic task pauses.
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
/// let tracker = ImpressionTracker::<u32>::with_clock(TrackerConfig::default(), Arc::clone(&clock))?;
/// let mut impressions = tracker.subscribe();
///
/// let viewport = Rect::new(0.0, 0.0, 400.0, 800.0);
/// tracker.on_geometry_update(1, Size::new(100.0, 100.0), Rect::new(0.0, 0.0, 100.0, 100.0), viewport);
///
/// clock.advance(Duration::from_secs(1));
/// tracker.tick();
/// assert_eq!(impressions.try_recv().map(|i| i.key), Some(1));
/// # Ok(())
/// # }
/// ```
pub struct ImpressionTracker<K: ImpressionKey> {
    shared: Arc<Shared<K>>,
}

struct Shared<K: ImpressionKey> {
    config: TrackerConfig,
    ledger: Mutex<ImpressionLedger<K>>,
    clock: Arc<dyn Clock + Send + Sync>,
    dispatcher: Dispatcher<K>,
    bindings: Mutex<BindingTable<K>>,
    sampler: Mutex<Option<SamplingTask>>,
}

impl<K: ImpressionKey> Shared<K> {
    /// One sampling step. Impressions are sent while the ledger is locked, so
    /// concurrent ticks cannot reorder them.
    fn sample(&self) -> Tick<K> {
        let mut ledger = self.ledger.lock();
        let tick = ledger.tick(self.clock.now());
        trace!(
            iteration = tick.iteration,
            tracking = ledger.tracking_len(),
            confirmed = tick.confirmed.len(),
            "impression tick"
        );
        for key in &tick.confirmed {
            debug!(?key, iteration = tick.iteration, "impression confirmed");
            self.dispatcher.dispatch(&Impression {
                key: key.clone(),
                iteration: tick.iteration,
            });
        }
        tick
    }
}

impl<K: ImpressionKey> ImpressionTracker<K> {
    /// Creates a tracker that reads time from a [`TokioClock`].
    pub fn new(config: TrackerConfig) -> Result<Self, TrackerError> {
        Self::with_clock(config, TokioClock::new())
    }

    /// Creates a tracker that reads time from `clock`.
    pub fn with_clock<C>(config: TrackerConfig, clock: C) -> Result<Self, TrackerError>
    where
        C: Clock + Send + Sync + 'static,
    {
        config.validate()?;
        Ok(Self::from_parts(config, Arc::new(clock)))
    }

    /// Builds a tracker from an already validated config.
    pub(crate) fn from_parts(config: TrackerConfig, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                ledger: Mutex::new(ImpressionLedger::new(config.impression)),
                clock,
                dispatcher: Dispatcher::new(),
                bindings: Mutex::new(BindingTable::default()),
                sampler: Mutex::new(None),
            }),
        }
    }

    /// Returns the tracker's configuration.
    #[must_use]
    pub fn config(&self) -> &TrackerConfig {
        &self.shared.config
    }

    // -------------------------------------------------------------------------
    // Element updates
    // -------------------------------------------------------------------------

    /// Records a layout pass for `key`. See
    /// [`ImpressionLedger::on_geometry_update`] for the rules.
    pub fn on_geometry_update(
        &self,
        key: K,
        size: Size,
        bounds: Rect,
        viewport: Rect,
    ) -> GeometryOutcome {
        let mut ledger = self.shared.ledger.lock();
        let now = self.shared.clock.now();
        let outcome = ledger.on_geometry_update(key, size, bounds, viewport, now);
        trace!(?outcome, "geometry update");
        outcome
    }

    /// Records a precomputed visibility for `key`.
    pub fn on_visibility(&self, key: K, visibility: Visibility) -> GeometryOutcome {
        let mut ledger = self.shared.ledger.lock();
        let now = self.shared.clock.now();
        ledger.on_visibility(key, visibility, now)
    }

    /// Stops tracking `key`, typically because its element unmounted.
    ///
    /// Returns `true` if the key was tracking. Confirmed impressions are kept.
    pub fn on_dispose(&self, key: &K) -> bool {
        let removed = self.shared.ledger.lock().dispose(key);
        trace!(?key, removed, "impression key disposed");
        removed
    }

    /// Clears all tracking and confirmed state, for example when the scope's
    /// content is replaced wholesale.
    pub fn reset(&self) {
        self.shared.ledger.lock().reset();
        self.shared.dispatcher.prune();
        debug!("impression ledger reset");
    }

    // -------------------------------------------------------------------------
    // Sampling
    // -------------------------------------------------------------------------

    /// Runs one sampling step now, independent of the periodic task.
    ///
    /// Confirmed keys are delivered to subscribers before this returns.
    pub fn tick(&self) -> Tick<K> {
        self.shared.sample()
    }

    /// Starts the periodic sampling task on the current Tokio runtime.
    ///
    /// The first tick runs immediately, then one per
    /// [`check_interval`](TrackerConfig::check_interval). Starting an active
    /// tracker does nothing. The task only holds a weak reference, so it ends
    /// once every tracker handle is dropped.
    pub fn start(&self) -> Result<(), TrackerError> {
        let mut sampler = self.shared.sampler.lock();
        if sampler.as_ref().is_some_and(|task| !task.is_finished()) {
            return Ok(());
        }
        let weak: Weak<Shared<K>> = Arc::downgrade(&self.shared);
        let task = SamplingTask::spawn(self.shared.config.check_interval, move || {
            match weak.upgrade() {
                Some(shared) => {
                    shared.sample();
                    ControlFlow::Continue(())
                }
                None => ControlFlow::Break(()),
            }
        })?;
        *sampler = Some(task);
        info!(
            check_interval = ?self.shared.config.check_interval,
            "impression sampling started"
        );
        Ok(())
    }

    /// Stops the periodic sampling task.
    ///
    /// Returns `true` if a task was running. Ledger state is kept, and a later
    /// [`start`](Self::start) continues the loop counter where it left off.
    pub fn stop(&self) -> bool {
        let Some(task) = self.shared.sampler.lock().take() else {
            return false;
        };
        let was_running = !task.is_finished();
        task.stop();
        if was_running {
            info!("impression sampling stopped");
        }
        was_running
    }

    /// Starts or stops sampling to follow the host scope's active state.
    pub fn set_active(&self, active: bool) -> Result<(), TrackerError> {
        if active {
            self.start()
        } else {
            self.stop();
            Ok(())
        }
    }

    /// Returns `true` while the periodic sampling task is running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.shared
            .sampler
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    // -------------------------------------------------------------------------
    // Notifications
    // -------------------------------------------------------------------------

    /// Subscribes to every impression emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> ImpressionStream<K> {
        self.shared.dispatcher.subscribe()
    }

    /// Subscribes to the impression of a single key.
    ///
    /// Delivery is indexed by key, so the listener fires no matter how many
    /// other keys are confirmed around it.
    #[must_use]
    pub fn listen(&self, key: K) -> KeyListener<K> {
        self.shared.dispatcher.listen(key)
    }

    /// Returns the number of live streams and key listeners.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.dispatcher.subscriber_count()
    }

    /// Creates a binding for one element, which disposes `key` when dropped.
    ///
    /// Binding a key again supersedes the earlier binding: only the newest
    /// binding for a key disposes it on drop.
    #[must_use]
    pub fn bind(&self, key: K) -> ElementBinding<K> {
        let generation = self.shared.bindings.lock().bind(key.clone());
        ElementBinding::new(self.clone(), key, generation)
    }

    /// Forgets a binding, returning `true` if it was the key's newest one.
    pub(crate) fn unbind(&self, key: &K, generation: u64) -> bool {
        self.shared.bindings.lock().unbind(key, generation)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Returns `true` if `key` is accumulating dwell time.
    #[must_use]
    pub fn is_tracking(&self, key: &K) -> bool {
        self.shared.ledger.lock().is_tracking(key)
    }

    /// Returns `true` if `key` already has an impression.
    #[must_use]
    pub fn is_confirmed(&self, key: &K) -> bool {
        self.shared.ledger.lock().is_confirmed(key)
    }

    /// Returns the loop counter of the tick that confirmed `key`.
    #[must_use]
    pub fn confirmed_at(&self, key: &K) -> Option<u64> {
        self.shared.ledger.lock().confirmed_at(key)
    }

    /// Returns the loop counter of the most recent tick.
    #[must_use]
    pub fn loop_counter(&self) -> Option<u64> {
        self.shared.ledger.lock().loop_counter()
    }

    /// Returns a snapshot of the ledger's counters.
    #[must_use]
    pub fn debug_info(&self) -> LedgerDebugInfo {
        self.shared.ledger.lock().debug_info()
    }

    /// Runs `f` with read access to the ledger.
    ///
    /// The ledger stays locked for the duration of `f`, which blocks both
    /// updates and ticks; keep it short.
    pub fn with_ledger<R>(&self, f: impl FnOnce(&ImpressionLedger<K>) -> R) -> R {
        f(&self.shared.ledger.lock())
    }

    /// Returns the check interval as configured.
    #[must_use]
    pub fn check_interval(&self) -> Duration {
        self.shared.config.check_interval
    }
}

impl<K: ImpressionKey> Clone for ImpressionTracker<K> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K: ImpressionKey> fmt::Debug for ImpressionTracker<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImpressionTracker")
            .field("config", &self.shared.config)
            .field("ledger", &self.debug_info())
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}
