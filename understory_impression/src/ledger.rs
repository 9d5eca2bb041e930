// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Impression ledger: tracking and confirmed sets plus the tick step.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::hash::Hash;
use core::time::Duration;

use hashbrown::HashMap;
use kurbo::{Rect, Size};

use crate::config::{ImpressionConfig, ScanPolicy};
use crate::geometry::{Visibility, visible_ratio};

/// What a geometry update did to the ledger.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GeometryOutcome {
    /// The key already has an impression; the update was ignored.
    AlreadyConfirmed,
    /// The key qualified and started tracking at the update's time.
    Started,
    /// The key qualified and was already tracking; its start time is unchanged.
    Continued,
    /// The key did not qualify (hidden or below the ratio threshold) and any
    /// tracking entry for it was removed.
    Disposed,
}

/// The result of one [`ImpressionLedger::tick`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tick<K> {
    /// The loop counter value assigned to this tick.
    pub iteration: u64,
    /// Keys promoted to the confirmed set, in promotion order.
    pub confirmed: Vec<K>,
}

#[derive(Copy, Clone, Debug)]
struct TrackingEntry {
    started_at: Duration,
    seq: u64,
}

/// Per-key impression state for one scope.
///
/// The ledger holds two disjoint sets:
///
/// - **tracking**: keys that have been continuously visible enough since a
///   recorded start time, in the order they started;
/// - **confirmed**: keys whose impression has fired, tagged with the loop
///   counter of the tick that confirmed them.
///
/// A key moves `unseen → tracking → confirmed`. Losing visibility or an
/// explicit [`dispose`](Self::dispose) before confirmation returns it to
/// unseen, and a later qualifying update starts a fresh dwell. Confirmation is
/// terminal: further updates for the key are ignored until [`reset`](Self::reset).
///
/// Time is passed in by the caller as a reading from a
/// [`Clock`](crate::Clock), which keeps the ledger free of any runtime.
///
/// ```rust
/// use core::time::Duration;
/// use kurbo::{Rect, Size};
/// use understory_impression::{GeometryOutcome, ImpressionConfig, ImpressionLedger};
///
/// let viewport = Rect::new(0.0, 0.0, 400.0, 800.0);
/// let mut ledger = ImpressionLedger::new(ImpressionConfig::default());
///
/// let outcome = ledger.on_geometry_update(
///     "card-1",
///     Size::new(100.0, 100.0),
///     Rect::new(0.0, 0.0, 100.0, 100.0),
///     viewport,
///     Duration::ZERO,
/// );
/// assert_eq!(outcome, GeometryOutcome::Started);
///
/// // Not due yet.
/// assert!(ledger.tick(Duration::from_millis(400)).confirmed.is_empty());
///
/// // Dwell elapsed.
/// let tick = ledger.tick(Duration::from_millis(1000));
/// assert_eq!(tick.confirmed, vec!["card-1"]);
/// assert_eq!(ledger.confirmed_at(&"card-1"), Some(1));
/// ```
#[derive(Clone, Debug)]
pub struct ImpressionLedger<K>
where
    K: Clone + Eq + Hash,
{
    config: ImpressionConfig,
    tracking: HashMap<K, TrackingEntry>,
    /// Tracking keys by start sequence, giving insertion order.
    order: BTreeMap<u64, K>,
    next_seq: u64,
    confirmed: HashMap<K, u64>,
    loop_counter: Option<u64>,
}

impl<K> Default for ImpressionLedger<K>
where
    K: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new(ImpressionConfig::default())
    }
}

impl<K> ImpressionLedger<K>
where
    K: Clone + Eq + Hash,
{
    /// Creates an empty ledger.
    ///
    /// The config is used as given; call [`ImpressionConfig::validate`] first
    /// if it comes from an untrusted source.
    #[must_use]
    pub fn new(config: ImpressionConfig) -> Self {
        Self {
            config,
            tracking: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
            confirmed: HashMap::new(),
            loop_counter: None,
        }
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &ImpressionConfig {
        &self.config
    }

    /// Feeds one layout pass worth of geometry for `key`.
    ///
    /// - Confirmed keys are ignored.
    /// - A hidden element, or one whose visible ratio is below the configured
    ///   threshold, is disposed.
    /// - A qualifying element starts tracking at `now` unless it is already
    ///   tracking, in which case its original start time is kept.
    pub fn on_geometry_update(
        &mut self,
        key: K,
        size: Size,
        bounds: Rect,
        viewport: Rect,
        now: Duration,
    ) -> GeometryOutcome {
        if self.confirmed.contains_key(&key) {
            return GeometryOutcome::AlreadyConfirmed;
        }
        self.on_visibility(key, visible_ratio(size, bounds, viewport), now)
    }

    /// Like [`on_geometry_update`](Self::on_geometry_update), for hosts that
    /// compute [`Visibility`] themselves.
    pub fn on_visibility(
        &mut self,
        key: K,
        visibility: Visibility,
        now: Duration,
    ) -> GeometryOutcome {
        if self.confirmed.contains_key(&key) {
            return GeometryOutcome::AlreadyConfirmed;
        }
        if !visibility.meets(self.config.visible_ratio) {
            self.dispose(&key);
            return GeometryOutcome::Disposed;
        }
        if self.tracking.contains_key(&key) {
            return GeometryOutcome::Continued;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, key.clone());
        self.tracking.insert(
            key,
            TrackingEntry {
                started_at: now,
                seq,
            },
        );
        GeometryOutcome::Started
    }

    /// Stops tracking `key`.
    ///
    /// Returns `true` if the key was tracking. The confirmed set is untouched.
    pub fn dispose(&mut self, key: &K) -> bool {
        match self.tracking.remove(key) {
            Some(entry) => {
                self.order.remove(&entry.seq);
                true
            }
            None => false,
        }
    }

    /// Clears both the tracking and the confirmed sets.
    ///
    /// The loop counter is restarted as well, so the next tick is iteration 0.
    pub fn reset(&mut self) {
        self.tracking.clear();
        self.order.clear();
        self.confirmed.clear();
        self.loop_counter = None;
    }

    /// Runs one sampling step at time `now`.
    ///
    /// Advances the loop counter, then promotes due entries from tracking to
    /// confirmed according to the configured [`ScanPolicy`]. An entry is due
    /// when at least the dwell duration has passed since it started tracking.
    /// Promoted keys are returned in start order; each should be announced
    /// exactly once by the caller.
    pub fn tick(&mut self, now: Duration) -> Tick<K> {
        let iteration = self.loop_counter.map_or(0, |counter| counter.wrapping_add(1));
        self.loop_counter = Some(iteration);

        let dwell = self.config.dwell;
        let is_due = |entry: &TrackingEntry| now.saturating_sub(entry.started_at) >= dwell;

        let mut due = Vec::new();
        for (&seq, key) in &self.order {
            if self.tracking.get(key).is_some_and(is_due) {
                due.push(seq);
            } else if self.config.scan_policy == ScanPolicy::Prefix {
                break;
            }
        }

        let mut confirmed = Vec::with_capacity(due.len());
        for seq in due {
            if let Some(key) = self.order.remove(&seq) {
                self.tracking.remove(&key);
                self.confirmed.insert(key.clone(), iteration);
                confirmed.push(key);
            }
        }

        Tick {
            iteration,
            confirmed,
        }
    }

    /// Returns `true` if `key` is accumulating dwell time.
    #[must_use]
    pub fn is_tracking(&self, key: &K) -> bool {
        self.tracking.contains_key(key)
    }

    /// Returns `true` if `key` already has an impression.
    #[must_use]
    pub fn is_confirmed(&self, key: &K) -> bool {
        self.confirmed.contains_key(key)
    }

    /// Returns the loop counter of the tick that confirmed `key`.
    #[must_use]
    pub fn confirmed_at(&self, key: &K) -> Option<u64> {
        self.confirmed.get(key).copied()
    }

    /// Returns when `key` started its current dwell.
    #[must_use]
    pub fn tracking_started_at(&self, key: &K) -> Option<Duration> {
        self.tracking.get(key).map(|entry| entry.started_at)
    }

    /// Returns the number of tracking keys.
    #[must_use]
    pub fn tracking_len(&self) -> usize {
        self.tracking.len()
    }

    /// Returns the number of confirmed keys.
    #[must_use]
    pub fn confirmed_len(&self) -> usize {
        self.confirmed.len()
    }

    /// Iterates over tracking keys in the order they started.
    pub fn tracking_keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.order.values()
    }

    /// Returns the loop counter of the most recent tick, or `None` before the
    /// first tick.
    #[must_use]
    pub fn loop_counter(&self) -> Option<u64> {
        self.loop_counter
    }

    /// Returns a snapshot of the ledger's counters for logging and inspection.
    #[must_use]
    pub fn debug_info(&self) -> LedgerDebugInfo {
        let oldest_started_at = self
            .order
            .values()
            .next()
            .and_then(|key| self.tracking.get(key))
            .map(|entry| entry.started_at);
        LedgerDebugInfo {
            tracking: self.tracking.len(),
            confirmed: self.confirmed.len(),
            loop_counter: self.loop_counter,
            oldest_started_at,
            config: self.config,
        }
    }
}

/// Debug snapshot of an [`ImpressionLedger`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LedgerDebugInfo {
    /// Number of tracking keys.
    pub tracking: usize,
    /// Number of confirmed keys.
    pub confirmed: usize,
    /// Loop counter of the most recent tick.
    pub loop_counter: Option<u64>,
    /// Start time of the first key in tracking order.
    pub oldest_started_at: Option<Duration>,
    /// Active configuration.
    pub config: ImpressionConfig,
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;
    use core::time::Duration;

    use kurbo::{Rect, Size};

    use super::{GeometryOutcome, ImpressionLedger};
    use crate::config::{ImpressionConfig, ScanPolicy};
    use crate::geometry::Visibility;

    const VIEWPORT: Rect = Rect::new(0.0, 0.0, 400.0, 800.0);
    const CARD: Size = Size::new(100.0, 100.0);
    const INSIDE: Rect = Rect::new(0.0, 0.0, 100.0, 100.0);
    const OUTSIDE: Rect = Rect::new(0.0, 900.0, 100.0, 1000.0);

    fn ms(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    fn show(ledger: &mut ImpressionLedger<u32>, key: u32, at: u64) -> GeometryOutcome {
        ledger.on_geometry_update(key, CARD, INSIDE, VIEWPORT, ms(at))
    }

    #[test]
    fn repeated_updates_keep_the_original_start() {
        let mut ledger = ImpressionLedger::default();
        assert_eq!(show(&mut ledger, 1, 0), GeometryOutcome::Started);
        assert_eq!(show(&mut ledger, 1, 600), GeometryOutcome::Continued);
        assert_eq!(ledger.tracking_started_at(&1), Some(ms(0)));

        assert_eq!(ledger.tick(ms(1000)).confirmed, vec![1]);
    }

    #[test]
    fn below_threshold_disposes() {
        let mut ledger = ImpressionLedger::default();
        show(&mut ledger, 1, 0);

        // 30% visible.
        let bounds = Rect::new(0.0, 770.0, 100.0, 870.0);
        let outcome = ledger.on_geometry_update(1, CARD, bounds, VIEWPORT, ms(100));
        assert_eq!(outcome, GeometryOutcome::Disposed);
        assert!(!ledger.is_tracking(&1));
    }

    #[test]
    fn hidden_update_never_creates_an_entry() {
        let mut ledger = ImpressionLedger::<u32>::default();
        let outcome = ledger.on_geometry_update(1, CARD, OUTSIDE, VIEWPORT, ms(0));
        assert_eq!(outcome, GeometryOutcome::Disposed);
        assert_eq!(ledger.tracking_len(), 0);
        assert!(ledger.tick(ms(5000)).confirmed.is_empty());
    }

    #[test]
    fn zero_area_element_is_not_tracked() {
        let mut ledger = ImpressionLedger::<u32>::default();
        let outcome = ledger.on_geometry_update(1, Size::ZERO, INSIDE, VIEWPORT, ms(0));
        assert_eq!(outcome, GeometryOutcome::Disposed);
        assert!(!ledger.is_tracking(&1));
    }

    #[test]
    fn loop_counter_starts_at_zero_and_increments() {
        let mut ledger = ImpressionLedger::<u32>::default();
        assert_eq!(ledger.loop_counter(), None);
        assert_eq!(ledger.tick(ms(0)).iteration, 0);
        assert_eq!(ledger.tick(ms(0)).iteration, 1);
        assert_eq!(ledger.loop_counter(), Some(1));
    }

    #[test]
    fn confirmation_records_iteration() {
        let mut ledger = ImpressionLedger::default();
        show(&mut ledger, 9, 0);
        ledger.tick(ms(500));
        ledger.tick(ms(999));
        let tick = ledger.tick(ms(1000));
        assert_eq!(tick.iteration, 2);
        assert_eq!(ledger.confirmed_at(&9), Some(2));
        assert!(!ledger.is_tracking(&9));
    }

    #[test]
    fn confirmed_key_is_never_tracked_again() {
        let mut ledger = ImpressionLedger::default();
        show(&mut ledger, 1, 0);
        ledger.tick(ms(1000));

        assert_eq!(
            show(&mut ledger, 1, 2000),
            GeometryOutcome::AlreadyConfirmed
        );
        let outcome = ledger.on_geometry_update(1, CARD, OUTSIDE, VIEWPORT, ms(2000));
        assert_eq!(outcome, GeometryOutcome::AlreadyConfirmed);
        assert!(!ledger.is_tracking(&1));
        assert!(ledger.tick(ms(10_000)).confirmed.is_empty());
    }

    #[test]
    fn dispose_leaves_confirmed_set_alone() {
        let mut ledger = ImpressionLedger::default();
        show(&mut ledger, 1, 0);
        ledger.tick(ms(1000));
        assert!(!ledger.dispose(&1));
        assert!(ledger.is_confirmed(&1));
    }

    #[test]
    fn prefix_scan_defers_later_due_entries() {
        let config = ImpressionConfig::default().with_scan_policy(ScanPolicy::Prefix);
        let mut ledger = ImpressionLedger::new(config);
        show(&mut ledger, 1, 0);
        show(&mut ledger, 2, 500);
        show(&mut ledger, 3, 500);

        // At 1200: 1 is due, 2 and 3 are not.
        assert_eq!(ledger.tick(ms(1200)).confirmed, vec![1]);

        // Restarting 2 moves it behind 3.
        ledger.dispose(&2);
        show(&mut ledger, 2, 1300);
        let order: Vec<u32> = ledger.tracking_keys().copied().collect();
        assert_eq!(order, vec![3, 2]);

        // At 1500: 3 is due and first in order.
        assert_eq!(ledger.tick(ms(1500)).confirmed, vec![3]);
        assert_eq!(ledger.tick(ms(2300)).confirmed, vec![2]);
    }

    #[test]
    fn prefix_scan_stops_at_first_entry_not_due() {
        let mut ledger = ImpressionLedger::new(ImpressionConfig::default());
        // 10 is inserted first but with a later start time than 20.
        show(&mut ledger, 10, 900);
        show(&mut ledger, 20, 0);

        // At 1000, 20 has dwelled 1000ms but 10 only 100ms.
        assert!(ledger.tick(ms(1000)).confirmed.is_empty());
        assert!(ledger.is_tracking(&20));

        // Once 10 is due, both go in insertion order.
        assert_eq!(ledger.tick(ms(1900)).confirmed, vec![10, 20]);
    }

    #[test]
    fn full_scan_confirms_every_due_entry() {
        let config = ImpressionConfig::default().with_scan_policy(ScanPolicy::Full);
        let mut ledger = ImpressionLedger::new(config);
        show(&mut ledger, 10, 900);
        show(&mut ledger, 20, 0);
        show(&mut ledger, 30, 0);

        assert_eq!(ledger.tick(ms(1000)).confirmed, vec![20, 30]);
        assert!(ledger.is_tracking(&10));
        assert_eq!(ledger.tick(ms(1900)).confirmed, vec![10]);
    }

    #[test]
    fn clock_reading_before_start_never_confirms() {
        let mut ledger = ImpressionLedger::new(ImpressionConfig::default().with_dwell(ms(0)));
        show(&mut ledger, 1, 5000);
        // Zero dwell confirms at the start time itself...
        assert_eq!(ledger.tick(ms(5000)).confirmed, vec![1]);

        let mut ledger = ImpressionLedger::new(ImpressionConfig::default());
        show(&mut ledger, 1, 5000);
        // ...but a reading from before the start never does.
        assert!(ledger.tick(ms(100)).confirmed.is_empty());
    }

    #[test]
    fn on_visibility_uses_threshold() {
        let mut ledger = ImpressionLedger::new(ImpressionConfig::default().with_visible_ratio(0.8));
        assert_eq!(
            ledger.on_visibility(1_u32, Visibility::Visible(0.79), ms(0)),
            GeometryOutcome::Disposed
        );
        assert_eq!(
            ledger.on_visibility(1, Visibility::Visible(0.8), ms(0)),
            GeometryOutcome::Started
        );
        assert_eq!(
            ledger.on_visibility(1, Visibility::Hidden, ms(1)),
            GeometryOutcome::Disposed
        );
    }

    #[test]
    fn reset_clears_everything() {
        let mut ledger = ImpressionLedger::default();
        show(&mut ledger, 1, 0);
        show(&mut ledger, 2, 0);
        ledger.tick(ms(1000));
        show(&mut ledger, 3, 1000);

        ledger.reset();
        assert_eq!(ledger.tracking_len(), 0);
        assert_eq!(ledger.confirmed_len(), 0);
        assert_eq!(ledger.loop_counter(), None);
        assert_eq!(show(&mut ledger, 1, 2000), GeometryOutcome::Started);
    }

    #[test]
    fn debug_info_reports_oldest_entry() {
        let mut ledger = ImpressionLedger::default();
        show(&mut ledger, 1, 300);
        show(&mut ledger, 2, 100);
        let info = ledger.debug_info();
        assert_eq!(info.tracking, 2);
        assert_eq!(info.confirmed, 0);
        assert_eq!(info.loop_counter, None);
        assert_eq!(info.oldest_started_at, Some(ms(300)));
    }
}
