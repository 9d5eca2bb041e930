// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Time sources for dwell accounting.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, Ordering};
use core::time::Duration;

/// A monotonic time source.
///
/// `now` returns the time elapsed since an arbitrary, fixed origin chosen by
/// the clock. Only differences between readings are meaningful, so readings
/// from different clocks must not be mixed in one ledger.
pub trait Clock {
    /// Returns the current time since this clock's origin.
    fn now(&self) -> Duration;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

/// Wall-clock time source backed by [`std::time::Instant`].
///
/// The origin is the moment the clock was created.
#[cfg(feature = "std")]
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl SystemClock {
    /// Creates a clock whose origin is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to.
///
/// Interior mutability lets one handle drive time while another, shared via
/// [`Arc`], is read by a tracker.
///
/// ```rust
/// use core::time::Duration;
/// use understory_impression::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// assert_eq!(clock.now(), Duration::ZERO);
/// clock.advance(Duration::from_millis(1500));
/// assert_eq!(clock.now(), Duration::from_millis(1500));
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    /// Creates a clock reading zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clock reading `now`.
    #[must_use]
    pub fn starting_at(now: Duration) -> Self {
        Self {
            nanos: AtomicU64::new(saturating_nanos(now)),
        }
    }

    /// Moves the clock forward by `delta`, saturating at the maximum reading.
    pub fn advance(&self, delta: Duration) {
        let delta = saturating_nanos(delta);
        // A failed update is impossible: the closure always returns `Some`.
        let _ = self
            .nanos
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_add(delta))
            });
    }

    /// Sets the clock to an absolute reading, which may move it backwards.
    pub fn set(&self, now: Duration) {
        self.nanos.store(saturating_nanos(now), Ordering::Release);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Acquire))
    }
}

fn saturating_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
