// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_impression --heading-base-level=0

//! Understory Impression: visibility-dwell impression tracking.
//!
//! An *impression* is recorded once an element identified by a caller-chosen
//! key has stayed sufficiently visible for a minimum dwell time, for example
//! "this card was at least half on screen for one second". This crate holds the
//! host-agnostic core:
//!
//! - [`visible_ratio`]: the fraction of an element's area inside the visible
//!   viewport bounds, or [`Visibility::Hidden`] when it is out of view.
//! - [`ImpressionLedger`]: the tracking and confirmed sets for one scope,
//!   fed by per-frame geometry and advanced by [`ImpressionLedger::tick`].
//! - [`ImpressionConfig`] and [`ScanPolicy`]: dwell, visible-ratio threshold,
//!   and which due entries a tick promotes.
//! - [`Clock`], [`ManualClock`] and (with `std`) [`SystemClock`]: time sources
//!   for dwell accounting.
//!
//! The crate does not schedule anything. Hosts are responsible for:
//!
//! - Calling [`ImpressionLedger::on_geometry_update`] after layout passes and
//!   [`ImpressionLedger::dispose`] when an element unmounts.
//! - Calling [`ImpressionLedger::tick`] periodically and announcing the keys it
//!   returns.
//! - Serializing access when updates and ticks come from different contexts.
//!
//! `understory_impression_tokio` provides all three on top of Tokio.
//!
//! ## Minimal example
//!
//! ```rust
//! use core::time::Duration;
//! use kurbo::{Rect, Size};
//! use understory_impression::{Clock, ImpressionConfig, ImpressionLedger, ManualClock};
//!
//! let clock = ManualClock::new();
//! let mut ledger = ImpressionLedger::new(ImpressionConfig::default());
//! let viewport = Rect::new(0.0, 0.0, 400.0, 800.0);
//!
//! // Layout pass: card 7 is fully on screen.
//! ledger.on_geometry_update(
//!     7_u32,
//!     Size::new(100.0, 100.0),
//!     Rect::new(0.0, 100.0, 100.0, 200.0),
//!     viewport,
//!     clock.now(),
//! );
//!
//! clock.advance(Duration::from_millis(1000));
//! let tick = ledger.tick(clock.now());
//! assert_eq!(tick.confirmed, vec![7]);
//!
//! // Impressions fire at most once per key.
//! clock.advance(Duration::from_millis(5000));
//! assert!(ledger.tick(clock.now()).confirmed.is_empty());
//! ```
//!
//! ## Scan policy
//!
//! By default each tick promotes the longest run of due entries from the start
//! of the tracking order and stops at the first entry that is not yet due
//! ([`ScanPolicy::Prefix`]). Use [`ScanPolicy::Full`] to promote every due
//! entry on every tick instead.
//!
//! ## Zero-area elements
//!
//! Elements whose size has no area are reported as hidden and are never
//! tracked.
//!
//! ## Features
//!
//! - `std` (default): enables [`SystemClock`] and Kurbo's `std` support.
//! - `libm`: Kurbo's `libm` backend for `no_std` builds.
//! - `serde`: `Serialize`/`Deserialize` for [`ImpressionConfig`] and [`ScanPolicy`].
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

mod clock;
mod config;
mod geometry;
mod ledger;

#[cfg(feature = "std")]
pub use clock::SystemClock;
pub use clock::{Clock, ManualClock};
#[cfg(feature = "serde")]
pub use config::millis;
pub use config::{
    ConfigError, DEFAULT_DWELL, DEFAULT_VISIBLE_RATIO, ImpressionConfig, ScanPolicy,
};
pub use geometry::{Visibility, visible_ratio};
pub use ledger::{GeometryOutcome, ImpressionLedger, LedgerDebugInfo, Tick};
