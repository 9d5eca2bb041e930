// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_impression_tokio --heading-base-level=0

//! Understory Impression Tokio: a runtime for impression tracking.
//!
//! [`understory_impression`] decides *when* an element has made an impression.
//! This crate runs that logic inside a Tokio application:
//!
//! - [`ImpressionTracker`]: a cloneable, thread-safe handle around one
//!   [`ImpressionLedger`](understory_impression::ImpressionLedger), with a
//!   periodic sampling task that follows the host scope's active state.
//! - [`ImpressionStream`] and [`KeyListener`]: lossless delivery of
//!   confirmed impressions, to every stream or to the listeners of one key.
//! - [`ElementBinding`]: the per-element adapter a UI node holds while
//!   mounted. It forwards layout results and disposes its key on drop.
//! - [`TrackerRegistry`]: one tracker per scope (screen, tab, list), passed
//!   down explicitly by the host.
//!
//! ## Example
//!
//! ```rust
//! use kurbo::{Rect, Size};
//! use understory_impression_tokio::{ImpressionTracker, TrackerConfig};
//!
//! # #[tokio::main(flavor = "current_thread", start_paused = true)]
//! # async fn main() -> Result<(), understory_impression_tokio::TrackerError> {
//! let tracker = ImpressionTracker::<u64>::new(TrackerConfig::default())?;
//! let viewport = Rect::new(0.0, 0.0, 400.0, 800.0);
//!
//! // The host mounts an element and reports its layout.
//! let card = tracker.bind(42);
//! let seen = card.listen();
//! card.update(Size::new(100.0, 100.0), Rect::new(0.0, 0.0, 100.0, 100.0), viewport);
//!
//! // The screen is in the foreground: sample once per check interval.
//! tracker.start()?;
//! let impression = seen.wait().await;
//! assert_eq!(impression.map(|i| i.key), Some(42));
//! tracker.stop();
//! # Ok(())
//! # }
//! ```
//!
//! ## Lifecycle
//!
//! Sampling only runs between [`ImpressionTracker::start`] and
//! [`ImpressionTracker::stop`]. Geometry updates are still recorded while the
//! tracker is stopped, and no state is lost across a stop/start cycle. The
//! sampling task holds a weak reference to the tracker and is cancelled when
//! the last handle drops.
//!
//! ## Logging
//!
//! Lifecycle changes are logged at `info`, confirmations and resets at `debug`,
//! and every tick and geometry update at `trace`, all through [`tracing`].
//!
//! ## Features
//!
//! - `serde`: `Serialize`/`Deserialize` for [`TrackerConfig`].

mod binding;
mod channel;
mod clock;
mod config;
mod error;
mod registry;
mod sampler;
mod tracker;

use core::fmt;
use core::hash::Hash;

pub use binding::ElementBinding;
pub use channel::{Impression, ImpressionStream, KeyListener};
pub use clock::TokioClock;
pub use config::{DEFAULT_CHECK_INTERVAL, TrackerConfig};
pub use error::TrackerError;
pub use registry::TrackerRegistry;
pub use tracker::ImpressionTracker;

pub use understory_impression::{GeometryOutcome, ScanPolicy, Tick, Visibility};

/// Bounds for element keys handled by a tracker.
///
/// Keys cross thread and task boundaries and appear in log fields. Any type
/// meeting the bounds implements this automatically.
pub trait ImpressionKey: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static> ImpressionKey for T {}
