// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cancellable periodic task that drives sampling ticks.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::error::TrackerError;

/// Owned handle to a running sampling loop.
///
/// The loop calls its step once immediately and then once per period. The
/// step is synchronous, so cancellation can only take effect while the loop
/// is waiting for the next period and never in the middle of a step.
///
/// Dropping the handle cancels the loop.
#[derive(Debug)]
pub(crate) struct SamplingTask {
    handle: JoinHandle<()>,
}

impl SamplingTask {
    /// Spawns the loop on the current Tokio runtime.
    ///
    /// The loop ends on its own when `step` returns [`ControlFlow::Break`].
    pub(crate) fn spawn<F>(period: Duration, mut step: F) -> Result<Self, TrackerError>
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| TrackerError::NoRuntime)?;
        let handle = runtime.spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if step().is_break() {
                    break;
                }
            }
        });
        Ok(Self { handle })
    }

    /// Returns `true` once the loop has exited or been cancelled.
    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancels the loop.
    pub(crate) fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for SamplingTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
