// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::time::Duration;

use tokio::time::Instant;
use understory_impression::Clock;

/// A [`Clock`] that follows Tokio's time source.
///
/// Outside a paused runtime this matches wall-clock time. Under
/// `tokio::time::pause` it advances with the runtime's virtual time, so dwell
/// accounting stays in step with the sampling task in tests.
#[derive(Clone, Copy, Debug)]
pub struct TokioClock {
    origin: Instant,
}

impl TokioClock {
    /// Creates a clock whose origin is the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Duration {
        Instant::now().saturating_duration_since(self.origin)
    }
}
