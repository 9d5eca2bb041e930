// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracker configuration.

use std::time::Duration;

use understory_impression::{ImpressionConfig, ScanPolicy};

use crate::error::TrackerError;

/// Default sampling period.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(1000);

/// Configuration for an [`ImpressionTracker`](crate::ImpressionTracker).
///
/// The dwell and ratio thresholds live in the embedded [`ImpressionConfig`];
/// the `with_*` builders forward to it so callers rarely need to touch it.
///
/// With the `serde` feature the config reads from a flat table where durations
/// are integer milliseconds and every field is optional:
///
/// ```toml
/// dwell_ms = 1000
/// visible_ratio = 0.5
/// scan_policy = "prefix"
/// check_interval_ms = 250
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TrackerConfig {
    /// Dwell, visible-ratio threshold and scan policy.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub impression: ImpressionConfig,
    /// Time between sampling ticks.
    #[cfg_attr(
        feature = "serde",
        serde(rename = "check_interval_ms", with = "understory_impression::millis")
    )]
    pub check_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            impression: ImpressionConfig::default(),
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }
}

impl TrackerConfig {
    /// Returns the config with a different dwell duration.
    #[must_use]
    pub fn with_dwell(mut self, dwell: Duration) -> Self {
        self.impression = self.impression.with_dwell(dwell);
        self
    }

    /// Returns the config with a different visible-ratio threshold.
    #[must_use]
    pub fn with_visible_ratio(mut self, visible_ratio: f64) -> Self {
        self.impression = self.impression.with_visible_ratio(visible_ratio);
        self
    }

    /// Returns the config with a different scan policy.
    #[must_use]
    pub fn with_scan_policy(mut self, scan_policy: ScanPolicy) -> Self {
        self.impression = self.impression.with_scan_policy(scan_policy);
        self
    }

    /// Returns the config with a different sampling period.
    #[must_use]
    pub fn with_check_interval(mut self, check_interval: Duration) -> Self {
        self.check_interval = check_interval;
        self
    }

    /// Checks every field, including the embedded [`ImpressionConfig`].
    pub fn validate(&self) -> Result<(), TrackerError> {
        self.impression.validate()?;
        if self.check_interval.is_zero() {
            return Err(TrackerError::ZeroCheckInterval);
        }
        Ok(())
    }
}
