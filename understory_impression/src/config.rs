// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Thresholds that decide when visibility becomes an impression.

use core::fmt;
use core::time::Duration;

/// Default minimum continuous visibility before an impression is confirmed.
pub const DEFAULT_DWELL: Duration = Duration::from_millis(1000);

/// Default fraction of an element's area that must be visible.
pub const DEFAULT_VISIBLE_RATIO: f64 = 0.5;

/// Which tracking entries a tick examines when looking for due impressions.
///
/// Entries are always examined and promoted in the order they started tracking.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ScanPolicy {
    /// Promote the longest run of due entries from the start of the tracking
    /// order, stopping at the first entry that is not yet due.
    ///
    /// An entry that started later but already qualifies waits until every
    /// entry ahead of it has been promoted or removed. This is the default
    /// batching policy and keeps confirmation order identical to start order.
    #[default]
    Prefix,
    /// Promote every due entry on each tick.
    Full,
}

/// Configuration for an [`ImpressionLedger`](crate::ImpressionLedger).
///
/// ```rust
/// use core::time::Duration;
/// use understory_impression::{ImpressionConfig, ScanPolicy};
///
/// let config = ImpressionConfig::default()
///     .with_dwell(Duration::from_millis(500))
///     .with_visible_ratio(0.75)
///     .with_scan_policy(ScanPolicy::Full);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ImpressionConfig {
    /// Minimum continuous qualifying visibility before confirmation.
    #[cfg_attr(feature = "serde", serde(rename = "dwell_ms", with = "millis"))]
    pub dwell: Duration,
    /// Minimum visible fraction of the element's area, in `0.0..=1.0`.
    pub visible_ratio: f64,
    /// Which due entries each tick promotes.
    pub scan_policy: ScanPolicy,
}

impl Default for ImpressionConfig {
    fn default() -> Self {
        Self {
            dwell: DEFAULT_DWELL,
            visible_ratio: DEFAULT_VISIBLE_RATIO,
            scan_policy: ScanPolicy::default(),
        }
    }
}

impl ImpressionConfig {
    /// Returns the config with a different dwell duration.
    #[must_use]
    pub fn with_dwell(mut self, dwell: Duration) -> Self {
        self.dwell = dwell;
        self
    }

    /// Returns the config with a different visible-ratio threshold.
    #[must_use]
    pub fn with_visible_ratio(mut self, visible_ratio: f64) -> Self {
        self.visible_ratio = visible_ratio;
        self
    }

    /// Returns the config with a different scan policy.
    #[must_use]
    pub fn with_scan_policy(mut self, scan_policy: ScanPolicy) -> Self {
        self.scan_policy = scan_policy;
        self
    }

    /// Checks that the thresholds are usable.
    ///
    /// The visible ratio must be a number in `0.0..=1.0`. A zero dwell is
    /// allowed and confirms on the first tick after tracking starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.visible_ratio) {
            return Err(ConfigError::InvalidVisibleRatio(self.visible_ratio));
        }
        Ok(())
    }
}

/// A rejected [`ImpressionConfig`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// The visible ratio was NaN or outside `0.0..=1.0`.
    InvalidVisibleRatio(f64),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidVisibleRatio(ratio) => {
                write!(f, "visible ratio {ratio} is outside 0.0..=1.0")
            }
        }
    }
}

impl core::error::Error for ConfigError {}

/// Serde helpers that store a [`Duration`] as whole milliseconds.
///
/// Use with `#[serde(with = "understory_impression::millis")]`.
#[cfg(feature = "serde")]
pub mod millis {
    use core::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes `duration` as an integer number of milliseconds.
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(ms)
    }

    /// Deserializes an integer number of milliseconds.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use core::time::Duration;

    use super::{ConfigError, ImpressionConfig, ScanPolicy};

    #[test]
    fn defaults_match_documented_values() {
        let config = ImpressionConfig::default();
        assert_eq!(config.dwell, Duration::from_millis(1000));
        assert_eq!(config.visible_ratio, 0.5);
        assert_eq!(config.scan_policy, ScanPolicy::Prefix);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn ratio_bounds_are_inclusive() {
        assert!(
            ImpressionConfig::default()
                .with_visible_ratio(0.0)
                .validate()
                .is_ok()
        );
        assert!(
            ImpressionConfig::default()
                .with_visible_ratio(1.0)
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn out_of_range_ratio_is_rejected() {
        assert_eq!(
            ImpressionConfig::default()
                .with_visible_ratio(1.5)
                .validate(),
            Err(ConfigError::InvalidVisibleRatio(1.5))
        );
        assert!(
            ImpressionConfig::default()
                .with_visible_ratio(-0.1)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn nan_ratio_is_rejected() {
        let err = ImpressionConfig::default()
            .with_visible_ratio(f64::NAN)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVisibleRatio(r) if r.is_nan()));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn loads_from_toml_with_defaults() {
        let config: ImpressionConfig = toml::from_str(
            r#"
            dwell_ms = 250
            scan_policy = "full"
            "#,
        )
        .unwrap();
        assert_eq!(config.dwell, Duration::from_millis(250));
        assert_eq!(config.visible_ratio, 0.5);
        assert_eq!(config.scan_policy, ScanPolicy::Full);
    }
}
