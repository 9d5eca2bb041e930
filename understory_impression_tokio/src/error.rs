// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use thiserror::Error;
use understory_impression::ConfigError;

/// Errors raised while configuring or starting an impression tracker.
///
/// Normal operation (geometry updates, ticks, disposal) never fails.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrackerError {
    /// The dwell/ratio thresholds were rejected.
    #[error("invalid impression config: {0}")]
    Config(#[from] ConfigError),

    /// The sampling period was zero.
    #[error("check interval must be non-zero")]
    ZeroCheckInterval,

    /// A background task was requested outside a Tokio runtime.
    #[error("no Tokio runtime is available to spawn the task")]
    NoRuntime,
}
