use std::path::Path;
use std::time::Duration;

use scopelink_frame::{FrameConfig, DEFAULT_BUFFER_CAPACITY, HEADER_SIZE};
use serde::{Deserialize, Serialize};

use crate::error::{LinkError, Result};

/// Link configuration.
///
/// Loadable from JSON; missing fields take their defaults. Timeouts are in
/// milliseconds and 0 disables the corresponding timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkConfig {
    /// Receive buffer capacity, which is also the largest receivable frame.
    pub buffer_capacity: usize,
    /// Bound on a single readiness wait while receiving. Must be non-zero.
    pub poll_interval_ms: u64,
    /// Bound on each TCP connect attempt.
    pub connect_timeout_ms: u64,
    /// Bound on each blocking write.
    pub write_timeout_ms: u64,
    /// Disable Nagle's algorithm on TCP links.
    pub nodelay: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            poll_interval_ms: 1_000,
            connect_timeout_ms: 2_000,
            write_timeout_ms: 5_000,
            nodelay: true,
        }
    }
}

impl LinkConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| LinkError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer_capacity < HEADER_SIZE {
            return Err(LinkError::ConfigValue {
                field: "buffer_capacity",
                reason: "must hold at least one frame header",
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(LinkError::ConfigValue {
                field: "poll_interval_ms",
                reason: "must be non-zero",
            });
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        millis(self.connect_timeout_ms)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        millis(self.write_timeout_ms)
    }

    /// Framing-layer view of this configuration.
    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            buffer_capacity: self.buffer_capacity,
            poll_interval: self.poll_interval(),
            write_timeout: self.write_timeout(),
        }
    }
}

fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}
