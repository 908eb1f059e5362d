//! Client configuration, optionally loaded from a JSON file.

use crate::core::domain::error::{ValidationError, VirtdeckResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Client-side rate limiting for backend requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub burst_size: u32,
}

/// Polling periods for the synchronizer's background timers, in seconds.
///
/// `None` disables the timer for that resource; it is then refreshed only on
/// demand (manual refresh, tab activation, post-action). The defaults mirror
/// the control panel this core grew out of: status every 30 s, VMs every
/// 60 s, pools on demand only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PollIntervals {
    pub status_secs: Option<u64>,
    pub vms_secs: Option<u64>,
    pub pools_secs: Option<u64>,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            status_secs: Some(30),
            vms_secs: Some(60),
            pools_secs: None,
        }
    }
}

/// Top-level fleet client configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Per-request timeout in seconds. Timeouts surface as transport errors
    /// and clear any pending action, so a VM is never permanently locked.
    pub request_timeout_secs: u64,
    /// Optional client-side rate limit on backend requests.
    pub rate_limit: Option<RateLimitConfig>,
    /// Background polling periods.
    pub poll: PollIntervals,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            rate_limit: None,
            poll: PollIntervals::default(),
        }
    }
}

impl FleetConfig {
    /// Loads configuration from a JSON file, falling back to defaults when
    /// the file does not exist. Missing keys take their default values.
    ///
    /// # Errors
    /// Returns a validation error if the file exists but cannot be read or
    /// parsed.
    pub async fn load(path: impl AsRef<Path>) -> VirtdeckResult<Self> {
        let path = path.as_ref();
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Ok(Self::default());
        }
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            ValidationError::Format(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        let config = serde_json::from_str(&raw).map_err(|e| {
            ValidationError::Format(format!("invalid config file {}: {}", path.display(), e))
        })?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
