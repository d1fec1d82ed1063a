//! Runtime configuration
//!
//! Defaults are compiled in; a few values can be overridden from the
//! environment at startup:
//! - `LAB_LENS_ENDPOINT` - identification endpoint URL
//! - `LAB_LENS_CAMERA` - camera device path
//! - `LAB_LENS_TOAST_MS` - how long notifications stay visible
use std::time::Duration;

use tracing::{info, warn};

/// Identification endpoint used when no override is set
pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000/api/identify";

/// Camera device opened by default (Video4Linux2 node)
pub const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";

const DEFAULT_TOAST_MS: u64 = 3200;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub endpoint: String,
    pub camera_device: String,
    /// Time a toast stays fully visible before it fades
    pub toast_timeout: Duration,
    /// Fade-out time after `toast_timeout` before the toast is removed
    pub toast_fade: Duration,
    /// JPEG quality for captured frames (1-100)
    pub capture_quality: u8,
    /// Interval between live preview grabs
    pub frame_interval: Duration,
    /// Paths dropped within this window are submitted as one batch
    pub drop_settle: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            camera_device: DEFAULT_CAMERA_DEVICE.to_string(),
            toast_timeout: Duration::from_millis(DEFAULT_TOAST_MS),
            toast_fade: Duration::from_millis(300),
            capture_quality: 92,
            frame_interval: Duration::from_millis(66),
            drop_settle: Duration::from_millis(80),
        }
    }
}

impl Config {
    /// Build the configuration from defaults plus process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from defaults plus an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(endpoint) = lookup("LAB_LENS_ENDPOINT").filter(|v| !v.trim().is_empty()) {
            config.endpoint = endpoint.trim().to_string();
        }

        if let Some(device) = lookup("LAB_LENS_CAMERA").filter(|v| !v.trim().is_empty()) {
            config.camera_device = device.trim().to_string();
        }

        if let Some(raw) = lookup("LAB_LENS_TOAST_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => config.toast_timeout = Duration::from_millis(ms),
                _ => warn!(value = %raw, "ignoring invalid LAB_LENS_TOAST_MS"),
            }
        }

        info!(endpoint = %config.endpoint, camera = %config.camera_device, "configuration loaded");
        config
    }
}
