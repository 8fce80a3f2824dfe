//! PipelineTuning data structure
//!
//! Buffer sizes, timeouts and recovery policy for one playback session.
//! Every field has a default, so a tuning file only lists what it changes.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::display::{DisplayGeometry, PixelFormat};
use crate::error::ConfigError;
use crate::source::{BackoffPolicy, SourceOptions};

/// Smallest and largest pool slot counts
pub const POOL_SLOTS: std::ops::RangeInclusive<usize> = 2..=3;

/// HTTP reconnect backoff
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackoffConfig {
    #[serde(default = "default_backoff_initial_ms")]
    pub initial_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub multiplier: u32,
    #[serde(default = "default_backoff_max_ms")]
    pub max_ms: u64,
}

fn default_backoff_initial_ms() -> u64 {
    250
}

fn default_backoff_multiplier() -> u32 {
    2
}

fn default_backoff_max_ms() -> u64 {
    8000
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_ms: default_backoff_initial_ms(),
            multiplier: default_backoff_multiplier(),
            max_ms: default_backoff_max_ms(),
        }
    }
}

impl BackoffConfig {
    pub fn policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            initial: Duration::from_millis(self.initial_ms),
            max: Duration::from_millis(self.max_ms),
            multiplier: self.multiplier,
        }
    }
}

/// Expected output geometry, checked against the display at start
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputGeometry {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub format: PixelFormat,
}

impl OutputGeometry {
    pub fn geometry(&self) -> DisplayGeometry {
        DisplayGeometry::new(self.width, self.height, self.format)
    }
}

/// Pipeline policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineTuning {
    /// Bytes read from the source per poll
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Rolling buffer capacity; also the largest encoded frame accepted
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    #[serde(default = "default_pool_slots")]
    pub frame_pool: usize,

    #[serde(default = "default_pool_slots")]
    pub pixel_pool: usize,

    #[serde(default = "default_max_width")]
    pub max_width: u32,

    #[serde(default = "default_max_height")]
    pub max_height: u32,

    /// Consecutive ticks without a new frame before Playing becomes Stalled
    #[serde(default = "default_stall_threshold")]
    pub stall_threshold: u32,

    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,

    /// Source polls allowed per tick
    #[serde(default = "default_poll_budget")]
    pub poll_budget: u32,

    /// Rewind local files at end of stream
    #[serde(default = "default_true")]
    pub loop_file: bool,

    #[serde(default)]
    pub backoff: BackoffConfig,

    /// Reconnect a silent HTTP stream after this long
    #[serde(default = "default_idle_reconnect_ms")]
    pub idle_reconnect_ms: u64,

    /// Re-open an HTTP response after reading it this long
    #[serde(default = "default_http_session_ms")]
    pub http_session_ms: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputGeometry>,
}

fn default_chunk_size() -> usize {
    4096
}

fn default_max_frame_bytes() -> usize {
    256 * 1024
}

fn default_pool_slots() -> usize {
    2
}

fn default_max_width() -> u32 {
    640
}

fn default_max_height() -> u32 {
    480
}

fn default_stall_threshold() -> u32 {
    3
}

fn default_io_timeout_ms() -> u64 {
    250
}

fn default_poll_budget() -> u32 {
    8
}

fn default_true() -> bool {
    true
}

fn default_idle_reconnect_ms() -> u64 {
    5000
}

fn default_http_session_ms() -> u64 {
    600_000
}

impl Default for PipelineTuning {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            max_frame_bytes: default_max_frame_bytes(),
            frame_pool: default_pool_slots(),
            pixel_pool: default_pool_slots(),
            max_width: default_max_width(),
            max_height: default_max_height(),
            stall_threshold: default_stall_threshold(),
            io_timeout_ms: default_io_timeout_ms(),
            poll_budget: default_poll_budget(),
            loop_file: true,
            backoff: BackoffConfig::default(),
            idle_reconnect_ms: default_idle_reconnect_ms(),
            http_session_ms: default_http_session_ms(),
            output: None,
        }
    }
}

impl PipelineTuning {
    /// Load from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read tuning file {}", path.display()))?;
        let tuning: PipelineTuning = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse tuning file {}", path.display()))?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: String| {
            Err(ConfigError::InvalidValue { field, reason })
        };

        if self.chunk_size == 0 {
            return invalid("chunk_size", "must be positive".into());
        }
        if self.max_frame_bytes < 4 {
            return invalid("max_frame_bytes", format!("{} is too small", self.max_frame_bytes));
        }
        if !POOL_SLOTS.contains(&self.frame_pool) {
            return invalid("frame_pool", format!("{} not in 2..=3", self.frame_pool));
        }
        if !POOL_SLOTS.contains(&self.pixel_pool) {
            return invalid("pixel_pool", format!("{} not in 2..=3", self.pixel_pool));
        }
        if self.max_width == 0 || self.max_height == 0 {
            return invalid(
                "max_width/max_height",
                format!("{}x{} is empty", self.max_width, self.max_height),
            );
        }
        if self.stall_threshold == 0 {
            return invalid("stall_threshold", "must be at least 1".into());
        }
        if self.io_timeout_ms == 0 {
            return invalid("io_timeout_ms", "must be at least 1".into());
        }
        if self.poll_budget == 0 {
            return invalid("poll_budget", "must be at least 1".into());
        }
        if self.backoff.initial_ms == 0 || self.backoff.multiplier == 0 {
            return invalid("backoff", "initial delay and multiplier must be positive".into());
        }
        if self.backoff.max_ms < self.backoff.initial_ms {
            return invalid(
                "backoff",
                format!("max {}ms below initial {}ms", self.backoff.max_ms, self.backoff.initial_ms),
            );
        }
        if self.http_session_ms < self.idle_reconnect_ms {
            return invalid(
                "http_session_ms",
                format!(
                    "{}ms below idle_reconnect_ms {}ms",
                    self.http_session_ms, self.idle_reconnect_ms
                ),
            );
        }
        if let Some(output) = &self.output {
            if output.width == 0 || output.height == 0 {
                return invalid("output", format!("{}x{} is empty", output.width, output.height));
            }
        }
        Ok(())
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    /// I/O policy handed to byte sources
    pub fn source_options(&self) -> SourceOptions {
        SourceOptions {
            chunk_size: self.chunk_size,
            io_timeout: self.io_timeout(),
            loop_file: self.loop_file,
            backoff: self.backoff.policy(),
            idle_reconnect: Duration::from_millis(self.idle_reconnect_ms),
            session_limit: Duration::from_millis(self.http_session_ms),
        }
    }
}
