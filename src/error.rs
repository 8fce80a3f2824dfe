//! Error types for the playback pipeline.
//!
//! Each pipeline stage has its own error enum so callers can tell recoverable
//! steady-state faults apart from configuration faults:
//!
//! - [`SourceError`]: source unreachable, read failure, timeout, backoff
//! - [`FrameSyncError`]: the byte stream lost MJPEG framing
//! - [`DecodeError`]: a frame could not be decoded
//! - [`DisplayError`]: the display rejected a buffer or is already claimed
//! - [`ConfigError`]: invalid lifecycle call or configuration value
//!
//! [`PlayerError`] wraps all of them and classifies them with
//! [`PlayerError::is_fatal`] and [`PlayerError::is_retryable`].

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::display::DisplayGeometry;

/// Result type alias for playback operations.
pub type Result<T, E = PlayerError> = std::result::Result<T, E>;

/// Failure to obtain bytes from a source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to open video file {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read from {origin} failed")]
    Read {
        origin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no data from {origin} within {duration:?}")]
    Timeout { origin: String, duration: Duration },

    #[error("connection to {url} lost: {reason}")]
    Network { url: String, reason: String },

    #[error("reconnecting to {url} in {retry_in:?}")]
    Backoff { url: String, retry_in: Duration },

    #[error("invalid source: {reason}")]
    Invalid { reason: String },

    #[error("source is closed")]
    Closed,
}

impl SourceError {
    /// Returns whether polling again later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::Read { .. } => true,
            SourceError::Timeout { .. } => true,
            SourceError::Network { .. } => true,
            SourceError::Backoff { .. } => true,
            SourceError::Open { .. } => false,
            SourceError::Invalid { .. } => false,
            SourceError::Closed => false,
        }
    }
}

/// The extractor lost track of frame boundaries and resynchronized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameSyncError {
    #[error("rolling buffer full without a complete frame, discarded {discarded} bytes")]
    Overflow { discarded: usize },

    #[error("corrupt JPEG structure at offset {offset}, discarded {discarded} bytes")]
    Corrupt { offset: usize, discarded: usize },

    #[error("frame pool exhausted")]
    PoolExhausted,
}

/// Failure to decode one frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed JPEG: {0}")]
    Malformed(String),

    #[error("unsupported JPEG encoding: {0}")]
    Unsupported(String),

    #[error("frame {width}x{height} exceeds maximum {max_width}x{max_height}")]
    TooLarge {
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    },

    #[error("target buffer is {actual:?}, decoder produces {expected:?}")]
    TargetMismatch {
        expected: DisplayGeometry,
        actual: DisplayGeometry,
    },
}

impl DecodeError {
    /// Fatal decode errors indicate a configuration mismatch rather than a bad frame.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DecodeError::TooLarge { .. } | DecodeError::TargetMismatch { .. })
    }
}

/// Failure reported by, or about, the display.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DisplayError {
    #[error("buffer geometry {actual:?} does not match display {expected:?}")]
    GeometryMismatch {
        expected: DisplayGeometry,
        actual: DisplayGeometry,
    },

    #[error("display geometry {0:?} has no pixels")]
    EmptyGeometry(DisplayGeometry),

    #[error("display {0} is already claimed by another player")]
    AlreadyClaimed(String),

    #[error("display update failed: {0}")]
    Sink(String),
}

/// Invalid configuration or lifecycle call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} was already set")]
    AlreadySet(&'static str),

    #[error("video path and HTTP URL are mutually exclusive")]
    ConflictingSource,

    #[error("no video source configured")]
    MissingSource,

    #[error("no display bound")]
    MissingDisplay,

    #[error("update interval must be at least 1ms, got {0:?}")]
    InvalidInterval(Duration),

    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("cannot {0} while playback is running")]
    Running(&'static str),
}

/// Umbrella error for the playback pipeline.
#[derive(Error, Debug)]
pub enum PlayerError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    FrameSync(#[from] FrameSyncError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Display(#[from] DisplayError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("playback failed: {0}")]
    Failed(String),
}

impl PlayerError {
    /// Returns whether this error ends playback.
    ///
    /// Steady-state I/O and decode faults are absorbed by the scheduler;
    /// configuration, geometry and oversize-frame faults are not.
    pub fn is_fatal(&self) -> bool {
        match self {
            PlayerError::Source(e) => !e.is_retryable(),
            PlayerError::FrameSync(_) => false,
            PlayerError::Decode(e) => e.is_fatal(),
            PlayerError::Display(_) => true,
            PlayerError::Config(_) => true,
            PlayerError::Failed(_) => true,
        }
    }

    /// Returns whether the same operation may succeed on a later tick.
    pub fn is_retryable(&self) -> bool {
        !self.is_fatal()
    }
}
