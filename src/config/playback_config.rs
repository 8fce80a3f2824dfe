//! PlaybackConfig data structure
//!
//! The validated record the host configuration layer hands to the player:
//! one display, one refresh interval, exactly one video source.

use std::time::Duration;

use crate::display::DisplayHandle;
use crate::error::{ConfigError, SourceError};
use crate::source::{self, VideoSource};

/// Refresh interval used when the host configuration does not set one
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(33);

/// Shortest accepted refresh interval
pub const MIN_UPDATE_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    pub source: VideoSource,
    pub refresh_interval: Duration,
    pub display: DisplayHandle,
}

impl PlaybackConfig {
    pub fn new(
        source: VideoSource,
        refresh_interval: Duration,
        display: DisplayHandle,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            source,
            refresh_interval,
            display,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_interval(self.refresh_interval)?;
        validate_source(&self.source)
    }
}

pub fn validate_interval(interval: Duration) -> Result<(), ConfigError> {
    if interval < MIN_UPDATE_INTERVAL {
        return Err(ConfigError::InvalidInterval(interval));
    }
    Ok(())
}

pub fn validate_source(source: &VideoSource) -> Result<(), ConfigError> {
    match source {
        VideoSource::LocalPath(path) if path.as_os_str().is_empty() => {
            Err(ConfigError::InvalidValue {
                field: "video_path",
                reason: "empty path".into(),
            })
        }
        VideoSource::LocalPath(_) => Ok(()),
        VideoSource::RemoteUrl(url) => source::validate_url(url).map_err(|e| match e {
            SourceError::Invalid { reason } => ConfigError::InvalidUrl {
                url: url.clone(),
                reason,
            },
            other => ConfigError::InvalidUrl {
                url: url.clone(),
                reason: other.to_string(),
            },
        }),
    }
}
