//! Playback state machine
//!
//! ```text
//! Idle ──start──▶ Buffering ──first frame──▶ Playing ◀──next frame── Stalled
//!                                              └──N empty ticks──────▶┘
//! any ──stop──▶ Stopped        any ──fatal fault──▶ Error(reason)
//! ```

use std::fmt;

/// Observable playback state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Not started
    #[default]
    Idle,
    /// Source open, no frame presented yet
    Buffering,
    /// Frames are being presented
    Playing,
    /// Several consecutive ticks brought no new frame
    Stalled,
    /// Stopped by request or at the end of a one-shot file
    Stopped,
    /// Stopped by a fatal fault
    Error(String),
}

impl PlaybackState {
    /// Get display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "Idle",
            PlaybackState::Buffering => "Buffering",
            PlaybackState::Playing => "Playing",
            PlaybackState::Stalled => "Stalled",
            PlaybackState::Stopped => "Stopped",
            PlaybackState::Error(_) => "Error",
        }
    }

    /// A session exists and ticks do work
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            PlaybackState::Buffering | PlaybackState::Playing | PlaybackState::Stalled
        )
    }

    /// No further ticks will do work until the next start
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlaybackState::Stopped | PlaybackState::Error(_))
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Error(reason) => write!(f, "Error({reason})"),
            other => f.write_str(other.display_name()),
        }
    }
}
