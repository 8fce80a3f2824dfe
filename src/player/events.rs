//! Playback events and the stop token

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::PlaybackState;
use crate::error::FrameSyncError;

/// Shared stop request flag.
///
/// Cloned into observers, signal handlers or other threads; the scheduler
/// checks it before every source poll and before every present.
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    flag: Arc<AtomicBool>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Something that happened during a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    StateChanged {
        from: PlaybackState,
        to: PlaybackState,
    },
    FramePresented {
        sequence: u64,
    },
    FrameSkipped {
        sequence: u64,
        reason: String,
    },
    SourceFault {
        reason: String,
    },
    Resynced(FrameSyncError),
    EndOfStream,
}

/// Receives events from inside the tick.
///
/// Called synchronously; may request stop through the token.
pub trait PlaybackObserver: Send {
    fn on_event(&mut self, event: &PlaybackEvent, stop: &StopToken);
}

impl<F> PlaybackObserver for F
where
    F: FnMut(&PlaybackEvent, &StopToken) + Send,
{
    fn on_event(&mut self, event: &PlaybackEvent, stop: &StopToken) {
        self(event, stop)
    }
}
