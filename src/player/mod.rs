//! Player module
//!
//! The playback loop: [`FrameScheduler`] moves frames from source to display
//! one tick at a time, [`PlaybackController`] owns it and exposes the
//! lifecycle to the host.

mod controller;
mod events;
mod scheduler;
mod state;
mod stats;

pub use controller::PlaybackController;
pub use events::{PlaybackEvent, PlaybackObserver, StopToken};
pub use scheduler::{FrameScheduler, TickOutcome};
pub use state::PlaybackState;
pub use stats::PlaybackStats;
