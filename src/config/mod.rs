//! Configuration module
//!
//! Contains data structures for PlaybackConfig and PipelineTuning.

mod playback_config;
mod tuning;

pub use playback_config::*;
pub use tuning::*;
