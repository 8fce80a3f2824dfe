//! Playback counters

use serde::Serialize;

/// Counters for one playback session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlaybackStats {
    /// Ticks that did work (overruns excluded)
    pub ticks: u64,
    pub frames_presented: u64,
    /// Malformed or unsupported frames
    pub frames_skipped: u64,
    /// Ticks that ended without presenting a frame
    pub missed_ticks: u64,
    /// Ticks dropped because the previous tick was still running
    pub overruns: u64,
    /// Extractor resynchronizations
    pub sync_errors: u64,
    /// Failed source polls
    pub io_errors: u64,
    /// Loops of a local file or clean ends of a remote stream
    pub end_of_streams: u64,
    pub bytes_read: u64,
    /// Source swaps while running
    pub source_swaps: u64,
}
