//! Tick-driven frame scheduler
//!
//! One tick moves at most one frame from the source to the display:
//!
//! 1. take a frame already buffered in the extractor, or poll the source and
//!    feed the extractor until a frame is complete, the tick deadline passes
//!    or the poll budget is spent
//! 2. decode it into a pooled pixel buffer
//! 3. present it on the claimed display and return both buffers to their pools
//!
//! A tick that fires while the previous one was still working is dropped.

use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::events::{PlaybackEvent, PlaybackObserver, StopToken};
use super::{PlaybackState, PlaybackStats};
use crate::config::PipelineTuning;
use crate::display::DisplayClaim;
use crate::error::{FrameSyncError, SourceError};
use crate::mjpeg::{Extracted, FrameBuffer, MjpegFrameExtractor};
use crate::pool::BufferPool;
use crate::source::{ByteSource, RawChunk, SourcePoll};
use crate::video::{JpegDecoder, PixelBuffer};

/// What a single tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A frame reached the display
    Presented { sequence: u64 },
    /// A frame was decoded badly and dropped; the previous image stays
    Skipped { sequence: u64 },
    /// No complete frame arrived in time
    Missed,
    /// Dropped because the previous tick was still running
    Overrun,
    /// The session stopped on request
    Stopped,
    /// A one-shot source ran out of frames
    Finished,
    /// A fatal fault ended the session
    Fatal(String),
    /// No session is running
    Idle,
}

/// Result of the frame acquisition phase
enum Acquire {
    Frame(FrameBuffer),
    Miss,
    Stop,
    Finished,
    Fatal(String),
}

pub struct FrameScheduler {
    source: Box<dyn ByteSource>,
    chunk: RawChunk,
    extractor: MjpegFrameExtractor,
    decoder: JpegDecoder,
    pixels: BufferPool<PixelBuffer>,
    claim: DisplayClaim,
    interval: Duration,
    stall_threshold: u32,
    poll_budget: u32,
    stop: StopToken,
    state: PlaybackState,
    consecutive_misses: u32,
    /// When the last tick's work finished
    busy_until: Option<Instant>,
    stats: PlaybackStats,
    observer: Option<Box<dyn PlaybackObserver>>,
}

impl FrameScheduler {
    pub fn new(
        source: Box<dyn ByteSource>,
        claim: DisplayClaim,
        interval: Duration,
        tuning: &PipelineTuning,
        stop: StopToken,
    ) -> Self {
        let geometry = claim.geometry();
        Self {
            source,
            chunk: RawChunk::new(tuning.chunk_size),
            extractor: MjpegFrameExtractor::new(tuning.max_frame_bytes, tuning.frame_pool),
            decoder: JpegDecoder::new(geometry, tuning.max_width, tuning.max_height),
            pixels: BufferPool::new(tuning.pixel_pool, || PixelBuffer::new(geometry)),
            claim,
            interval,
            stall_threshold: tuning.stall_threshold,
            poll_budget: tuning.poll_budget,
            stop,
            state: PlaybackState::Buffering,
            consecutive_misses: 0,
            busy_until: None,
            stats: PlaybackStats::default(),
            observer: None,
        }
    }

    pub fn set_observer(&mut self, observer: Option<Box<dyn PlaybackObserver>>) {
        self.observer = observer;
    }

    pub fn take_observer(&mut self) -> Option<Box<dyn PlaybackObserver>> {
        self.observer.take()
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn stats(&self) -> PlaybackStats {
        let mut stats = self.stats.clone();
        stats.sync_errors = self.extractor.sync_errors();
        stats
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn source(&self) -> &dyn ByteSource {
        self.source.as_ref()
    }

    /// Frame and pixel slot counts, fixed for the session
    pub fn pool_capacity(&self) -> (usize, usize) {
        (self.extractor.pool_capacity(), self.pixels.capacity())
    }

    /// Frame and pixel slots currently handed out
    pub fn buffers_in_use(&self) -> (usize, usize) {
        (self.extractor.pool_in_use(), self.pixels.in_use())
    }

    /// Run one tick that fired at `fired_at`
    pub fn tick_at(&mut self, fired_at: Instant) -> TickOutcome {
        if self.state.is_terminal() {
            return TickOutcome::Stopped;
        }
        if self.stop.is_stop_requested() {
            self.halt();
            return TickOutcome::Stopped;
        }
        if let Some(busy_until) = self.busy_until {
            if fired_at < busy_until {
                self.stats.overruns += 1;
                debug!("Tick overrun, skipping");
                return TickOutcome::Overrun;
            }
        }

        self.stats.ticks += 1;
        let deadline = fired_at + self.interval;
        let outcome = match self.acquire(deadline) {
            Acquire::Frame(frame) => self.render(frame),
            Acquire::Miss => self.miss(),
            Acquire::Stop => {
                self.halt();
                TickOutcome::Stopped
            }
            Acquire::Finished => {
                info!("End of video: {}", self.source.describe());
                self.halt();
                TickOutcome::Finished
            }
            Acquire::Fatal(reason) => self.fail(reason),
        };
        self.busy_until = Some(Instant::now());
        outcome
    }

    /// Replace the byte source, dropping all buffered bytes.
    ///
    /// Tick timing is kept; the session goes back to Buffering.
    pub fn swap_source(&mut self, source: Box<dyn ByteSource>) {
        let mut old = std::mem::replace(&mut self.source, source);
        old.close();
        self.extractor.reset();
        self.chunk.clear();
        self.consecutive_misses = 0;
        self.stats.source_swaps += 1;
        info!("Source switched to {}", self.source.describe());
        if !self.state.is_terminal() {
            self.set_state(PlaybackState::Buffering);
        }
    }

    /// Stop immediately: close the source, no further polls or presents
    pub fn halt(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.source.close();
        self.set_state(PlaybackState::Stopped);
    }

    fn acquire(&mut self, deadline: Instant) -> Acquire {
        let mut polls = 0;
        let mut end_seen = false;
        loop {
            match self.extractor.next_frame() {
                Ok(Extracted::Frame(frame)) => return Acquire::Frame(frame),
                Ok(Extracted::NeedMoreData) => {}
                Err(FrameSyncError::PoolExhausted) => {
                    warn!("No free frame slot");
                    return Acquire::Miss;
                }
                Err(e) => {
                    self.notify(PlaybackEvent::Resynced(e));
                    continue;
                }
            }

            if self.stop.is_stop_requested() {
                return Acquire::Stop;
            }
            if polls >= self.poll_budget || (polls > 0 && Instant::now() >= deadline) {
                return Acquire::Miss;
            }
            polls += 1;

            match self.source.poll(&mut self.chunk) {
                Ok(SourcePoll::Data(n)) => {
                    self.stats.bytes_read += n as u64;
                    if let Err(e) = self.extractor.feed(self.chunk.filled()) {
                        self.notify(PlaybackEvent::Resynced(e));
                    }
                }
                Ok(SourcePoll::EndOfStream) => {
                    self.stats.end_of_streams += 1;
                    self.extractor.reset();
                    self.notify(PlaybackEvent::EndOfStream);
                    if self.source.is_exhausted() {
                        return Acquire::Finished;
                    }
                    // One wrap per tick keeps an empty looping file from spinning
                    if end_seen {
                        return Acquire::Miss;
                    }
                    end_seen = true;
                }
                Err(e) => {
                    self.stats.io_errors += 1;
                    if !e.is_retryable() {
                        return Acquire::Fatal(e.to_string());
                    }
                    match e {
                        SourceError::Backoff { .. } | SourceError::Timeout { .. } => {
                            debug!("{}", e)
                        }
                        _ => warn!("{}", e),
                    }
                    self.notify(PlaybackEvent::SourceFault {
                        reason: e.to_string(),
                    });
                    return Acquire::Miss;
                }
            }
        }
    }

    fn render(&mut self, frame: FrameBuffer) -> TickOutcome {
        let sequence = frame.sequence();
        let Some(mut pixels) = self.pixels.acquire() else {
            self.extractor.recycle(frame);
            warn!("No free pixel buffer");
            return self.miss();
        };

        let decoded = self.decoder.decode(&frame, &mut pixels);
        self.extractor.recycle(frame);

        if let Err(e) = decoded {
            self.pixels.release(pixels);
            if e.is_fatal() {
                return self.fail(e.to_string());
            }
            warn!(sequence, "Skipping frame: {}", e);
            self.stats.frames_skipped += 1;
            self.notify(PlaybackEvent::FrameSkipped {
                sequence,
                reason: e.to_string(),
            });
            self.count_miss();
            return TickOutcome::Skipped { sequence };
        }

        // A stop requested during decode discards the frame
        if self.stop.is_stop_requested() {
            self.pixels.release(pixels);
            self.halt();
            return TickOutcome::Stopped;
        }

        let presented = self.claim.present(&pixels);
        self.pixels.release(pixels);
        if let Err(e) = presented {
            return self.fail(e.to_string());
        }

        self.stats.frames_presented += 1;
        self.consecutive_misses = 0;
        if matches!(self.state, PlaybackState::Buffering | PlaybackState::Stalled) {
            self.set_state(PlaybackState::Playing);
        }
        self.notify(PlaybackEvent::FramePresented { sequence });
        TickOutcome::Presented { sequence }
    }

    fn miss(&mut self) -> TickOutcome {
        self.count_miss();
        TickOutcome::Missed
    }

    fn count_miss(&mut self) {
        self.stats.missed_ticks += 1;
        self.consecutive_misses = self.consecutive_misses.saturating_add(1);
        if self.state == PlaybackState::Playing && self.consecutive_misses >= self.stall_threshold {
            warn!(
                "No new frame for {} ticks, stalled",
                self.consecutive_misses
            );
            self.set_state(PlaybackState::Stalled);
        }
    }

    fn fail(&mut self, reason: String) -> TickOutcome {
        error!("Playback failed: {}", reason);
        self.source.close();
        self.set_state(PlaybackState::Error(reason.clone()));
        TickOutcome::Fatal(reason)
    }

    fn set_state(&mut self, to: PlaybackState) {
        if self.state == to {
            return;
        }
        let from = std::mem::replace(&mut self.state, to.clone());
        info!("State: {} -> {}", from, to);
        self.notify(PlaybackEvent::StateChanged { from, to });
    }

    fn notify(&mut self, event: PlaybackEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer.on_event(&event, &self.stop);
        }
    }
}
