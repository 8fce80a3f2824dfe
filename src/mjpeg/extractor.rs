//! Incremental MJPEG frame extraction
//!
//! Bytes arrive in arbitrary chunks. The extractor keeps them in a rolling
//! buffer of fixed capacity, locates the start-of-image marker and then walks
//! the JPEG structure to the matching end-of-image marker:
//!
//! - length-prefixed segments (APPn, DQT, DHT, SOFn, COM, the SOS header) are
//!   skipped whole, so an EXIF thumbnail's own EOI never ends the frame
//! - inside entropy-coded data `FF 00` is a stuffed byte, `FF D0..D7` are
//!   restart markers and `FF FF` is fill; any other marker ends the scan
//!
//! Anything between one frame's EOI and the next SOI (multipart boundaries,
//! container frame headers, padding) is discarded.

use tracing::debug;

use super::frame::FrameBuffer;
use super::markers::{self, PREFIX};
use crate::error::FrameSyncError;
use crate::pool::BufferPool;

/// Result of one extraction attempt
#[derive(Debug)]
pub enum Extracted {
    /// A complete frame; hand it back with [`MjpegFrameExtractor::recycle`]
    Frame(FrameBuffer),
    /// No complete frame in the buffered bytes yet
    NeedMoreData,
}

/// Parser position. Inside a frame, the frame always starts at offset 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    /// Looking for SOI
    Seeking,
    /// Expecting a marker at `pos`
    Segment { pos: usize },
    /// Inside entropy-coded data, resume scanning at `pos`
    Entropy { pos: usize },
}

/// Splits a motion-JPEG byte stream into frames
pub struct MjpegFrameExtractor {
    buf: Vec<u8>,
    capacity: usize,
    scan: Scan,
    pool: BufferPool<FrameBuffer>,
    next_sequence: u64,
    sync_errors: u64,
}

impl MjpegFrameExtractor {
    /// Create an extractor whose rolling buffer holds at most `max_frame_bytes`
    pub fn new(max_frame_bytes: usize, pool_slots: usize) -> Self {
        Self {
            buf: Vec::with_capacity(max_frame_bytes),
            capacity: max_frame_bytes,
            scan: Scan::Seeking,
            pool: BufferPool::new(pool_slots, FrameBuffer::new),
            next_sequence: 0,
            sync_errors: 0,
        }
    }

    /// Append newly read bytes.
    ///
    /// If they do not fit, the buffer is cut back to the last start marker
    /// (or emptied) and `FrameSyncError::Overflow` is returned. The new bytes
    /// are kept either way.
    pub fn feed(&mut self, data: &[u8]) -> Result<(), FrameSyncError> {
        let data = if data.len() > self.capacity {
            &data[data.len() - self.capacity..]
        } else {
            data
        };

        let mut result = Ok(());
        if self.buf.len() + data.len() > self.capacity {
            let discarded = self.make_room(data.len());
            self.sync_errors += 1;
            debug!("Extractor overflow, discarded {} bytes", discarded);
            result = Err(FrameSyncError::Overflow { discarded });
        }
        self.buf.extend_from_slice(data);
        result
    }

    /// Try to cut one complete frame out of the buffered bytes
    pub fn next_frame(&mut self) -> Result<Extracted, FrameSyncError> {
        loop {
            let len = self.buf.len();
            match self.scan {
                Scan::Seeking => {
                    match find_soi(&self.buf) {
                        Some(start) => {
                            self.buf.drain(..start);
                            self.scan = Scan::Segment { pos: 2 };
                        }
                        None => {
                            // Keep a trailing 0xFF, it may be the first half of SOI
                            let keep = usize::from(self.buf.last() == Some(&PREFIX));
                            self.buf.drain(..len - keep);
                            return Ok(Extracted::NeedMoreData);
                        }
                    }
                }
                Scan::Segment { pos } => {
                    if pos >= len {
                        return Ok(Extracted::NeedMoreData);
                    }
                    if self.buf[pos] != PREFIX {
                        return Err(self.resync(pos));
                    }
                    // Fill bytes may precede any marker
                    let mut m = pos + 1;
                    while m < len && self.buf[m] == PREFIX {
                        m += 1;
                    }
                    if m >= len {
                        return Ok(Extracted::NeedMoreData);
                    }
                    let marker = self.buf[m];

                    if marker == markers::EOI {
                        return self.emit(m + 1);
                    }
                    if marker == markers::SOI {
                        // A new image began before this one ended
                        return Err(self.restart_at(m - 1));
                    }
                    if marker == markers::STUFFING {
                        return Err(self.resync(m));
                    }
                    if !markers::has_length(marker) {
                        self.scan = Scan::Segment { pos: m + 1 };
                        continue;
                    }
                    if m + 2 >= len {
                        return Ok(Extracted::NeedMoreData);
                    }
                    let seg_len = u16::from_be_bytes([self.buf[m + 1], self.buf[m + 2]]) as usize;
                    if seg_len < 2 {
                        return Err(self.resync(m));
                    }
                    let next = m + 1 + seg_len;
                    if marker == markers::SOS {
                        if next > len {
                            return Ok(Extracted::NeedMoreData);
                        }
                        self.scan = Scan::Entropy { pos: next };
                    } else {
                        self.scan = Scan::Segment { pos: next };
                    }
                }
                Scan::Entropy { pos } => {
                    let Some(rel) = self.buf[pos.min(len)..].iter().position(|&b| b == PREFIX)
                    else {
                        self.scan = Scan::Entropy { pos: len };
                        return Ok(Extracted::NeedMoreData);
                    };
                    let i = pos + rel;
                    if i + 1 >= len {
                        self.scan = Scan::Entropy { pos: i };
                        return Ok(Extracted::NeedMoreData);
                    }
                    let next = self.buf[i + 1];
                    if next == markers::STUFFING || markers::is_restart(next) {
                        self.scan = Scan::Entropy { pos: i + 2 };
                    } else if next == PREFIX {
                        self.scan = Scan::Entropy { pos: i + 1 };
                    } else {
                        // Real marker: EOI, or another table/scan segment
                        self.scan = Scan::Segment { pos: i };
                    }
                }
            }
        }
    }

    /// Return a consumed frame's buffer to the pool
    pub fn recycle(&mut self, frame: FrameBuffer) {
        self.pool.release(frame);
    }

    /// Drop buffered bytes and scan state, e.g. after end of stream or a source swap
    pub fn reset(&mut self) {
        self.buf.clear();
        self.scan = Scan::Seeking;
        self.next_sequence = 0;
    }

    /// Number of bytes currently held in the rolling buffer
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of resynchronizations since creation
    pub fn sync_errors(&self) -> u64 {
        self.sync_errors
    }

    pub fn pool_in_use(&self) -> usize {
        self.pool.in_use()
    }

    pub fn pool_capacity(&self) -> usize {
        self.pool.capacity()
    }

    fn emit(&mut self, frame_len: usize) -> Result<Extracted, FrameSyncError> {
        let Some(mut frame) = self.pool.acquire() else {
            return Err(FrameSyncError::PoolExhausted);
        };
        frame.fill(&self.buf[..frame_len], self.next_sequence);
        self.next_sequence += 1;
        self.buf.drain(..frame_len);
        self.scan = Scan::Seeking;
        Ok(Extracted::Frame(frame))
    }

    /// Treat the SOI at `start` as the beginning of a fresh frame
    fn restart_at(&mut self, start: usize) -> FrameSyncError {
        self.buf.drain(..start);
        self.scan = Scan::Segment { pos: 2 };
        self.sync_errors += 1;
        debug!("Unterminated frame, restarting at offset {}", start);
        FrameSyncError::Corrupt {
            offset: start,
            discarded: start,
        }
    }

    /// Abandon the current frame and look for the next SOI after its start
    fn resync(&mut self, offset: usize) -> FrameSyncError {
        self.sync_errors += 1;
        let discarded = match find_soi(&self.buf[1..]) {
            Some(rel) => {
                let start = rel + 1;
                self.buf.drain(..start);
                self.scan = Scan::Segment { pos: 2 };
                start
            }
            None => {
                let len = self.buf.len();
                self.buf.clear();
                self.scan = Scan::Seeking;
                len
            }
        };
        debug!("Corrupt JPEG structure at offset {}, discarded {} bytes", offset, discarded);
        FrameSyncError::Corrupt { offset, discarded }
    }

    /// Free at least `needed` bytes, keeping the newest partial frame if it fits
    fn make_room(&mut self, needed: usize) -> usize {
        if self.scan != Scan::Seeking && self.buf.len() > 2 {
            if let Some(rel) = rfind_soi(&self.buf[1..]) {
                let start = rel + 1;
                if self.buf.len() - start + needed <= self.capacity {
                    self.buf.drain(..start);
                    self.scan = Scan::Segment { pos: 2 };
                    return start;
                }
            }
        }
        let discarded = self.buf.len();
        self.buf.clear();
        self.scan = Scan::Seeking;
        discarded
    }
}

fn find_soi(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == [PREFIX, markers::SOI])
}

fn rfind_soi(buf: &[u8]) -> Option<usize> {
    buf.windows(2).rposition(|w| w == [PREFIX, markers::SOI])
}
