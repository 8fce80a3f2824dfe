//! Optional MJPG file header
//!
//! Some encoders prefix the raw frame stream with a small little-endian
//! header and put a `(size, timestamp)` pair in front of every frame:
//!
//! ```text
//! u32 signature  "MJPG"
//! u32 width
//! u32 height
//! u32 frame_count
//! u32 fps
//! repeated: u32 size, u32 timestamp_ms, size bytes of JPEG
//! ```
//!
//! The extractor treats the per-frame headers as inter-frame padding; a size
//! field that happens to contain `FF D8` costs one resync at the real SOI.
//! Only the file header is parsed here.

use std::time::Duration;

/// "MJPG" read as a little-endian u32
pub const SIGNATURE: u32 = 0x4750_4A4D;
/// Size of the file header in bytes
pub const HEADER_LEN: usize = 20;

/// Stream metadata from an MJPG file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub frame_count: u32,
    pub fps: u32,
}

impl VideoInfo {
    /// Parse the header, returning `None` when the signature is absent
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN {
            return None;
        }
        let word = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        if word(0) != SIGNATURE {
            return None;
        }
        Some(Self {
            width: word(4),
            height: word(8),
            frame_count: word(12),
            fps: word(16),
        })
    }

    /// Encode as a file header
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        for (i, value) in [SIGNATURE, self.width, self.height, self.frame_count, self.fps]
            .into_iter()
            .enumerate()
        {
            out[i * 4..i * 4 + 4].copy_from_slice(&value.to_le_bytes());
        }
        out
    }

    /// Native frame period in whole milliseconds, if the header carries a frame rate
    pub fn frame_interval(&self) -> Option<Duration> {
        (self.fps > 0).then(|| Duration::from_millis((1000 / u64::from(self.fps)).max(1)))
    }
}
