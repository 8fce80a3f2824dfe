//! JPEG frame decoder
//!
//! Decodes one complete JPEG frame into a display-native pixel buffer. The
//! frame header is probed first so that unsupported encodings and oversized
//! frames are rejected before the decoder allocates anything. Frames whose
//! size differs from the display are scaled nearest-neighbor.

use std::io::Cursor;

use image::codecs::jpeg::JpegDecoder as ImageJpegDecoder;
use image::{ColorType, ImageDecoder};
use tracing::debug;

use crate::display::DisplayGeometry;
use crate::error::DecodeError;
use crate::mjpeg::markers::{self, PREFIX};
use crate::mjpeg::FrameBuffer;
use crate::video::PixelBuffer;

/// Dimensions and encoding read from a frame's SOFn segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub width: u32,
    pub height: u32,
    /// SOFn marker byte
    pub marker: u8,
}

impl FrameHeader {
    pub fn is_sequential(&self) -> bool {
        markers::is_sequential(self.marker)
    }
}

/// Walk the header segments of a JPEG up to its frame header
pub fn probe(data: &[u8]) -> Result<FrameHeader, DecodeError> {
    if data.len() < 4 || data[0] != PREFIX || data[1] != markers::SOI {
        return Err(DecodeError::Malformed("missing start of image".into()));
    }

    let mut pos = 2;
    loop {
        if pos >= data.len() {
            return Err(DecodeError::Malformed("truncated before frame header".into()));
        }
        if data[pos] != PREFIX {
            return Err(DecodeError::Malformed(format!(
                "expected marker at offset {pos}, found {:#04x}",
                data[pos]
            )));
        }
        while pos < data.len() && data[pos] == PREFIX {
            pos += 1;
        }
        let Some(&marker) = data.get(pos) else {
            return Err(DecodeError::Malformed("truncated marker".into()));
        };
        pos += 1;

        if marker == markers::SOS || marker == markers::EOI {
            return Err(DecodeError::Malformed("no frame header before scan".into()));
        }
        if !markers::has_length(marker) {
            continue;
        }
        if pos + 2 > data.len() {
            return Err(DecodeError::Malformed("truncated segment length".into()));
        }
        let seg_len = usize::from(u16::from_be_bytes([data[pos], data[pos + 1]]));
        if seg_len < 2 {
            return Err(DecodeError::Malformed(format!(
                "segment length {seg_len} at offset {pos}"
            )));
        }

        if markers::is_start_of_frame(marker) {
            // length(2) precision(1) height(2) width(2)
            if seg_len < 8 || pos + 7 > data.len() {
                return Err(DecodeError::Malformed("truncated frame header".into()));
            }
            let height = u32::from(u16::from_be_bytes([data[pos + 3], data[pos + 4]]));
            let width = u32::from(u16::from_be_bytes([data[pos + 5], data[pos + 6]]));
            if width == 0 || height == 0 {
                return Err(DecodeError::Malformed(format!(
                    "zero frame dimensions {width}x{height}"
                )));
            }
            return Ok(FrameHeader {
                width,
                height,
                marker,
            });
        }
        pos += seg_len;
    }
}

/// Decoder bound to one display geometry
pub struct JpegDecoder {
    target: DisplayGeometry,
    max_width: u32,
    max_height: u32,
    /// Decoded source pixels, reused across frames
    scratch: Vec<u8>,
}

impl JpegDecoder {
    pub fn new(target: DisplayGeometry, max_width: u32, max_height: u32) -> Self {
        Self {
            target,
            max_width,
            max_height,
            scratch: Vec::new(),
        }
    }

    /// Decode `frame` into `out`, scaling to the target geometry.
    ///
    /// On error `out` is left untouched so the previous image stays valid.
    pub fn decode(&mut self, frame: &FrameBuffer, out: &mut PixelBuffer) -> Result<(), DecodeError> {
        if out.geometry() != self.target {
            return Err(DecodeError::TargetMismatch {
                expected: self.target,
                actual: out.geometry(),
            });
        }

        let header = probe(frame.as_bytes())?;
        if !header.is_sequential() {
            return Err(DecodeError::Unsupported(
                markers::frame_kind(header.marker).to_string(),
            ));
        }
        self.check_size(header.width, header.height)?;

        let decoder = ImageJpegDecoder::new(Cursor::new(frame.as_bytes()))
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;
        let (width, height) = decoder.dimensions();
        self.check_size(width, height)?;

        let channels = match decoder.color_type() {
            ColorType::L8 => 1,
            ColorType::La8 => 2,
            ColorType::Rgb8 => 3,
            ColorType::Rgba8 => 4,
            other => {
                return Err(DecodeError::Unsupported(format!("{other:?} output")));
            }
        };

        let len = usize::try_from(decoder.total_bytes())
            .map_err(|_| DecodeError::Malformed("frame too large for address space".into()))?;
        self.scratch.resize(len, 0);
        decoder
            .read_image(&mut self.scratch)
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;

        scale_into(&self.scratch, width, height, channels, out);
        debug!(
            sequence = frame.sequence(),
            width, height, "decoded frame"
        );
        Ok(())
    }

    fn check_size(&self, width: u32, height: u32) -> Result<(), DecodeError> {
        if width > self.max_width || height > self.max_height {
            return Err(DecodeError::TooLarge {
                width,
                height,
                max_width: self.max_width,
                max_height: self.max_height,
            });
        }
        Ok(())
    }
}

/// Nearest-neighbor copy of `src` (packed, `channels` bytes per pixel) into `out`
fn scale_into(src: &[u8], width: u32, height: u32, channels: usize, out: &mut PixelBuffer) {
    let (tw, th) = (out.width(), out.height());
    for y in 0..th {
        let sy = (u64::from(y) * u64::from(height) / u64::from(th)) as usize;
        for x in 0..tw {
            let sx = (u64::from(x) * u64::from(width) / u64::from(tw)) as usize;
            let idx = (sy * width as usize + sx) * channels;
            let px = &src[idx..idx + channels];
            let rgb = if channels < 3 {
                (px[0], px[0], px[0])
            } else {
                (px[0], px[1], px[2])
            };
            out.put_rgb(x, y, rgb);
        }
    }
}
