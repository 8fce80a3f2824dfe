//! Video module
//!
//! JPEG decoding into display-native pixel buffers.
//!
//! # Usage
//!
//! ```rust,ignore
//! use mjpeg_player::video::{JpegDecoder, PixelBuffer};
//!
//! let mut decoder = JpegDecoder::new(geometry, 640, 480);
//! let mut pixels = PixelBuffer::new(geometry);
//! decoder.decode(&frame, &mut pixels)?;
//! ```

mod decoder;
mod pixels;

pub use decoder::{probe, FrameHeader, JpegDecoder};
pub use pixels::PixelBuffer;
