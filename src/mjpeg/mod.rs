//! MJPEG module
//!
//! Frame boundary detection for motion-JPEG byte streams.

pub mod container;
mod extractor;
mod frame;
pub mod markers;

pub use container::VideoInfo;
pub use extractor::{Extracted, MjpegFrameExtractor};
pub use frame::FrameBuffer;
