//! MJPEG Player
//!
//! Bounded-memory motion-JPEG playback for small displays. Bytes from a
//! local file or an HTTP stream are split into JPEG frames, decoded into the
//! display's native pixel format and presented on a fixed tick:
//!
//! ```text
//! ByteSource -> MjpegFrameExtractor -> JpegDecoder -> FrameScheduler -> DisplaySink
//! ```
//!
//! [`PlaybackController`] wires the pipeline together and owns its lifecycle.

pub mod config;
pub mod display;
pub mod error;
pub mod mjpeg;
pub mod player;
pub mod pool;
pub mod source;
pub mod utils;
pub mod video;

#[cfg(test)]
mod test_utils;

pub use config::{PipelineTuning, PlaybackConfig};
pub use display::{DisplayGeometry, DisplayHandle, DisplaySink, PixelFormat};
pub use error::{PlayerError, Result};
pub use player::{PlaybackController, PlaybackState, PlaybackStats, TickOutcome};
pub use source::VideoSource;
