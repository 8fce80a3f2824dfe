//! Display sink trait and native buffer geometry

use serde::{Deserialize, Serialize};

use crate::error::DisplayError;
use crate::video::PixelBuffer;

/// Native pixel layout of a display buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// 16-bit 5-6-5, little-endian byte order
    #[default]
    Rgb565,
    /// 24-bit packed R, G, B
    Rgb888,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgb565 => 2,
            PixelFormat::Rgb888 => 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PixelFormat::Rgb565 => "rgb565",
            PixelFormat::Rgb888 => "rgb888",
        }
    }

    /// Parse a format name as used on the command line and in tuning files
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "rgb565" => Some(PixelFormat::Rgb565),
            "rgb888" | "rgb24" => Some(PixelFormat::Rgb888),
            _ => None,
        }
    }
}

/// Width, height and pixel layout of a display buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayGeometry {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl DisplayGeometry {
    pub const fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self { width, height, format }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Size in bytes of one full-screen buffer
    pub fn buffer_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

/// Receiver of decoded frames.
///
/// Implemented by the device's display driver. `present` is called from the
/// playback tick and must copy or flush the buffer before returning; the
/// buffer goes back to the pool afterwards.
pub trait DisplaySink: Send {
    /// Native geometry of the display buffer
    fn geometry(&self) -> DisplayGeometry;

    /// Write a full frame and trigger the display update
    fn present(&mut self, pixels: &PixelBuffer) -> Result<(), DisplayError>;
}
