//! Decoded pixel buffers

use crate::display::{DisplayGeometry, PixelFormat};
use crate::utils::color::{read_565_le, write_565_le};

/// One decoded frame in the display's native layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    geometry: DisplayGeometry,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Allocate a zeroed (black) buffer for the given geometry
    pub fn new(geometry: DisplayGeometry) -> Self {
        Self {
            geometry,
            data: vec![0; geometry.buffer_len()],
        }
    }

    pub fn geometry(&self) -> DisplayGeometry {
        self.geometry
    }

    pub fn width(&self) -> u32 {
        self.geometry.width
    }

    pub fn height(&self) -> u32 {
        self.geometry.height
    }

    pub fn format(&self) -> PixelFormat {
        self.geometry.format
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Write one pixel, converting to the native format
    #[inline]
    pub fn put_rgb(&mut self, x: u32, y: u32, rgb: (u8, u8, u8)) {
        let bpp = self.geometry.format.bytes_per_pixel();
        let idx = (y as usize * self.geometry.width as usize + x as usize) * bpp;
        let out = &mut self.data[idx..idx + bpp];
        match self.geometry.format {
            PixelFormat::Rgb565 => write_565_le(out, rgb.0, rgb.1, rgb.2),
            PixelFormat::Rgb888 => {
                out[0] = rgb.0;
                out[1] = rgb.1;
                out[2] = rgb.2;
            }
        }
    }

    /// Read one pixel back as RGB888
    pub fn rgb_at(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let bpp = self.geometry.format.bytes_per_pixel();
        let idx = (y as usize * self.geometry.width as usize + x as usize) * bpp;
        let px = &self.data[idx..idx + bpp];
        match self.geometry.format {
            PixelFormat::Rgb565 => read_565_le(px),
            PixelFormat::Rgb888 => (px[0], px[1], px[2]),
        }
    }

    /// Expand to an RGB888 image, e.g. for snapshots
    pub fn to_rgb_image(&self) -> image::RgbImage {
        image::RgbImage::from_fn(self.width(), self.height(), |x, y| {
            let (r, g, b) = self.rgb_at(x, y);
            image::Rgb([r, g, b])
        })
    }
}
