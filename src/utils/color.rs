//! Color utilities
//!
//! Conversions between 24-bit RGB and the 16-bit RGB565 layout used by most
//! small SPI panels.

/// Pack RGB888 into RGB565
pub fn rgb_to_565(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 & 0xF8) << 8) | ((g as u16 & 0xFC) << 3) | (b as u16 >> 3)
}

/// Expand RGB565 to RGB888
///
/// The low bits are filled from the high bits so full-scale values map back
/// to 255 rather than 248/252.
pub fn rgb565_to_rgb(pixel: u16) -> (u8, u8, u8) {
    let r5 = ((pixel >> 11) & 0x1F) as u8;
    let g6 = ((pixel >> 5) & 0x3F) as u8;
    let b5 = (pixel & 0x1F) as u8;
    ((r5 << 3) | (r5 >> 2), (g6 << 2) | (g6 >> 4), (b5 << 3) | (b5 >> 2))
}

/// Write one RGB565 pixel in little-endian byte order
pub fn write_565_le(out: &mut [u8], r: u8, g: u8, b: u8) {
    let [lo, hi] = rgb_to_565(r, g, b).to_le_bytes();
    out[0] = lo;
    out[1] = hi;
}

/// Read one little-endian RGB565 pixel
pub fn read_565_le(bytes: &[u8]) -> (u8, u8, u8) {
    rgb565_to_rgb(u16::from_le_bytes([bytes[0], bytes[1]]))
}
