//! JPEG marker codes used for framing and header probing

/// Marker prefix byte
pub const PREFIX: u8 = 0xFF;
/// Start of image
pub const SOI: u8 = 0xD8;
/// End of image
pub const EOI: u8 = 0xD9;
/// Start of scan
pub const SOS: u8 = 0xDA;
/// Stuffed zero following 0xFF inside entropy-coded data
pub const STUFFING: u8 = 0x00;
/// Temporary marker (no length)
pub const TEM: u8 = 0x01;

/// Restart markers RST0..RST7 carry no length and may appear inside scans
pub fn is_restart(marker: u8) -> bool {
    (0xD0..=0xD7).contains(&marker)
}

/// Markers that are followed by a two-byte big-endian segment length
pub fn has_length(marker: u8) -> bool {
    !(marker == SOI || marker == EOI || marker == TEM || is_restart(marker))
}

/// Start-of-frame markers (SOF0..SOF15 minus DHT, JPG and DAC)
pub fn is_start_of_frame(marker: u8) -> bool {
    (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

/// Sequential Huffman frames: baseline (SOF0) and extended (SOF1)
pub fn is_sequential(marker: u8) -> bool {
    matches!(marker, 0xC0 | 0xC1)
}

/// Human-readable name of a start-of-frame variant
pub fn frame_kind(marker: u8) -> &'static str {
    match marker {
        0xC0 => "baseline",
        0xC1 => "extended sequential",
        0xC2 => "progressive",
        0xC3 => "lossless",
        0xC5..=0xC7 => "hierarchical",
        0xC9..=0xCB => "arithmetic-coded",
        0xCD..=0xCF => "hierarchical arithmetic-coded",
        _ => "unknown",
    }
}
