//! Encoded frame buffer

/// One complete JPEG image, SOI through EOI inclusive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameBuffer {
    data: Vec<u8>,
    sequence: u64,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a frame directly from bytes (tests, single-image sources)
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            sequence: 0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Position of this frame in the stream since the extractor was last reset
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Overwrite contents, keeping the allocation
    pub(crate) fn fill(&mut self, bytes: &[u8], sequence: u64) {
        self.data.clear();
        self.data.extend_from_slice(bytes);
        self.sequence = sequence;
    }
}
