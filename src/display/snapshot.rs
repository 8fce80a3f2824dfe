//! Headless sink that stores presented frames as PNG files

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::sink::{DisplayGeometry, DisplaySink};
use crate::error::DisplayError;
use crate::video::PixelBuffer;

/// Display sink without a panel.
///
/// Counts presented frames and, when a directory is set, writes every
/// `every`-th frame to `frame_NNNNNN.png` expanded to RGB888.
pub struct SnapshotSink {
    geometry: DisplayGeometry,
    dir: Option<PathBuf>,
    every: u64,
    presented: u64,
    saved: u64,
}

impl SnapshotSink {
    /// Sink that only counts frames
    pub fn new(geometry: DisplayGeometry) -> Self {
        Self {
            geometry,
            dir: None,
            every: 0,
            presented: 0,
            saved: 0,
        }
    }

    /// Save every `every`-th frame into `dir`, creating it if needed
    pub fn with_snapshots(
        geometry: DisplayGeometry,
        dir: impl AsRef<Path>,
        every: u64,
    ) -> Result<Self, DisplayError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .map_err(|e| DisplayError::Sink(format!("cannot create {}: {e}", dir.display())))?;
        info!("Saving every {} frame(s) to {}", every.max(1), dir.display());
        Ok(Self {
            geometry,
            dir: Some(dir),
            every: every.max(1),
            presented: 0,
            saved: 0,
        })
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    pub fn saved(&self) -> u64 {
        self.saved
    }
}

impl DisplaySink for SnapshotSink {
    fn geometry(&self) -> DisplayGeometry {
        self.geometry
    }

    fn present(&mut self, pixels: &PixelBuffer) -> Result<(), DisplayError> {
        self.presented += 1;
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        if self.presented % self.every != 0 {
            return Ok(());
        }

        let path = dir.join(format!("frame_{:06}.png", self.presented));
        pixels
            .to_rgb_image()
            .save(&path)
            .map_err(|e| DisplayError::Sink(format!("{}: {e}", path.display())))?;
        self.saved += 1;
        debug!("Snapshot saved: {}", path.display());
        Ok(())
    }
}
