//! Shared display handle and the exclusive playback claim

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::sink::{DisplayGeometry, DisplaySink};
use crate::error::DisplayError;
use crate::video::PixelBuffer;

struct DisplaySlot {
    id: Uuid,
    name: String,
    geometry: DisplayGeometry,
    claimed: AtomicBool,
    sink: Mutex<Box<dyn DisplaySink>>,
}

/// Cloneable reference to one physical display.
///
/// Any number of handles may exist, but only one [`DisplayClaim`] at a time.
#[derive(Clone)]
pub struct DisplayHandle {
    inner: Arc<DisplaySlot>,
}

impl DisplayHandle {
    /// Wrap a display driver. The geometry is captured once here.
    pub fn new(name: impl Into<String>, sink: impl DisplaySink + 'static) -> Self {
        let geometry = sink.geometry();
        Self {
            inner: Arc::new(DisplaySlot {
                id: Uuid::new_v4(),
                name: name.into(),
                geometry,
                claimed: AtomicBool::new(false),
                sink: Mutex::new(Box::new(sink)),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn geometry(&self) -> DisplayGeometry {
        self.inner.geometry
    }

    pub fn is_claimed(&self) -> bool {
        self.inner.claimed.load(Ordering::Acquire)
    }

    /// Take exclusive ownership of the display for playback
    pub fn claim(&self) -> Result<DisplayClaim, DisplayError> {
        if self
            .inner
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Display '{}' is already claimed", self.inner.name);
            return Err(DisplayError::AlreadyClaimed(self.inner.name.clone()));
        }
        debug!("Claimed display '{}' ({})", self.inner.name, self.inner.id);
        Ok(DisplayClaim {
            inner: Arc::clone(&self.inner),
        })
    }
}

impl std::fmt::Debug for DisplayHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayHandle")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("geometry", &self.inner.geometry)
            .finish()
    }
}

/// Exclusive right to present to a display. Released on drop.
pub struct DisplayClaim {
    inner: Arc<DisplaySlot>,
}

impl DisplayClaim {
    pub fn geometry(&self) -> DisplayGeometry {
        self.inner.geometry
    }

    /// Validate the buffer against the native geometry, then hand it to the driver
    pub fn present(&self, pixels: &PixelBuffer) -> Result<(), DisplayError> {
        let actual = pixels.geometry();
        if actual != self.inner.geometry {
            return Err(DisplayError::GeometryMismatch {
                expected: self.inner.geometry,
                actual,
            });
        }
        self.inner.sink.lock().present(pixels)
    }
}

impl Drop for DisplayClaim {
    fn drop(&mut self) {
        self.inner.claimed.store(false, Ordering::Release);
        debug!("Released display '{}'", self.inner.name);
    }
}
