//! Display module
//!
//! The pipeline's output side: the [`DisplaySink`] trait implemented by
//! display drivers, the exclusive [`DisplayHandle`] claim and a PNG
//! [`SnapshotSink`] for headless runs.

mod handle;
mod sink;
mod snapshot;

pub use handle::{DisplayClaim, DisplayHandle};
pub use sink::{DisplayGeometry, DisplaySink, PixelFormat};
pub use snapshot::SnapshotSink;
