//! Utility functions

pub mod color;
