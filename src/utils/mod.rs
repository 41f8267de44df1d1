//! Utility functions for the triage pipeline.
//!
//! This module provides helpers for reading uploads and for working with raw
//! classifier output vectors.

pub mod image;
pub mod probability;

pub use image::read_upload;
pub use probability::{argmax, check_distribution, softmax};
