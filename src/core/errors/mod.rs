//! Error types for the triage pipeline.
//!
//! This module provides the [`TriageError`] enum, the [`ProcessingStage`] tag
//! and ergonomic constructors for building errors with context.
//!
//! # Usage
//!
//! ```rust
//! use chest_triage::core::errors::{ProcessingStage, TriageError};
//!
//! let error = TriageError::unsupported_format("no known byte signature");
//! assert!(error.is_terminal());
//!
//! let error = TriageError::processing_error(
//!     ProcessingStage::Resize,
//!     "center crop",
//!     std::io::Error::other("empty image"),
//! );
//! assert!(!error.is_terminal());
//! ```

pub mod constructors;
pub mod types;

pub use types::{OpaqueError, ProcessingStage, TriageError};

/// Convenient result alias for triage operations.
pub type TriageResult<T> = Result<T, TriageError>;
