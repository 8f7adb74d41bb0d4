//! Error types for the image recoder.
//!
//! Provides a hierarchy of error types using `thiserror` for ergonomic error handling.

use std::io;
use serde::Serialize;
use thiserror::Error;

/// Main error type for the conversion pipeline.
///
/// `Decode` and `Encode` abort only the single image they occurred on; the
/// batch orchestrator catches them per image and continues. `Store` errors
/// come from the persistence backend and are propagated to the caller.
///
/// A missed byte budget is deliberately *not* an error: the budget is a
/// target, and the compressor returns its best attempt with a flag instead.
#[derive(Error, Debug, Serialize)]
pub enum ConverterError {
    /// Input bytes are not a supported or parseable image
    #[error("Decode error: {0}")]
    Decode(String),

    /// The target encoder refused the parameters or the raster
    #[error("Encode error: {0}")]
    Encode(String),

    /// Unsupported or unrecognized image format name
    #[error("Format error: {0}")]
    Format(String),

    /// File IO error
    #[error("IO error: {0}")]
    Io(String),

    /// Persistence backend failure
    #[error("Store error: {0}")]
    Store(String),
}

/// Convenience result type for converter operations.
pub type ConverterResult<T> = Result<T, ConverterError>;

// Helper methods for error creation
impl ConverterError {
    pub fn decode<T: Into<String>>(msg: T) -> Self {
        Self::Decode(msg.into())
    }

    pub fn encode<T: Into<String>>(msg: T) -> Self {
        Self::Encode(msg.into())
    }

    pub fn format<T: Into<String>>(msg: T) -> Self {
        Self::Format(msg.into())
    }

    pub fn store<T: Into<String>>(msg: T) -> Self {
        Self::Store(msg.into())
    }
}

// Convert std::io::Error to ConverterError
impl From<io::Error> for ConverterError {
    fn from(err: io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
