// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the raster filter.

use thiserror::Error;

/// Top-level error type for all filter operations.
#[derive(Debug, Error)]
pub enum RasterError {
    // -- Job setup --
    #[error("usage: {0}")]
    Usage(String),

    #[error("device profile error: {0}")]
    Profile(String),

    #[error("specified color format is not supported: {0} bits per color")]
    UnsupportedBitDepth(u32),

    #[error("can't stage input document: {0}")]
    Staging(String),

    // -- Page processing --
    #[error("incorrect rotate value {0}")]
    InvalidRotation(i64),

    #[error("colorspace {0} not supported")]
    UnsupportedColorSpace(String),

    #[error("pdf page {page} doesn't contain a valid media box")]
    MissingMediaBox { page: usize },

    #[error("image data does not match page geometry: {0}")]
    ImageGeometry(String),

    // -- Document errors --
    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image decoding failed: {0}")]
    ImageError(String),

    // -- Output stream --
    #[error("raster stream error: {0}")]
    RasterStream(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RasterError {
    /// Whether this error terminates the whole job.
    ///
    /// Only a missing media box is recoverable: the page is dropped from the
    /// output and the job moves on to the next page.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::MissingMediaBox { .. })
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RasterError>;
