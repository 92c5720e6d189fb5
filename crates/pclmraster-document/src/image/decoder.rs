// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Strip decoder — turns DCT (JPEG) compressed image strips into raw 8-bit
// chunked samples using the `image` crate.

use image::{DynamicImage, ImageFormat};
use pclmraster_core::SourceColorSpace;
use pclmraster_core::error::{RasterError, Result};
use tracing::{debug, instrument};

/// A decoded JPEG strip awaiting conversion to raw samples.
pub struct StripDecoder {
    /// The decoded strip.
    image: DynamicImage,
}

impl StripDecoder {
    /// Decode a DCT-encoded strip payload.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_jpeg(data: &[u8]) -> Result<Self> {
        let image = image::load_from_memory_with_format(data, ImageFormat::Jpeg).map_err(|err| {
            RasterError::ImageError(format!("failed to decode DCT strip: {}", err))
        })?;
        debug!(
            width = image.width(),
            height = image.height(),
            channels = image.color().channel_count(),
            "Strip decoded"
        );
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Raw samples in the strip's declared colorspace.
    ///
    /// Without a declaration the JPEG's own channel count decides between
    /// gray and RGB. CMYK JPEG payloads are not supported.
    pub fn into_samples(self, declared: Option<SourceColorSpace>) -> Result<Vec<u8>> {
        let declared = declared.unwrap_or(if self.image.color().channel_count() == 1 {
            SourceColorSpace::Gray
        } else {
            SourceColorSpace::Rgb
        });
        match declared {
            SourceColorSpace::Gray => Ok(self.image.into_luma8().into_raw()),
            SourceColorSpace::Rgb => Ok(self.image.into_rgb8().into_raw()),
            SourceColorSpace::Cmyk => Err(RasterError::ImageError(
                "DCT strips in DeviceCMYK are not supported".to_string(),
            )),
        }
    }
}
