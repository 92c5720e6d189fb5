// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Axis-aligned rotation of a full-page chunked pixel buffer.

use std::borrow::Cow;

use pclmraster_core::Rotation;
use pclmraster_core::error::{RasterError, Result};
use tracing::trace;

/// Rotate `src` so the result is `height` rows of `width` pixels, each pixel
/// `components` bytes.
///
/// `height` and `width` are the dimensions of the *output* page; for 90 and
/// 270 the source has them exchanged. A zero rotation borrows the source.
///
/// Index mapping in pixels, for output row `h` and column `i`:
/// - 90:  `src[(width - 1 - i) * height + h]`
/// - 180: `src[N - 1 - (h * width + i)]`
/// - 270: `src[i * height + (height - 1 - h)]`
pub fn rotate(
    src: &[u8],
    rotation: Rotation,
    height: usize,
    width: usize,
    components: usize,
) -> Result<Cow<'_, [u8]>> {
    if rotation == Rotation::Deg0 {
        return Ok(Cow::Borrowed(src));
    }

    let pixels = height * width;
    let needed = pixels * components;
    if src.len() < needed {
        return Err(RasterError::ImageGeometry(format!(
            "cannot rotate {}x{} page of {} components: have {} bytes, need {}",
            width,
            height,
            components,
            src.len(),
            needed
        )));
    }

    trace!(degrees = rotation.degrees(), width, height, components, "Rotating page");

    let mut dst = vec![0u8; needed];
    for h in 0..height {
        for i in 0..width {
            let from = match rotation {
                Rotation::Deg90 => (width - 1 - i) * height + h,
                Rotation::Deg180 => pixels - 1 - (h * width + i),
                Rotation::Deg270 => i * height + (height - 1 - h),
                Rotation::Deg0 => h * width + i,
            };
            let to = (h * width + i) * components;
            let from = from * components;
            dst[to..to + components].copy_from_slice(&src[from..from + components]);
        }
    }
    Ok(Cow::Owned(dst))
}
