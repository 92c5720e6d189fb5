// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Colorspace conversion table — maps (device colorspace, page colorspace) to
// an 8-bit row converter.

use pclmraster_core::{ColorSpace, SourceColorSpace};

/// An 8-bit per channel pixel conversion, selected once per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Converter {
    /// Source samples are already in the device layout.
    Identity,
    GrayToBlack,
    GrayToCmy,
    GrayToCmyk,
    GrayToRgb,
    RgbToBlack,
    RgbToWhite,
    RgbToCmy,
    RgbToCmyk,
    CmykToBlack,
    CmykToWhite,
    CmykToCmy,
    CmykToRgb,
}

impl Converter {
    /// Look up the converter for a device/page colorspace pair. Total: pairs
    /// without an entry convert as identity.
    pub fn select(target: ColorSpace, source: SourceColorSpace) -> Self {
        use ColorSpace as T;
        use SourceColorSpace as S;

        match (target, source) {
            (T::Black, S::Gray) => Self::GrayToBlack,
            (T::Black, S::Rgb) => Self::RgbToBlack,
            (T::Black, S::Cmyk) => Self::CmykToBlack,

            (T::White | T::SWhite, S::Rgb) => Self::RgbToWhite,
            (T::White | T::SWhite, S::Cmyk) => Self::CmykToWhite,

            (T::Cmy, S::Gray) => Self::GrayToCmy,
            (T::Cmy, S::Rgb) => Self::RgbToCmy,
            (T::Cmy, S::Cmyk) => Self::CmykToCmy,

            (T::Cmyk, S::Gray) => Self::GrayToCmyk,
            (T::Cmyk, S::Rgb) => Self::RgbToCmyk,

            (T::Rgb | T::Srgb | T::AdobeRgb, S::Gray) => Self::GrayToRgb,
            (T::Rgb | T::Srgb | T::AdobeRgb, S::Cmyk) => Self::CmykToRgb,

            _ => Self::Identity,
        }
    }

    /// Bytes per converted pixel for a page in `source`.
    pub fn output_components(&self, source: SourceColorSpace) -> usize {
        match self {
            Self::Identity => source.components(),
            Self::GrayToBlack | Self::RgbToBlack | Self::RgbToWhite => 1,
            Self::CmykToBlack | Self::CmykToWhite => 1,
            Self::GrayToCmy | Self::GrayToRgb | Self::RgbToCmy => 3,
            Self::CmykToCmy | Self::CmykToRgb => 3,
            Self::GrayToCmyk | Self::RgbToCmyk => 4,
        }
    }

    /// Convert one pixel. `src` holds the source components, `dst` receives
    /// [`Converter::output_components`] bytes.
    pub fn convert_pixel(&self, src: &[u8], dst: &mut [u8]) {
        match self {
            Self::Identity => dst[..src.len()].copy_from_slice(src),
            Self::GrayToBlack => dst[0] = 255 - src[0],
            Self::GrayToCmy => dst[..3].fill(255 - src[0]),
            Self::GrayToCmyk => dst[..4].copy_from_slice(&[0, 0, 0, 255 - src[0]]),
            Self::GrayToRgb => dst[..3].fill(src[0]),
            Self::RgbToBlack => dst[0] = 255 - rgb_to_white(src),
            Self::RgbToWhite => dst[0] = rgb_to_white(src),
            Self::RgbToCmy => dst[..3].copy_from_slice(&rgb_to_cmy(src)),
            Self::RgbToCmyk => dst[..4].copy_from_slice(&rgb_to_cmyk(src)),
            Self::CmykToBlack => dst[0] = cmyk_to_black(src),
            Self::CmykToWhite => dst[0] = 255 - cmyk_to_black(src),
            Self::CmykToCmy => dst[..3].copy_from_slice(&rgb_to_cmy(&cmyk_to_rgb(src))),
            Self::CmykToRgb => dst[..3].copy_from_slice(&cmyk_to_rgb(src)),
        }
    }

    /// Convert `pixels` pixels of a row.
    pub fn convert_row(&self, src: &[u8], dst: &mut [u8], source: SourceColorSpace, pixels: usize) {
        let inc = source.components();
        let outc = self.output_components(source);
        if *self == Self::Identity {
            dst[..pixels * inc].copy_from_slice(&src[..pixels * inc]);
            return;
        }
        for (from, to) in src
            .chunks_exact(inc)
            .zip(dst.chunks_exact_mut(outc))
            .take(pixels)
        {
            self.convert_pixel(from, to);
        }
    }
}

/// Luminance weighting 31/61/8.
fn rgb_to_white(rgb: &[u8]) -> u8 {
    let (r, g, b) = (u32::from(rgb[0]), u32::from(rgb[1]), u32::from(rgb[2]));
    ((31 * r + 61 * g + 8 * b) / 100) as u8
}

fn rgb_to_cmyk(rgb: &[u8]) -> [u8; 4] {
    let c = 255 - u32::from(rgb[0]);
    let m = 255 - u32::from(rgb[1]);
    let y = 255 - u32::from(rgb[2]);
    let mut k = c.min(m).min(y);
    let km = c.max(m).max(y);
    if km > k {
        k = k * k * k / (km * km);
    }
    [(c - k) as u8, (m - k) as u8, (y - k) as u8, k as u8]
}

fn rgb_to_cmy(rgb: &[u8]) -> [u8; 3] {
    let (r, g, b) = (u32::from(rgb[0]), u32::from(rgb[1]), u32::from(rgb[2]));
    let (c, m, y) = (255 - r, 255 - g, 255 - b);
    let k = c.min(m).min(y);
    [
        ((255 - g / 4) * (c - k) / 255 + k) as u8,
        ((255 - b / 4) * (m - k) / 255 + k) as u8,
        ((255 - r / 4) * (y - k) / 255 + k) as u8,
    ]
}

fn cmyk_to_rgb(cmyk: &[u8]) -> [u8; 3] {
    let k = u32::from(cmyk[3]);
    let channel = |v: u8| (255 - (u32::from(v) + k).min(255)) as u8;
    [channel(cmyk[0]), channel(cmyk[1]), channel(cmyk[2])]
}

fn cmyk_to_black(cmyk: &[u8]) -> u8 {
    let (c, m, y) = (u32::from(cmyk[0]), u32::from(cmyk[1]), u32::from(cmyk[2]));
    ((31 * c + 61 * m + 8 * y) / 100 + u32::from(cmyk[3])).min(255) as u8
}
