// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the raster filter: device colorspaces, color orders,
// source colorspaces, page rotation, duplex attributes and extracted pages.

use serde::{Deserialize, Serialize};

use crate::error::{RasterError, Result};

/// Target colorspace of the raster device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorSpace {
    /// Luminance, 0 = black.
    #[serde(rename = "W")]
    White,
    /// Black ink, 0 = no ink.
    #[serde(rename = "K")]
    Black,
    /// sGray luminance.
    #[serde(rename = "SW")]
    SWhite,
    #[serde(rename = "CMY")]
    Cmy,
    #[serde(rename = "CMYK")]
    Cmyk,
    #[serde(rename = "RGB")]
    Rgb,
    #[serde(rename = "sRGB")]
    Srgb,
    #[serde(rename = "AdobeRGB")]
    AdobeRgb,
}

impl ColorSpace {
    /// `cups_cspace_t` value written into the page header.
    pub fn cups_code(&self) -> u32 {
        match self {
            Self::White => 0,
            Self::Rgb => 1,
            Self::Black => 3,
            Self::Cmy => 4,
            Self::Cmyk => 6,
            Self::SWhite => 18,
            Self::Srgb => 19,
            Self::AdobeRgb => 20,
        }
    }

    /// Inverse of [`ColorSpace::cups_code`].
    pub fn from_cups_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => Self::White,
            1 => Self::Rgb,
            3 => Self::Black,
            4 => Self::Cmy,
            6 => Self::Cmyk,
            18 => Self::SWhite,
            19 => Self::Srgb,
            20 => Self::AdobeRgb,
            _ => return None,
        })
    }

    /// Number of color channels the device expects per pixel.
    pub fn num_colors(&self) -> u32 {
        match self {
            Self::White | Self::Black | Self::SWhite => 1,
            Self::Cmy | Self::Rgb | Self::Srgb | Self::AdobeRgb => 3,
            Self::Cmyk => 4,
        }
    }

    /// Parse a colorspace from a `cupsColorSpace`/`ColorModel` style name or
    /// a numeric `cups_cspace_t` code. Matching is case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        if let Ok(code) = name.parse::<u32>() {
            return Self::from_cups_code(code);
        }
        Some(match name.to_ascii_lowercase().as_str() {
            "w" | "white" | "gray" | "grey" => Self::White,
            "k" | "black" | "kgray" => Self::Black,
            "sw" | "sgray" | "swhite" => Self::SWhite,
            "cmy" => Self::Cmy,
            "cmyk" => Self::Cmyk,
            "rgb" => Self::Rgb,
            "srgb" => Self::Srgb,
            "adobergb" | "adobe-rgb" => Self::AdobeRgb,
            _ => return None,
        })
    }
}

/// Layout of multi-channel pixel data in the raster stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorOrder {
    /// Channels interleaved per pixel.
    Chunked,
    /// Each channel in its own band of the row.
    Banded,
    /// Each channel in its own pass over the whole page.
    Planar,
}

impl ColorOrder {
    /// `cups_order_t` value written into the page header.
    pub fn cups_code(&self) -> u32 {
        match self {
            Self::Chunked => 0,
            Self::Banded => 1,
            Self::Planar => 2,
        }
    }

    pub fn from_cups_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Chunked),
            1 => Some(Self::Banded),
            2 => Some(Self::Planar),
            _ => None,
        }
    }

    /// Parse `chunked`/`banded`/`planar` or the numeric code.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        if let Ok(code) = name.parse::<u32>() {
            return Self::from_cups_code(code);
        }
        match name.to_ascii_lowercase().as_str() {
            "chunked" | "chunky" => Some(Self::Chunked),
            "banded" => Some(Self::Banded),
            "planar" => Some(Self::Planar),
            _ => None,
        }
    }
}

/// Colorspace of the image strips inside the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceColorSpace {
    Gray,
    Rgb,
    Cmyk,
}

impl SourceColorSpace {
    /// Parse a PDF device colorspace name, with or without the leading `/`.
    pub fn from_pdf_name(name: &str) -> Option<Self> {
        match name.trim_start_matches('/') {
            "DeviceGray" => Some(Self::Gray),
            "DeviceRGB" => Some(Self::Rgb),
            "DeviceCMYK" => Some(Self::Cmyk),
            _ => None,
        }
    }

    /// Resolve a page's declared colorspace. Pages without a declaration are
    /// DeviceRGB; anything outside Gray/RGB/CMYK is fatal.
    pub fn resolve(declared: Option<&str>) -> Result<Self> {
        match declared {
            None => Ok(Self::Rgb),
            Some(name) => Self::from_pdf_name(name)
                .ok_or_else(|| RasterError::UnsupportedColorSpace(name.to_string())),
        }
    }

    /// Bytes per pixel of the 8-bit chunked strip data.
    pub fn components(&self) -> usize {
        match self {
            Self::Gray => 1,
            Self::Rgb => 3,
            Self::Cmyk => 4,
        }
    }

    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Gray => "DeviceGray",
            Self::Rgb => "DeviceRGB",
            Self::Cmyk => "DeviceCMYK",
        }
    }
}

/// Axis-aligned page rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Convert a `/Rotate` value. Anything but 0/90/180/270 is fatal.
    pub fn from_degrees(degrees: i64) -> Result<Self> {
        match degrees {
            0 => Ok(Self::Deg0),
            90 => Ok(Self::Deg90),
            180 => Ok(Self::Deg180),
            270 => Ok(Self::Deg270),
            other => Err(RasterError::InvalidRotation(other)),
        }
    }

    pub fn degrees(&self) -> u32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Whether the rotation exchanges page width and height.
    pub fn swaps_axes(&self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }

    /// Add a half turn, modulo 360.
    pub fn half_turn(&self) -> Self {
        match self {
            Self::Deg0 => Self::Deg180,
            Self::Deg90 => Self::Deg270,
            Self::Deg180 => Self::Deg0,
            Self::Deg270 => Self::Deg90,
        }
    }
}

/// Wire dialect of the page headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RasterDialect {
    /// CUPS raster v3, uncompressed, margins and imaging box populated.
    #[default]
    Legacy,
    /// PWG raster, compressed, margins and imaging box zeroed.
    Pwg,
}

/// How the device prints the back side of a duplex sheet (`cupsBackSide`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BacksideMode {
    #[default]
    Normal,
    ManualTumble,
    Rotated,
    Flipped,
}

impl BacksideMode {
    /// Case-insensitive attribute parse; unknown or garbled values are `Normal`.
    pub fn from_attribute(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "manualtumble" => Self::ManualTumble,
            "rotated" => Self::Rotated,
            "flipped" => Self::Flipped,
            _ => Self::Normal,
        }
    }
}

/// Value of the `APDuplexRequiresFlippedMargin` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FlippedMargin {
    #[default]
    Unspecified,
    True,
    False,
}

impl FlippedMargin {
    /// `true` (any case) is `True`; every other present value is `False`.
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value {
            None => Self::Unspecified,
            Some(v) if v.trim().eq_ignore_ascii_case("true") => Self::True,
            Some(_) => Self::False,
        }
    }
}

/// One image XObject of a page, decoded to 8-bit chunked samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageStrip {
    pub width: u32,
    pub height: u32,
    /// PDF colorspace name without the leading slash, if it was a name.
    pub color_space: Option<String>,
    pub data: Vec<u8>,
}

/// Everything the filter needs to know about one source page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageDescription {
    /// 0-based page index in document order.
    pub index: usize,
    /// Raw `/Rotate` value.
    pub rotate: i64,
    /// `[llx, lly, urx, ury]` in points, `None` when absent or malformed.
    pub media_box: Option<[f64; 4]>,
    /// Image strips in extraction order.
    pub strips: Vec<ImageStrip>,
}

impl PageDescription {
    /// Colorspace declared by the page, taken from its last image strip.
    pub fn declared_color_space(&self) -> Option<&str> {
        self.strips.last().and_then(|strip| strip.color_space.as_deref())
    }
}
