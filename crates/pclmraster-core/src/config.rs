// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Device configuration: the JSON device description that stands in for the
// printer description file, and the immutable job-wide raster profile built
// from it and the job options.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{RasterError, Result};
use crate::options::{JobOptions, is_truthy};
use crate::types::{BacksideMode, ColorOrder, ColorSpace, FlippedMargin, RasterDialect};

/// Bit depths the packer can produce.
pub const SUPPORTED_BITS_PER_COLOR: [u32; 5] = [1, 2, 4, 8, 16];

/// A media size known to the device, in PostScript points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSize {
    pub name: String,
    pub width: f64,
    pub length: f64,
    /// Imageable area `[left, bottom, right, top]` measured from the
    /// lower-left corner of the sheet.
    pub imageable: [f64; 4],
}

impl MediaSize {
    /// Unprintable margins `[left, bottom, right, top]`.
    pub fn margins(&self) -> [f64; 4] {
        [
            self.imageable[0],
            self.imageable[1],
            self.width - self.imageable[2],
            self.length - self.imageable[3],
        ]
    }
}

/// Persistent description of a raster device.
///
/// Loaded from the JSON file named by the `PPD` environment variable.
/// Attribute names follow the printer description keywords the duplex
/// policy and dialect selection read (`cupsBackSide`,
/// `APDuplexRequiresFlippedMargin`, `PWGRaster`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceDescription {
    pub color_space: ColorSpace,
    pub bits_per_color: u32,
    pub color_order: ColorOrder,
    /// Horizontal and vertical resolution in dots per inch.
    pub resolution: [u32; 2],
    pub duplex: bool,
    pub tumble: bool,
    /// Legacy "flip duplex" flag; implies a `Rotated` backside when no
    /// `cupsBackSide` attribute is present.
    pub flip_duplex: bool,
    pub default_page_size: Option<String>,
    pub media_sizes: Vec<MediaSize>,
    /// Margins `[left, bottom, right, top]` used for sizes not in
    /// `media_sizes`.
    pub custom_margins: [f64; 4],
    pub attributes: BTreeMap<String, String>,
}

impl Default for DeviceDescription {
    fn default() -> Self {
        Self {
            color_space: ColorSpace::Rgb,
            bits_per_color: 8,
            color_order: ColorOrder::Chunked,
            resolution: [300, 300],
            duplex: false,
            tumble: false,
            flip_duplex: false,
            default_page_size: None,
            media_sizes: Vec::new(),
            custom_margins: [0.0; 4],
            attributes: BTreeMap::new(),
        }
    }
}

impl DeviceDescription {
    /// Load a description from a JSON file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|err| {
            RasterError::Profile(format!(
                "failed to read {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        let description = Self::from_json(&text)?;
        debug!(
            color_space = ?description.color_space,
            bits_per_color = description.bits_per_color,
            media_sizes = description.media_sizes.len(),
            "Device description loaded"
        );
        Ok(description)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Case-insensitive attribute lookup.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Backside handling: an explicit `cupsBackSide` wins, otherwise the
    /// flip-duplex flag means `Rotated`.
    pub fn backside(&self) -> BacksideMode {
        match self.attribute("cupsBackSide") {
            Some(value) => BacksideMode::from_attribute(value),
            None if self.flip_duplex => BacksideMode::Rotated,
            None => BacksideMode::Normal,
        }
    }
}

/// Where the job profile came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSource {
    /// A device description file was available.
    Description,
    /// Derived from the job options alone.
    Options,
}

/// Job-wide raster parameters. Built once before the first page and only
/// read afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRasterProfile {
    pub color_space: ColorSpace,
    pub bits_per_color: u32,
    pub bits_per_pixel: u32,
    pub color_order: ColorOrder,
    pub num_colors: u32,
    pub resolution: [u32; 2],
    pub duplex: bool,
    pub tumble: bool,
    pub page_size_name: String,
    /// `print-color-mode=bi-level`: hard threshold instead of dithering.
    pub bi_level: bool,
    pub dialect: RasterDialect,
    pub source: ProfileSource,
    pub media_sizes: Vec<MediaSize>,
    /// Margins for unmatched sizes (description) or from the job options.
    pub custom_margins: [f64; 4],
    pub backside: BacksideMode,
    pub flipped_margin: FlippedMargin,
}

impl DeviceRasterProfile {
    /// Build the job profile.
    ///
    /// `final_content_type` is the `FINAL_CONTENT_TYPE` hint from the
    /// spooler; a value mentioning `pwg` selects the PWG dialect.
    #[instrument(skip_all, fields(has_description = description.is_some()))]
    pub fn resolve(
        description: Option<&DeviceDescription>,
        options: &JobOptions,
        final_content_type: Option<&str>,
    ) -> Result<Self> {
        let mut pwg = final_content_type.is_some_and(|t| t.to_ascii_lowercase().contains("pwg"));

        let mut profile = match description {
            Some(desc) => {
                if desc.attribute("PWGRaster").is_some_and(is_truthy) {
                    pwg = true;
                }
                Self::from_description(desc)
            }
            None => {
                debug!("No device description, deriving raster profile from options");
                pwg = match options.get_any(&["media-class", "MediaClass"]) {
                    Some(class) => class.to_ascii_lowercase().contains("pwg"),
                    None => true,
                };
                Self::from_defaults(pwg)
            }
        };
        profile.dialect = if pwg {
            RasterDialect::Pwg
        } else {
            RasterDialect::Legacy
        };

        profile.apply_options(options)?;

        if !SUPPORTED_BITS_PER_COLOR.contains(&profile.bits_per_color) {
            return Err(RasterError::UnsupportedBitDepth(profile.bits_per_color));
        }
        profile.num_colors = profile.color_space.num_colors();
        profile.bits_per_pixel =
            bits_per_pixel(profile.num_colors, profile.bits_per_color, profile.color_order);

        info!(
            color_space = ?profile.color_space,
            bits_per_color = profile.bits_per_color,
            bits_per_pixel = profile.bits_per_pixel,
            color_order = ?profile.color_order,
            dialect = ?profile.dialect,
            duplex = profile.duplex,
            tumble = profile.tumble,
            "Page size requested: {}",
            profile.page_size_name
        );
        Ok(profile)
    }

    fn from_description(desc: &DeviceDescription) -> Self {
        Self {
            color_space: desc.color_space,
            bits_per_color: desc.bits_per_color,
            bits_per_pixel: 0,
            color_order: desc.color_order,
            num_colors: desc.color_space.num_colors(),
            resolution: desc.resolution,
            duplex: desc.duplex,
            tumble: desc.tumble,
            page_size_name: desc.default_page_size.clone().unwrap_or_default(),
            bi_level: false,
            dialect: RasterDialect::Legacy,
            source: ProfileSource::Description,
            media_sizes: desc.media_sizes.clone(),
            custom_margins: desc.custom_margins,
            backside: desc.backside(),
            flipped_margin: FlippedMargin::from_attribute(
                desc.attribute("APDuplexRequiresFlippedMargin"),
            ),
        }
    }

    fn from_defaults(pwg: bool) -> Self {
        Self {
            color_space: if pwg { ColorSpace::Srgb } else { ColorSpace::Rgb },
            bits_per_color: 8,
            bits_per_pixel: 0,
            color_order: ColorOrder::Chunked,
            num_colors: 3,
            resolution: [300, 300],
            duplex: false,
            tumble: false,
            page_size_name: String::new(),
            bi_level: false,
            dialect: RasterDialect::Legacy,
            source: ProfileSource::Options,
            media_sizes: Vec::new(),
            custom_margins: [0.0; 4],
            backside: BacksideMode::Normal,
            flipped_margin: FlippedMargin::Unspecified,
        }
    }

    /// Overlay job options onto the profile.
    fn apply_options(&mut self, options: &JobOptions) -> Result<()> {
        let pwg = self.dialect == RasterDialect::Pwg;
        let from_options = self.source == ProfileSource::Options;

        if let Some(mode) = options.get("print-color-mode") {
            let mode = mode.to_ascii_lowercase();
            if mode.starts_with("bi-level") {
                self.bi_level = true;
                if from_options {
                    self.color_space = ColorSpace::Black;
                    self.bits_per_color = 1;
                }
            } else if from_options && mode.contains("monochrome") {
                self.color_space = if pwg { ColorSpace::SWhite } else { ColorSpace::White };
                self.bits_per_color = 8;
            } else if from_options && mode == "color" {
                self.color_space = if pwg { ColorSpace::Srgb } else { ColorSpace::Rgb };
                self.bits_per_color = 8;
            }
        }

        if let Some(kind) = options.get("pwg-raster-document-type") {
            let (color_space, bits) = parse_document_type(kind).ok_or_else(|| {
                RasterError::Profile(format!("unknown pwg-raster-document-type {kind}"))
            })?;
            self.color_space = color_space;
            self.bits_per_color = bits;
        }

        if let Some(name) = options.get_any(&["cupsColorSpace", "ColorModel"]) {
            self.color_space = ColorSpace::from_name(name)
                .ok_or_else(|| RasterError::UnsupportedColorSpace(name.to_string()))?;
        }

        if let Some(bits) = options.get("cupsBitsPerColor") {
            self.bits_per_color = bits.trim().parse().map_err(|_| {
                RasterError::Profile(format!("cupsBitsPerColor is not a number: {bits}"))
            })?;
        }

        if let Some(order) = options.get("cupsColorOrder") {
            self.color_order = ColorOrder::from_name(order)
                .ok_or_else(|| RasterError::Profile(format!("unknown color order {order}")))?;
        }

        if let Some(value) = options.get_any(&["Resolution", "printer-resolution"]) {
            self.resolution = parse_resolution(value)
                .ok_or_else(|| RasterError::Profile(format!("bad resolution {value}")))?;
        }

        if let Some(duplex) = options.get("Duplex") {
            match duplex.to_ascii_lowercase().as_str() {
                "duplexnotumble" => (self.duplex, self.tumble) = (true, false),
                "duplextumble" => (self.duplex, self.tumble) = (true, true),
                "none" | "false" => self.duplex = false,
                _ => {}
            }
        }
        if let Some(sides) = options.get("sides") {
            match sides.to_ascii_lowercase().as_str() {
                "two-sided-long-edge" => (self.duplex, self.tumble) = (true, false),
                "two-sided-short-edge" => (self.duplex, self.tumble) = (true, true),
                "one-sided" => self.duplex = false,
                _ => {}
            }
        }

        if let Some(size) = options.get_any(&["PageSize", "media-size-name", "media"]) {
            if let Some(first) = size.split(',').map(str::trim).find(|s| !s.is_empty()) {
                self.page_size_name = first.to_string();
            }
        }

        if from_options {
            if let Some(margins) = option_margins(options)? {
                self.custom_margins = margins;
            }
        }

        Ok(())
    }

    /// Bytes in one scanline for one band/plane: `ceil(bpp × width / 8)`.
    pub fn bytes_per_line(&self, width: u32) -> u32 {
        ((u64::from(self.bits_per_pixel) * u64::from(width)).div_ceil(8)) as u32
    }

    /// `cupsBytesPerLine` header value: a full row including every band.
    pub fn header_bytes_per_line(&self, width: u32) -> u32 {
        self.bytes_per_line(width) * self.bands()
    }

    /// Separate passes over the page (planar order).
    pub fn planes(&self) -> u32 {
        match self.color_order {
            ColorOrder::Planar => self.num_colors,
            _ => 1,
        }
    }

    /// Scanlines per row (banded order).
    pub fn bands(&self) -> u32 {
        match self.color_order {
            ColorOrder::Banded => self.num_colors,
            _ => 1,
        }
    }

    /// Odd pages of a duplex job are printed on the back of the sheet.
    pub fn is_backside(&self, page_index: usize) -> bool {
        self.duplex && page_index % 2 == 1
    }
}

/// `cupsBitsPerPixel` for a color layout. Chunked three-channel data below
/// 8 bits is padded to four channels.
pub fn bits_per_pixel(num_colors: u32, bits_per_color: u32, order: ColorOrder) -> u32 {
    match (order, num_colors) {
        (_, 1) => bits_per_color,
        (ColorOrder::Chunked, n) if bits_per_color >= 8 => bits_per_color * n,
        (ColorOrder::Chunked, _) => bits_per_color * 4,
        _ => bits_per_color,
    }
}

/// Parse `600dpi`, `600x300dpi` or `236dpcm` into dots per inch.
pub fn parse_resolution(value: &str) -> Option<[u32; 2]> {
    let value = value.trim().to_ascii_lowercase();
    let (numbers, per_cm) = if let Some(n) = value.strip_suffix("dpcm") {
        (n, true)
    } else if let Some(n) = value.strip_suffix("dpc") {
        (n, true)
    } else if let Some(n) = value.strip_suffix("dpi") {
        (n, false)
    } else {
        (value.as_str(), false)
    };
    let mut parts = numbers.split('x');
    let x: u32 = parts.next()?.trim().parse().ok()?;
    let y: u32 = match parts.next() {
        Some(y) => y.trim().parse().ok()?,
        None => x,
    };
    if parts.next().is_some() || x == 0 || y == 0 {
        return None;
    }
    let scale = |v: u32| {
        if per_cm {
            (f64::from(v) * 2.54).round() as u32
        } else {
            v
        }
    };
    Some([scale(x), scale(y)])
}

/// Parse a PWG document type keyword such as `srgb_8` or `black_1`.
pub fn parse_document_type(value: &str) -> Option<(ColorSpace, u32)> {
    let (space, bits) = value.trim().rsplit_once('_')?;
    let bits: u32 = bits.parse().ok()?;
    let color_space = match space.to_ascii_lowercase().as_str() {
        "black" => ColorSpace::Black,
        "sgray" => ColorSpace::SWhite,
        "srgb" => ColorSpace::Srgb,
        "adobe-rgb" => ColorSpace::AdobeRgb,
        "rgb" => ColorSpace::Rgb,
        "cmyk" => ColorSpace::Cmyk,
        "cmy" => ColorSpace::Cmy,
        _ => return None,
    };
    Some((color_space, bits))
}

/// Margins from `page-left`..`page-top` (points) or the `media-*-margin`
/// options (hundredths of a millimetre).
fn option_margins(options: &JobOptions) -> Result<Option<[f64; 4]>> {
    const SIDES: [&str; 4] = ["left", "bottom", "right", "top"];
    let mut margins = [0.0; 4];
    let mut found = false;
    for (slot, side) in margins.iter_mut().zip(SIDES) {
        if let Some(points) = options.get(&format!("page-{side}")) {
            *slot = parse_number(points)?;
            found = true;
        } else if let Some(hmm) = options.get(&format!("media-{side}-margin")) {
            *slot = parse_number(hmm)? * 72.0 / 2540.0;
            found = true;
        }
    }
    Ok(found.then_some(margins))
}

fn parse_number(value: &str) -> Result<f64> {
    value
        .trim()
        .parse()
        .map_err(|_| RasterError::Profile(format!("not a number: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn description(json: &str) -> DeviceDescription {
        DeviceDescription::from_json(json).unwrap()
    }

    #[test]
    fn bytes_per_line_formula() {
        let opts = JobOptions::parse("cupsColorSpace=W cupsBitsPerColor=8");
        let profile = DeviceRasterProfile::resolve(None, &opts, None).unwrap();
        assert_eq!(profile.bits_per_pixel, 8);
        assert_eq!(profile.bytes_per_line(100), 100);

        let opts = JobOptions::parse("cupsColorSpace=K cupsBitsPerColor=1");
        let profile = DeviceRasterProfile::resolve(None, &opts, None).unwrap();
        assert_eq!(profile.bytes_per_line(10), 2);
    }

    #[test]
    fn banded_rows_multiply_by_channels() {
        let opts = JobOptions::parse("cupsColorSpace=CMYK cupsBitsPerColor=8 cupsColorOrder=banded");
        let profile = DeviceRasterProfile::resolve(None, &opts, None).unwrap();
        assert_eq!(profile.bits_per_pixel, 8);
        assert_eq!(profile.bytes_per_line(100), 100);
        assert_eq!(profile.header_bytes_per_line(100), 400);
        assert_eq!(profile.bands(), 4);
        assert_eq!(profile.planes(), 1);
    }

    #[test]
    fn chunked_sub_byte_color_pads_to_four_channels() {
        assert_eq!(bits_per_pixel(3, 1, ColorOrder::Chunked), 4);
        assert_eq!(bits_per_pixel(4, 2, ColorOrder::Chunked), 8);
        assert_eq!(bits_per_pixel(3, 8, ColorOrder::Chunked), 24);
        assert_eq!(bits_per_pixel(4, 16, ColorOrder::Chunked), 64);
        assert_eq!(bits_per_pixel(4, 4, ColorOrder::Planar), 4);
        assert_eq!(bits_per_pixel(1, 1, ColorOrder::Chunked), 1);
    }

    #[test]
    fn rejects_unsupported_bit_depth() {
        let opts = JobOptions::parse("cupsBitsPerColor=3");
        assert!(matches!(
            DeviceRasterProfile::resolve(None, &opts, None),
            Err(RasterError::UnsupportedBitDepth(3))
        ));
    }

    #[test]
    fn option_path_defaults_to_pwg() {
        let profile = DeviceRasterProfile::resolve(None, &JobOptions::default(), None).unwrap();
        assert_eq!(profile.dialect, RasterDialect::Pwg);
        assert_eq!(profile.color_space, ColorSpace::Srgb);
        assert_eq!(profile.source, ProfileSource::Options);

        let opts = JobOptions::parse("media-class=Photo");
        let profile = DeviceRasterProfile::resolve(None, &opts, None).unwrap();
        assert_eq!(profile.dialect, RasterDialect::Legacy);
        assert_eq!(profile.color_space, ColorSpace::Rgb);
    }

    #[test]
    fn description_path_needs_hint_for_pwg() {
        let desc = description(r#"{"color_space": "CMYK"}"#);
        let profile = DeviceRasterProfile::resolve(Some(&desc), &JobOptions::default(), None).unwrap();
        assert_eq!(profile.dialect, RasterDialect::Legacy);
        assert_eq!(profile.num_colors, 4);

        let profile = DeviceRasterProfile::resolve(
            Some(&desc),
            &JobOptions::default(),
            Some("image/pwg-raster"),
        )
        .unwrap();
        assert_eq!(profile.dialect, RasterDialect::Pwg);

        let desc = description(r#"{"attributes": {"PWGRaster": "Yes"}}"#);
        let profile = DeviceRasterProfile::resolve(Some(&desc), &JobOptions::default(), None).unwrap();
        assert_eq!(profile.dialect, RasterDialect::Pwg);
    }

    #[test]
    fn bi_level_sets_flag() {
        let opts = JobOptions::parse("print-color-mode=bi-level");
        let profile = DeviceRasterProfile::resolve(None, &opts, None).unwrap();
        assert!(profile.bi_level);
        assert_eq!(profile.color_space, ColorSpace::Black);
        assert_eq!(profile.bits_per_color, 1);

        let desc = description(r#"{"color_space": "K", "bits_per_color": 8}"#);
        let profile = DeviceRasterProfile::resolve(Some(&desc), &opts, None).unwrap();
        assert!(profile.bi_level);
        assert_eq!(profile.bits_per_color, 8);
    }

    #[test]
    fn sides_option_sets_duplex_and_tumble() {
        let opts = JobOptions::parse("sides=two-sided-short-edge");
        let profile = DeviceRasterProfile::resolve(None, &opts, None).unwrap();
        assert!(profile.duplex);
        assert!(profile.tumble);
        assert!(profile.is_backside(1));
        assert!(!profile.is_backside(2));
    }

    #[test]
    fn backside_comes_from_attribute_or_flip_duplex() {
        let desc = description(r#"{"duplex": true, "flip_duplex": true}"#);
        assert_eq!(desc.backside(), BacksideMode::Rotated);

        let desc = description(
            r#"{"duplex": true, "flip_duplex": true,
                "attributes": {"cupsBackSide": "Flipped", "APDuplexRequiresFlippedMargin": "false"}}"#,
        );
        let profile = DeviceRasterProfile::resolve(Some(&desc), &JobOptions::default(), None).unwrap();
        assert_eq!(profile.backside, BacksideMode::Flipped);
        assert_eq!(profile.flipped_margin, FlippedMargin::False);
    }

    #[test]
    fn resolution_forms() {
        assert_eq!(parse_resolution("600dpi"), Some([600, 600]));
        assert_eq!(parse_resolution("600x300dpi"), Some([600, 300]));
        assert_eq!(parse_resolution("100dpcm"), Some([254, 254]));
        assert_eq!(parse_resolution("fast"), None);
    }

    #[test]
    fn document_type_keywords() {
        assert_eq!(parse_document_type("black_1"), Some((ColorSpace::Black, 1)));
        assert_eq!(parse_document_type("adobe-rgb_16"), Some((ColorSpace::AdobeRgb, 16)));
        assert_eq!(parse_document_type("lab_8"), None);
    }

    #[test]
    fn option_margins_convert_units() {
        let opts = JobOptions::parse("media-class=legacy page-left=18 media-top-margin=635");
        let profile = DeviceRasterProfile::resolve(None, &opts, None).unwrap();
        assert_eq!(profile.custom_margins[0], 18.0);
        assert!((profile.custom_margins[3] - 18.0).abs() < 1e-9);
    }

    #[test]
    fn load_reads_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device.json");
        std::fs::write(
            &path,
            r#"{"color_space": "sRGB", "media_sizes": [
                {"name": "A4", "width": 595, "length": 842, "imageable": [18, 36, 577, 806]}]}"#,
        )
        .unwrap();
        let desc = DeviceDescription::load(&path).unwrap();
        assert_eq!(desc.color_space, ColorSpace::Srgb);
        assert_eq!(desc.media_sizes[0].margins(), [18.0, 36.0, 18.0, 36.0]);
        assert!(DeviceDescription::load(dir.path().join("missing.json")).is_err());
    }
}
