// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page assembler — turns one extracted page into one raster page:
// geometry, strip concatenation, header, rotation, conversion and scanline
// emission.

use std::cell::Cell;
use std::io::Write;

use pclmraster_core::error::{RasterError, Result};
use pclmraster_core::{
    DeviceRasterProfile, ImageStrip, PageDescription, ProfileSource, RasterDialect, Rotation,
    SourceColorSpace,
};
use print_raster::model::cups::{CupsImagingBoundingBox, CupsMargins, CupsPageSize};
use tracing::{debug, instrument};

use crate::duplex::SwapState;
use crate::header::{PageHeader, page_header};
use crate::pack::LineAssembler;
use crate::rotate::rotate;
use crate::writer::RasterWriter;

/// How far a media box may be from a known size and still match it.
const SIZE_TOLERANCE: f64 = 5.0;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Sheet size and unprintable margins of one page, in points.
#[derive(Debug, Clone, PartialEq)]
pub struct PageGeometry {
    /// Sheet width and length.
    pub paper: [f64; 2],
    /// `[left, bottom, right, top]`.
    pub margins: [f64; 4],
    /// Name of the matched device media size, if any.
    pub media_name: Option<String>,
}

impl PageGeometry {
    /// Size the page from its media box, the device's media sizes and the
    /// backside swap flags.
    pub fn resolve(
        profile: &DeviceRasterProfile,
        media_box: [f64; 4],
        rotation: Rotation,
        swap: &SwapState,
    ) -> Self {
        let across = (media_box[2] - media_box[0]).abs().trunc();
        let down = (media_box[3] - media_box[1]).abs().trunc();
        let requested = if rotation.swaps_axes() {
            [down, across]
        } else {
            [across, down]
        };

        let mut geometry = match profile.source {
            ProfileSource::Description => Self::match_media(profile, requested),
            ProfileSource::Options => Self {
                paper: requested,
                margins: profile.custom_margins,
                media_name: None,
            },
        };
        if profile.dialect == RasterDialect::Pwg {
            geometry.margins = [0.0; 4];
        }
        swap.swap_margins(&mut geometry.margins);
        geometry
    }

    fn match_media(profile: &DeviceRasterProfile, requested: [f64; 2]) -> Self {
        let near = |a: f64, b: f64| (a - b).abs() <= SIZE_TOLERANCE;

        if let Some(size) = profile
            .media_sizes
            .iter()
            .find(|s| near(s.width, requested[0]) && near(s.length, requested[1]))
        {
            return Self {
                paper: [size.width, size.length],
                margins: size.margins(),
                media_name: Some(size.name.clone()),
            };
        }

        if let Some(size) = profile
            .media_sizes
            .iter()
            .find(|s| near(s.width, requested[1]) && near(s.length, requested[0]))
        {
            let [left, bottom, right, top] = size.imageable;
            return Self {
                paper: [size.length, size.width],
                margins: [bottom, left, size.length - top, size.width - right],
                media_name: Some(size.name.clone()),
            };
        }

        Self {
            paper: requested,
            margins: profile.custom_margins,
            media_name: None,
        }
    }

    /// Write sizes, margins and imaging box into a page header. PWG headers
    /// carry no margins or imaging box.
    pub fn apply(&self, header: &mut PageHeader, dialect: RasterDialect) {
        let [pw, pl] = self.paper;
        let [left, bottom, right, top] = match dialect {
            RasterDialect::Legacy => self.margins,
            RasterDialect::Pwg => [0.0; 4],
        };

        header.page_size_f32 = CupsPageSize {
            width: pw as f32,
            height: pl as f32,
        };
        header.v1.page_size = CupsPageSize {
            width: round(pw),
            height: round(pl),
        };
        header.v1.margins = CupsMargins {
            left: round(left),
            bottom: round(bottom),
        };
        let bbox = match dialect {
            RasterDialect::Legacy => [left, bottom, pw - right, pl - top],
            RasterDialect::Pwg => [0.0; 4],
        };
        header.imaging_bbox_f32 = CupsImagingBoundingBox {
            left: bbox[0] as f32,
            bottom: bbox[1] as f32,
            right: bbox[2] as f32,
            top: bbox[3] as f32,
        };
        header.v1.imaging_bbox = CupsImagingBoundingBox {
            left: round(bbox[0]),
            bottom: round(bbox[1]),
            right: round(bbox[2]),
            top: round(bbox[3]),
        };
        if let Some(name) = &self.media_name {
            header.page_size_name = name.clone();
        }
    }
}

fn round(value: f64) -> u32 {
    (value + 0.5) as u32
}

// ---------------------------------------------------------------------------
// Page image
// ---------------------------------------------------------------------------

/// All strips of a page concatenated into one chunked buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
    /// `(width, height)` of each strip in order.
    strips: Vec<(u32, u32)>,
}

impl PageImage {
    /// Width is the widest strip, height the sum of strip heights.
    pub fn assemble(strips: Vec<ImageStrip>) -> Result<Self> {
        let total = strips.iter().map(|s| s.data.len()).sum();
        let mut image = Self {
            data: Vec::with_capacity(total),
            width: 0,
            height: 0,
            strips: Vec::with_capacity(strips.len()),
        };
        for strip in strips {
            image.width = image.width.max(strip.width);
            image.height = image.height.checked_add(strip.height).ok_or_else(|| {
                RasterError::ImageGeometry(format!(
                    "strip of {} rows after {} rows overflows the page height",
                    strip.height, image.height
                ))
            })?;
            image.strips.push((strip.width, strip.height));
            image.data.extend(strip.data);
        }
        Ok(image)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn strips(&self) -> &[(u32, u32)] {
        &self.strips
    }
}

// ---------------------------------------------------------------------------
// Assembler
// ---------------------------------------------------------------------------

/// Pixel size of a rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderedPage {
    pub width: u32,
    pub height: u32,
}

/// Renders pages of one job against a fixed raster profile.
pub struct PageAssembler<'a> {
    profile: &'a DeviceRasterProfile,
    /// Job-wide backside swap flags. The first backside that swaps both
    /// image axes folds them into a half turn and clears them here.
    swap: Cell<SwapState>,
}

impl<'a> PageAssembler<'a> {
    pub fn new(profile: &'a DeviceRasterProfile) -> Self {
        Self {
            profile,
            swap: Cell::new(SwapState::for_profile(profile)),
        }
    }

    /// The job-wide backside swap flags as they stand now.
    pub fn swap_state(&self) -> SwapState {
        self.swap.get()
    }

    /// Render one page into the stream.
    ///
    /// A page without a media box fails with the non-fatal
    /// [`RasterError::MissingMediaBox`] before anything is written.
    #[instrument(skip_all, fields(page = page.index + 1))]
    pub fn render<W: Write>(
        &self,
        page: PageDescription,
        writer: &mut RasterWriter<'_, W>,
    ) -> Result<RenderedPage> {
        let media_box = page
            .media_box
            .ok_or(RasterError::MissingMediaBox { page: page.index + 1 })?;
        debug!(?media_box, rotate = page.rotate, "mediaBox");

        let rotation = Rotation::from_degrees(page.rotate)?;
        let backside = self.profile.is_backside(page.index);
        let swap = if backside {
            self.swap.get()
        } else {
            SwapState::default()
        };

        let geometry = PageGeometry::resolve(self.profile, media_box, rotation, &swap);
        let source = SourceColorSpace::resolve(page.declared_color_space())?;

        let image = PageImage::assemble(page.strips)?;
        let (width, height) = if rotation.swaps_axes() {
            (image.height(), image.width())
        } else {
            (image.width(), image.height())
        };
        let components = source.components();
        let stride = width as usize * components;
        let rows = height as usize;
        let needed = stride.checked_mul(rows).ok_or_else(|| {
            RasterError::ImageGeometry(format!(
                "page {}: {}x{} {} is too large",
                page.index + 1,
                width,
                height,
                source.pdf_name()
            ))
        })?;
        if image.data().len() < needed {
            return Err(RasterError::ImageGeometry(format!(
                "page {}: {}x{} {} needs {} bytes, strips hold {}",
                page.index + 1,
                width,
                height,
                source.pdf_name(),
                needed,
                image.data().len()
            )));
        }

        let mut header = page_header(self.profile)?;
        geometry.apply(&mut header, self.profile.dialect);
        header.v1.width = width;
        header.v1.height = height;
        header.v1.bytes_per_line = self.profile.header_bytes_per_line(width);
        writer.write_header(&header)?;

        let (folded, rotation) = swap.fold(rotation);
        if folded != swap {
            self.swap.set(folded);
        }
        let swap = folded;
        let pixels = rotate(image.data(), rotation, rows, width as usize, components)?;

        let mut assembler = LineAssembler::new(self.profile, source, width, swap.image_x);
        debug!(
            width,
            height,
            backside,
            degrees = rotation.degrees(),
            converter = ?assembler.converter(),
            mirrored = swap.image_x,
            reversed_rows = swap.image_y,
            "Writing page image"
        );

        let mut line = vec![0u8; assembler.bytes_per_line()];
        for plane in 0..self.profile.planes() as usize {
            for r in 0..rows {
                let row = if swap.image_y { rows - 1 - r } else { r };
                let src = &pixels[row * stride..(row + 1) * stride];
                for band in 0..self.profile.bands() as usize {
                    assembler.assemble(src, row, plane + band, &mut line)?;
                    writer.write_pixels(&line)?;
                }
            }
        }

        Ok(RenderedPage { width, height })
    }
}
