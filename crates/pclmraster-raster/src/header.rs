// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster page header — job-wide `cups_page_header2_t` fields taken from the
// raster profile. Framing and byte layout belong to `print_raster`.

use pclmraster_core::error::{RasterError, Result};
use pclmraster_core::{DeviceRasterProfile, RasterDialect};
use print_raster::model::cups::{
    CupsAdvance, CupsColorOrder, CupsColorSpace, CupsCut, CupsImagingBoundingBox, CupsJog,
    CupsLeadingEdge, CupsMargins, CupsOrientation, CupsPageHeaderV1, CupsPageSize,
    CupsResolution,
};

pub use print_raster::model::cups::CupsPageHeaderV2 as PageHeader;

/// `MediaClass` value PWG raster requires.
pub const PWG_MEDIA_CLASS: &str = "PwgRaster";

/// Header with every job-wide field set. Page size, margins and pixel
/// dimensions are filled in per page.
pub fn page_header(profile: &DeviceRasterProfile) -> Result<PageHeader> {
    let color_space = CupsColorSpace::try_from(profile.color_space.cups_code())
        .map_err(|err| RasterError::UnsupportedColorSpace(err.to_string()))?;
    let color_order = CupsColorOrder::try_from(profile.color_order.cups_code())
        .map_err(|err| RasterError::Profile(err.to_string()))?;

    let v1 = CupsPageHeaderV1 {
        media_class: match profile.dialect {
            RasterDialect::Pwg => PWG_MEDIA_CLASS.to_string(),
            RasterDialect::Legacy => String::new(),
        },
        media_color: String::new(),
        media_type: String::new(),
        output_type: String::new(),
        advance_distance: 0,
        advance_media: CupsAdvance::Never,
        collate: false,
        cut_media: CupsCut::Never,
        duplex: profile.duplex,
        resolution: CupsResolution {
            cross_feed: profile.resolution[0],
            feed: profile.resolution[1],
        },
        imaging_bbox: CupsImagingBoundingBox {
            left: 0,
            bottom: 0,
            right: 0,
            top: 0,
        },
        insert_sheet: false,
        jog: CupsJog::Never,
        leading_edge: CupsLeadingEdge::Top,
        margins: CupsMargins { left: 0, bottom: 0 },
        manual_feed: false,
        media_position: 0,
        media_weight: 0,
        mirror_print: false,
        negative_print: false,
        num_copies: 1,
        orientation: CupsOrientation::Portrait,
        output_face_up: false,
        page_size: CupsPageSize {
            width: 0,
            height: 0,
        },
        separations: false,
        tray_switch: false,
        tumble: profile.tumble,
        width: 0,
        height: 0,
        cups_media_type: 0,
        bits_per_color: profile.bits_per_color,
        bits_per_pixel: profile.bits_per_pixel,
        bytes_per_line: 0,
        color_order,
        color_space,
        cups_compression: 0,
        cups_row_count: 0,
        cups_row_feed: 0,
        cups_row_step: 0,
    };

    Ok(PageHeader {
        num_colors: profile.num_colors,
        page_size_name: profile.page_size_name.clone(),
        ..PageHeader::from(v1)
    })
}
