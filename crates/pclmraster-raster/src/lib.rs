// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pclmraster Raster — the pixel pipeline of the filter: duplex backside
// policy, bitmap rotation, colorspace conversion, bit-depth and color-order
// packing, and the CUPS/PWG raster stream the pages are written to.

pub mod colorspace;
pub mod dither;
pub mod duplex;
pub mod header;
pub mod pack;
pub mod page;
pub mod rotate;
pub mod writer;

pub use colorspace::Converter;
pub use duplex::SwapState;
pub use header::{PageHeader, page_header};
pub use pack::LineAssembler;
pub use page::{PageAssembler, PageGeometry, PageImage, RenderedPage};
pub use rotate::rotate;
pub use writer::RasterWriter;
