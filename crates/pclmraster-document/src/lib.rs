// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pclmraster-document — Page extraction for the PCLm raster filter.
//
// Opens the PCLm (PDF) document, walks its pages in order, and hands each page
// to the raster pipeline as a rotation, a media box, and the decoded image
// strips that make up the page bitmap.

pub mod image;
pub mod pdf;

// Re-export the primary structs so callers can use `pclmraster_document::PclmReader` etc.
pub use crate::image::decoder::StripDecoder;
pub use pdf::reader::PclmReader;
