// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — page tree walking and stream filter decoding.

pub mod filters;
pub mod reader;

pub use reader::PclmReader;
