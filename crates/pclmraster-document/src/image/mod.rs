// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — decoding of compressed strip payloads to raw 8-bit samples.

pub mod decoder;

pub use decoder::StripDecoder;
