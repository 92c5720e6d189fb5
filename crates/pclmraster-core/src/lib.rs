// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pclmraster — Core types, job options, device profiles and error definitions
// shared across all crates.

pub mod config;
pub mod error;
pub mod options;
pub mod types;

pub use config::{DeviceDescription, DeviceRasterProfile, MediaSize, ProfileSource};
pub use error::RasterError;
pub use options::JobOptions;
pub use types::*;
