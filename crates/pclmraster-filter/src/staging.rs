// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Input staging. The document reader needs a seekable file, so a job fed on
// standard input is copied to a temporary file first.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use pclmraster_core::error::{RasterError, Result};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

/// The document a job reads from.
#[derive(Debug)]
pub enum JobInput {
    /// A file named on the command line.
    File(PathBuf),
    /// Standard input copied to a temporary file, removed on drop.
    Staged(NamedTempFile),
}

impl JobInput {
    pub fn path(&self) -> &Path {
        match self {
            Self::File(path) => path,
            Self::Staged(file) => file.path(),
        }
    }
}

/// Resolve the job input: the named file, which must be readable, or staged
/// standard input.
pub fn open_input(file: Option<&Path>) -> Result<JobInput> {
    match file {
        Some(path) => {
            File::open(path).map_err(|err| {
                RasterError::Staging(format!("can't open input file {}: {}", path.display(), err))
            })?;
            Ok(JobInput::File(path.to_path_buf()))
        }
        None => stage(io::stdin().lock()).map(JobInput::Staged),
    }
}

/// Copy `input` into a fresh temporary file.
#[instrument(skip_all)]
pub fn stage<R: Read>(mut input: R) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("pclmtoraster-")
        .suffix(".pdf")
        .tempfile()
        .map_err(|err| RasterError::Staging(format!("can't create temporary file: {}", err)))?;

    let copied = io::copy(&mut input, &mut file)
        .and_then(|n| file.flush().map(|_| n))
        .map_err(|err| {
            RasterError::Staging(format!("can't copy stdin to temporary file: {}", err))
        })?;

    debug!(bytes = copied, path = %file.path().display(), "Staged standard input");
    Ok(file)
}
