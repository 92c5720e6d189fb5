// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pclmtoraster — CUPS filter converting PCLm documents to CUPS/PWG raster.
//
// Entry point. Initialises logging, parses the standard filter arguments and
// runs the job, writing the raster stream to standard output.

mod job;
mod logging;
mod staging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use pclmraster_core::{JobOptions, RasterError};

use job::{JobEnvironment, JobRequest};

/// Standard CUPS filter arguments.
#[derive(Debug, Parser)]
#[command(
    name = "pclmtoraster",
    version,
    about = "Convert a PCLm document to CUPS or PWG raster"
)]
struct Cli {
    job_id: String,
    user: String,
    #[arg(allow_hyphen_values = true)]
    title: String,
    copies: String,
    /// Job options as `name=value` pairs separated by spaces.
    #[arg(allow_hyphen_values = true)]
    options: String,
    /// Input document; standard input is staged to a temporary file when
    /// omitted.
    file: Option<PathBuf>,
}

fn main() -> ExitCode {
    logging::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            tracing::debug!(kind = ?err.kind(), "Argument parsing failed");
            let usage = RasterError::Usage(
                "pclmtoraster job-id user title copies options [file]".to_string(),
            );
            tracing::error!("{}", usage);
            return ExitCode::FAILURE;
        }
    };

    let request = JobRequest {
        job_id: cli.job_id,
        user: cli.user,
        title: cli.title,
        copies: cli.copies,
        options: JobOptions::parse(&cli.options),
        input: cli.file,
    };

    match job::run_job(&request, &JobEnvironment::from_env()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
