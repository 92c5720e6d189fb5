// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster stream writer — drives `print_raster`'s CUPS writers over a
// blocking sink, one page at a time.
//
// Legacy streams are CUPS raster v3 (`RaS3`, raw scanlines). PWG streams are
// v2 (`RaS2`), whose scanlines `print_raster` run-length encodes.

use std::io::{self, Write};

use byteorder::BigEndian;
use futures::executor::block_on;
use futures::io::{AllowStdIo, AsyncWriteExt};
use pclmraster_core::RasterDialect;
use pclmraster_core::error::{RasterError, Result};
use print_raster::error::CupsRasterError;
use print_raster::factory::{CupsPageFactoryV2, CupsPageFactoryV3, RasterPageFactory, WithCupsSyncWord};
use print_raster::writer::common::CommonRasterPageWriter;
use print_raster::writer::cups::CupsRasterWriter;
use print_raster::writer::{RasterPageWriter, RasterWriter as _};
use tracing::{debug, instrument, trace};

use crate::header::PageHeader;

/// The blocking sink as `print_raster` sees it.
type Sink<'a, W> = Box<AllowStdIo<&'a mut W>>;

/// Where one stream stands: sync word written, inside a page, or done.
enum Stage<'a, F, W>
where
    F: RasterPageFactory,
    W: Write,
{
    Opened(CupsRasterWriter<F, Sink<'a, W>>),
    Page(CommonRasterPageWriter<F, Sink<'a, W>>),
    Closed,
}

impl<'a, F, W> Stage<'a, F, W>
where
    F: RasterPageFactory<Header = PageHeader, Error = CupsRasterError> + WithCupsSyncWord,
    F::Encoder<Sink<'a, W>>: Unpin,
    W: Write,
{
    fn open(sink: &'a mut W) -> std::result::Result<Self, CupsRasterError> {
        let writer = block_on(CupsRasterWriter::new(Box::pin(AllowStdIo::new(sink))))?;
        Ok(Self::Opened(writer))
    }

    fn begin_page(&mut self, header: &PageHeader) -> std::result::Result<(), CupsRasterError> {
        let page = match std::mem::replace(self, Self::Closed) {
            Self::Opened(writer) => block_on(writer.next_page(header))?,
            Self::Page(page) => block_on(page.next_page(header))?,
            Self::Closed => return Err(closed()),
        };
        *self = Self::Page(page);
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> std::result::Result<(), CupsRasterError> {
        match self {
            Self::Page(page) => Ok(block_on(page.content_mut().write_all(data))?),
            Self::Opened(_) => Err(io::Error::other("pixel data written before a page header").into()),
            Self::Closed => Err(closed()),
        }
    }

    fn finish(self) -> std::result::Result<(), CupsRasterError> {
        match self {
            Self::Opened(writer) => block_on(writer.finish()),
            Self::Page(page) => block_on(page.finish()),
            Self::Closed => Err(closed()),
        }
    }
}

fn closed() -> CupsRasterError {
    io::Error::other("raster stream is closed").into()
}

enum Framing<'a, W: Write> {
    Legacy(Stage<'a, CupsPageFactoryV3<BigEndian>, W>),
    Pwg(Stage<'a, CupsPageFactoryV2<BigEndian>, W>),
}

/// Writes pages to a raster sink.
pub struct RasterWriter<'a, W: Write> {
    framing: Framing<'a, W>,
    pages_written: usize,
}

impl<'a, W: Write> RasterWriter<'a, W> {
    /// Start a stream: writes the sync word for `dialect`.
    #[instrument(skip(sink))]
    pub fn open(sink: &'a mut W, dialect: RasterDialect) -> Result<Self> {
        let framing = match dialect {
            RasterDialect::Legacy => Stage::open(sink).map(Framing::Legacy),
            RasterDialect::Pwg => Stage::open(sink).map(Framing::Pwg),
        }
        .map_err(|err| stream_error("cannot open raster stream", err))?;
        debug!("Raster stream opened");
        Ok(Self {
            framing,
            pages_written: 0,
        })
    }

    /// Pages whose header has been written.
    pub fn pages_written(&self) -> usize {
        self.pages_written
    }

    /// Begin a page. The previous page must be complete.
    pub fn write_header(&mut self, header: &PageHeader) -> Result<()> {
        match &mut self.framing {
            Framing::Legacy(stage) => stage.begin_page(header),
            Framing::Pwg(stage) => stage.begin_page(header),
        }
        .map_err(|err| {
            stream_error(format!("can't write page {} header", self.pages_written + 1), err)
        })?;

        self.pages_written += 1;
        trace!(
            page = self.pages_written,
            width = header.v1.width,
            height = header.v1.height,
            bytes_per_line = header.v1.bytes_per_line,
            "Page header written"
        );
        Ok(())
    }

    /// Append scanline bytes to the current page.
    pub fn write_pixels(&mut self, data: &[u8]) -> Result<()> {
        match &mut self.framing {
            Framing::Legacy(stage) => stage.write(data),
            Framing::Pwg(stage) => stage.write(data),
        }
        .map_err(|err| stream_error(format!("page {} pixel data", self.pages_written), err))
    }

    /// Complete the stream. The last page must be complete.
    pub fn finish(self) -> Result<()> {
        match self.framing {
            Framing::Legacy(stage) => stage.finish(),
            Framing::Pwg(stage) => stage.finish(),
        }
        .map_err(|err| stream_error("cannot finish raster stream", err))?;
        debug!(pages = self.pages_written, "Raster stream finished");
        Ok(())
    }
}

fn stream_error(context: impl std::fmt::Display, err: CupsRasterError) -> RasterError {
    match err {
        CupsRasterError::IoError(io) => RasterError::RasterStream(format!("{}: {}", context, io)),
        other => RasterError::RasterStream(format!("{}: {}", context, other)),
    }
}
