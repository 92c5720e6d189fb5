// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stream filter decoding for image strips.
//
// PCLm strips are RunLength, Flate or DCT encoded. Flate and LZW go through
// lopdf; RunLength is decoded here and DCT through the strip decoder.

use lopdf::{Dictionary, Object, Stream};
use pclmraster_core::SourceColorSpace;
use pclmraster_core::error::{RasterError, Result};
use tracing::trace;

use crate::image::decoder::StripDecoder;

/// Names of the filters applied to a stream, in decode order.
pub fn filter_names(dict: &Dictionary) -> Vec<String> {
    let name = |obj: &Object| obj.as_name().ok().map(|n| String::from_utf8_lossy(n).into_owned());
    match dict.get(b"Filter") {
        Ok(Object::Array(filters)) => filters.iter().filter_map(name).collect(),
        Ok(obj) => name(obj).into_iter().collect(),
        Err(_) => Vec::new(),
    }
}

/// Fully decode a strip stream to raw samples.
pub fn decode_stream(stream: &Stream, declared: Option<SourceColorSpace>) -> Result<Vec<u8>> {
    let filters = filter_names(&stream.dict);
    trace!(?filters, raw_len = stream.content.len(), "Decoding strip stream");

    match filters.as_slice() {
        [] => Ok(stream.content.clone()),
        [single] if single == "RunLengthDecode" || single == "RL" => {
            run_length_decode(&stream.content)
        }
        [single] if single == "DCTDecode" || single == "DCT" => {
            StripDecoder::from_jpeg(&stream.content)?.into_samples(declared)
        }
        _ => stream.decompressed_content().map_err(|err| {
            RasterError::PdfError(format!("failed to decode {:?} stream: {}", filters, err))
        }),
    }
}

/// PDF RunLengthDecode: a length byte `n` below 128 copies the next `n + 1`
/// bytes, above 128 repeats the next byte `257 - n` times, 128 ends the data.
pub fn run_length_decode(data: &[u8]) -> Result<Vec<u8>> {
    let truncated = || RasterError::PdfError("truncated RunLengthDecode stream".to_string());
    let mut out = Vec::with_capacity(data.len() * 2);
    let mut pos = 0;

    while let Some(&length) = data.get(pos) {
        pos += 1;
        match length {
            128 => break,
            0..=127 => {
                let end = pos + usize::from(length) + 1;
                out.extend_from_slice(data.get(pos..end).ok_or_else(truncated)?);
                pos = end;
            }
            _ => {
                let byte = *data.get(pos).ok_or_else(truncated)?;
                out.resize(out.len() + 257 - usize::from(length), byte);
                pos += 1;
            }
        }
    }

    Ok(out)
}
