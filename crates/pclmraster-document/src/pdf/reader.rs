// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PCLm reader — open a PCLm/PDF document with `lopdf` and describe each page:
// rotation, media box and its decoded image strips.

use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use pclmraster_core::error::{RasterError, Result};
use pclmraster_core::{ImageStrip, PageDescription, SourceColorSpace};
use tracing::{debug, info, instrument, warn};

use super::filters;

/// Bound on `/Parent` hops and reference chains followed while resolving.
const MAX_INDIRECTION: usize = 32;

/// Reads page descriptions out of a PCLm document.
///
/// Pages are described lazily, one at a time, so only one page's decoded
/// strips are held in memory by the caller.
pub struct PclmReader {
    /// The underlying lopdf document.
    document: Document,
    /// Page object ids in document order.
    page_ids: Vec<ObjectId>,
    /// Source path, if opened from a file.
    source_path: Option<String>,
}

impl PclmReader {
    // -- Construction ---------------------------------------------------------

    /// Open a document from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        info!("Opening PCLm document: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            RasterError::PdfError(format!("failed to open {}: {}", path_ref.display(), err))
        })?;

        let mut reader = Self::from_document(document);
        reader.source_path = Some(path_ref.display().to_string());
        Ok(reader)
    }

    /// Create a reader from document bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            RasterError::PdfError(format!("failed to load document from memory: {}", err))
        })?;
        Ok(Self::from_document(document))
    }

    fn from_document(document: Document) -> Self {
        let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
        debug!(pages = page_ids.len(), "Document loaded");
        Self {
            document,
            page_ids,
            source_path: None,
        }
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Return the source path if the reader was created via [`PclmReader::open`].
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    // -- Extraction -----------------------------------------------------------

    /// Describe every page in document order.
    pub fn pages(&self) -> impl Iterator<Item = Result<PageDescription>> + '_ {
        (0..self.page_count()).map(move |index| self.page(index))
    }

    /// Describe a single page (0-indexed) and decode its image strips.
    #[instrument(skip(self))]
    pub fn page(&self, index: usize) -> Result<PageDescription> {
        let page_id = *self.page_ids.get(index).ok_or_else(|| {
            RasterError::PdfError(format!(
                "page {} out of range (document has {} pages)",
                index + 1,
                self.page_count()
            ))
        })?;
        let page = self.dictionary(page_id)?;

        let rotate = match self.inherited(page, b"Rotate") {
            Some(Object::Integer(degrees)) => *degrees,
            Some(other) => number(other).map(|d| d as i64).unwrap_or(0),
            None => 0,
        };

        let media_box = self.inherited(page, b"MediaBox").and_then(|obj| self.rectangle(obj));
        if media_box.is_none() {
            warn!(page = index + 1, "Page has no usable media box");
        }

        let strips = match self
            .inherited(page, b"Resources")
            .and_then(|res| res.as_dict().ok())
        {
            Some(resources) => self.image_strips(resources)?,
            None => Vec::new(),
        };

        debug!(
            page = index + 1,
            rotate,
            strips = strips.len(),
            "Page described"
        );

        Ok(PageDescription {
            index,
            rotate,
            media_box,
            strips,
        })
    }

    // -- Internal helpers -----------------------------------------------------

    fn dictionary(&self, id: ObjectId) -> Result<&Dictionary> {
        self.document
            .get_object(id)
            .and_then(Object::as_dict)
            .map_err(|err| {
                RasterError::PdfError(format!("object {} {} is not a dictionary: {}", id.0, id.1, err))
            })
    }

    /// Follow indirect references to the underlying object.
    fn resolve<'a>(&'a self, mut obj: &'a Object) -> &'a Object {
        for _ in 0..MAX_INDIRECTION {
            match obj {
                Object::Reference(id) => match self.document.get_object(*id) {
                    Ok(target) => obj = target,
                    Err(_) => return obj,
                },
                _ => return obj,
            }
        }
        obj
    }

    /// Look a key up on the page, then on its ancestors in the page tree.
    fn inherited<'a>(&'a self, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
        let mut node = page;
        for _ in 0..MAX_INDIRECTION {
            if let Ok(value) = node.get(key) {
                return Some(self.resolve(value));
            }
            let parent = node.get(b"Parent").ok()?;
            node = self.resolve(parent).as_dict().ok()?;
        }
        None
    }

    /// A rectangle of exactly four numbers.
    fn rectangle(&self, obj: &Object) -> Option<[f64; 4]> {
        let items = obj.as_array().ok()?;
        if items.len() != 4 {
            return None;
        }
        let mut rect = [0.0; 4];
        for (slot, item) in rect.iter_mut().zip(items) {
            *slot = number(self.resolve(item))?;
        }
        Some(rect)
    }

    /// Image XObjects of a resource dictionary, in dictionary order.
    fn image_strips(&self, resources: &Dictionary) -> Result<Vec<ImageStrip>> {
        let Some(xobjects) = resources
            .get(b"XObject")
            .ok()
            .and_then(|obj| self.resolve(obj).as_dict().ok())
        else {
            return Ok(Vec::new());
        };

        let mut strips = Vec::new();
        for (name, obj) in xobjects.iter() {
            let Ok(stream) = self.resolve(obj).as_stream() else {
                continue;
            };
            let is_image = stream
                .dict
                .get(b"Subtype")
                .ok()
                .and_then(|s| s.as_name().ok())
                .is_some_and(|s| s == b"Image");
            if !is_image {
                continue;
            }
            strips.push(self.decode_strip(&String::from_utf8_lossy(name), stream)?);
        }
        Ok(strips)
    }

    fn decode_strip(&self, name: &str, stream: &Stream) -> Result<ImageStrip> {
        let dict = &stream.dict;
        let dimension = |key: &[u8]| -> Result<u32> {
            dict.get(key)
                .ok()
                .map(|obj| self.resolve(obj))
                .and_then(|obj| obj.as_i64().ok())
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| {
                    RasterError::ImageError(format!(
                        "image {} has no valid /{}",
                        name,
                        String::from_utf8_lossy(key)
                    ))
                })
        };
        let width = dimension(b"Width")?;
        let height = dimension(b"Height")?;

        if let Some(bpc) = dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(|obj| self.resolve(obj).as_i64().ok())
        {
            if bpc != 8 {
                return Err(RasterError::ImageError(format!(
                    "image {} has {} bits per component, only 8 is supported",
                    name, bpc
                )));
            }
        }

        let color_space = dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|obj| self.resolve(obj).as_name().ok())
            .map(|cs| String::from_utf8_lossy(cs).into_owned());

        let declared = color_space.as_deref().and_then(SourceColorSpace::from_pdf_name);
        let data = filters::decode_stream(stream, declared)?;

        debug!(
            name,
            width,
            height,
            color_space = color_space.as_deref().unwrap_or("-"),
            bytes = data.len(),
            "Strip extracted"
        );

        Ok(ImageStrip {
            width,
            height,
            color_space,
            data,
        })
    }
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(f64::from(*value)),
        _ => None,
    }
}
