// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job driver — stages the input, builds the raster profile, and renders every
// page of the document into one raster stream.

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use pclmraster_core::error::Result;
use pclmraster_core::{DeviceDescription, DeviceRasterProfile, JobOptions};
use pclmraster_document::PclmReader;
use pclmraster_raster::{PageAssembler, RasterWriter};
use tracing::{error, info, instrument};

use crate::staging;

/// Environment variable naming the JSON device description.
pub const DEVICE_DESCRIPTION_VAR: &str = "PPD";

/// Environment variable carrying the spooler's output format hint.
pub const FINAL_CONTENT_TYPE_VAR: &str = "FINAL_CONTENT_TYPE";

/// One invocation of the filter.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub job_id: String,
    pub user: String,
    pub title: String,
    pub copies: String,
    pub options: JobOptions,
    /// `None` reads standard input.
    pub input: Option<PathBuf>,
}

/// Settings the spooler passes through the environment.
#[derive(Debug, Clone, Default)]
pub struct JobEnvironment {
    pub device_description: Option<PathBuf>,
    pub final_content_type: Option<String>,
}

impl JobEnvironment {
    pub fn from_env() -> Self {
        Self {
            device_description: std::env::var_os(DEVICE_DESCRIPTION_VAR)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            final_content_type: std::env::var(FINAL_CONTENT_TYPE_VAR).ok(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub pages_written: usize,
    pub pages_skipped: usize,
}

/// Run a whole job, writing the raster stream to standard output.
#[instrument(skip_all, fields(job_id = %request.job_id))]
pub fn run_job(request: &JobRequest, env: &JobEnvironment) -> Result<JobSummary> {
    info!(
        user = %request.user,
        title = %request.title,
        copies = %request.copies,
        options = request.options.len(),
        "Job received"
    );

    let input = staging::open_input(request.input.as_deref())?;
    let reader = PclmReader::open(input.path())?;
    drop(input);

    let profile = load_profile(&request.options, env)?;
    let mut sink = BufWriter::new(io::stdout().lock());
    convert(&reader, &profile, &mut sink)
}

/// Build the job-wide raster profile from the device description named in
/// the environment, if any, and the job options.
pub fn load_profile(options: &JobOptions, env: &JobEnvironment) -> Result<DeviceRasterProfile> {
    let description = env
        .device_description
        .as_deref()
        .map(DeviceDescription::load)
        .transpose()?;
    DeviceRasterProfile::resolve(
        description.as_ref(),
        options,
        env.final_content_type.as_deref(),
    )
}

/// Render every page of `reader` into a raster stream on `sink`. Pages that
/// fail with a non-fatal error are logged and skipped; any other error ends
/// the job.
pub fn convert<W: Write>(
    reader: &PclmReader,
    profile: &DeviceRasterProfile,
    sink: &mut W,
) -> Result<JobSummary> {
    let mut writer = RasterWriter::open(&mut *sink, profile.dialect)?;
    let assembler = PageAssembler::new(profile);
    let mut summary = JobSummary::default();

    for index in 0..reader.page_count() {
        info!("Starting page {}.", index + 1);
        let page = reader.page(index)?;
        match assembler.render(page, &mut writer) {
            Ok(_) => summary.pages_written += 1,
            Err(err) if !err.is_fatal() => {
                error!("{}", err);
                summary.pages_skipped += 1;
            }
            Err(err) => return Err(err),
        }
    }

    writer.finish()?;
    sink.flush()?;
    info!(
        written = summary.pages_written,
        skipped = summary.pages_skipped,
        "Raster stream complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Dictionary, Document, Object, Stream, dictionary};
    use futures::executor::block_on;
    use futures::io::{AsyncReadExt, Cursor};
    use pclmraster_core::{RasterDialect, RasterError};
    use pclmraster_raster::PageHeader;
    use print_raster::model::cups::{CupsImagingBoundingBox, CupsMargins};
    use print_raster::reader::cups::unified::CupsRasterUnifiedReader;
    use print_raster::reader::{RasterPageReader, RasterReader};
    use std::pin::Pin;

    /// Headers and uncompressed pixel data of every page in a stream.
    fn read_pages(bytes: &[u8]) -> Vec<(PageHeader, Vec<u8>)> {
        block_on(async {
            let mut cursor = Cursor::new(bytes);
            let reader = CupsRasterUnifiedReader::new(Pin::new(&mut cursor)).await.unwrap();
            let mut pages = Vec::new();
            let mut next = reader.next_page().await.unwrap();
            while let Some(mut page) = next {
                let mut data = Vec::new();
                page.content_mut().read_to_end(&mut data).await.unwrap();
                pages.push((page.header().clone(), data));
                next = page.next_page().await.unwrap();
            }
            pages
        })
    }

    fn convert_to_vec(
        reader: &PclmReader,
        profile: &DeviceRasterProfile,
    ) -> Result<(JobSummary, Vec<u8>)> {
        let mut bytes = Vec::new();
        let summary = convert(reader, profile, &mut bytes)?;
        Ok((summary, bytes))
    }

    struct TestPage {
        media_box: Option<[i64; 4]>,
        rotate: Option<i64>,
        color_space: &'static str,
        width: i64,
        rows: Vec<Vec<u8>>,
    }

    fn rgb_page(width: i64, rows: Vec<Vec<u8>>) -> TestPage {
        TestPage {
            media_box: Some([0, 0, 612, 792]),
            rotate: None,
            color_space: "DeviceRGB",
            width,
            rows,
        }
    }

    /// A minimal PCLm-shaped PDF: each page carries one image strip per row.
    fn document(pages: Vec<TestPage>) -> PclmReader {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let mut kids: Vec<Object> = Vec::new();

        for spec in &pages {
            let mut xobjects = Dictionary::new();
            for (i, row) in spec.rows.iter().enumerate() {
                let strip = Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => spec.width,
                        "Height" => 1i64,
                        "BitsPerComponent" => 8i64,
                        "ColorSpace" => Object::Name(spec.color_space.as_bytes().to_vec()),
                    },
                    row.clone(),
                );
                xobjects.set(format!("Image{}", i), doc.add_object(strip));
            }

            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Resources" => dictionary! { "XObject" => xobjects },
            };
            if let Some(mb) = spec.media_box {
                page.set("MediaBox", mb.iter().map(|&v| Object::Integer(v)).collect::<Vec<_>>());
            }
            if let Some(rotate) = spec.rotate {
                page.set("Rotate", rotate);
            }
            kids.push(doc.add_object(page).into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        PclmReader::from_bytes(&bytes).unwrap()
    }

    fn profile(json: &str, options: &str, final_content_type: Option<&str>) -> DeviceRasterProfile {
        let desc = DeviceDescription::from_json(json).unwrap();
        DeviceRasterProfile::resolve(Some(&desc), &JobOptions::parse(options), final_content_type)
            .unwrap()
    }

    #[test]
    fn white_rgb_pages_become_blank_cmyk_raster() {
        let reader = document(vec![
            rgb_page(4, vec![vec![255; 12], vec![255; 12]]),
            rgb_page(4, vec![vec![255; 12], vec![255; 12]]),
        ]);
        let profile = profile(r#"{"color_space": "CMYK"}"#, "", None);
        let (summary, bytes) = convert_to_vec(&reader, &profile).unwrap();

        assert_eq!(summary, JobSummary { pages_written: 2, pages_skipped: 0 });
        assert_eq!(&bytes[..4], b"RaS3");
        let pages = read_pages(&bytes);
        assert_eq!(pages.len(), 2);
        for (header, data) in &pages {
            assert_eq!((header.v1.width, header.v1.height), (4, 2));
            assert_eq!(header.v1.bytes_per_line, 16);
            assert_eq!(data, &vec![0u8; 32]);
        }
    }

    #[test]
    fn page_without_media_box_is_skipped() {
        let mut broken = rgb_page(1, vec![vec![0, 0, 0]]);
        broken.media_box = None;
        let reader = document(vec![
            rgb_page(1, vec![vec![0, 0, 0]]),
            broken,
            rgb_page(1, vec![vec![255, 255, 255]]),
        ]);
        let profile = profile(r#"{"color_space": "K"}"#, "", None);
        let (summary, bytes) = convert_to_vec(&reader, &profile).unwrap();

        assert_eq!(summary, JobSummary { pages_written: 2, pages_skipped: 1 });
        let pages = read_pages(&bytes);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].1, vec![255]);
        assert_eq!(pages[1].1, vec![0]);
    }

    #[test]
    fn pwg_output_is_compressed_and_marginless() {
        let reader = document(vec![rgb_page(8, vec![vec![200; 24]; 3])]);
        let profile = profile(
            r#"{"color_space": "sRGB", "custom_margins": [18, 18, 18, 18]}"#,
            "",
            Some("image/pwg-raster"),
        );
        assert_eq!(profile.dialect, RasterDialect::Pwg);
        let (_, bytes) = convert_to_vec(&reader, &profile).unwrap();

        assert_eq!(&bytes[..4], b"RaS2");
        let pages = read_pages(&bytes);
        let header = &pages[0].0;
        assert_eq!(header.v1.media_class, "PwgRaster");
        assert_eq!(header.v1.margins, CupsMargins { left: 0, bottom: 0 });
        assert_eq!(
            header.v1.imaging_bbox,
            CupsImagingBoundingBox { left: 0, bottom: 0, right: 0, top: 0 }
        );
        assert_eq!(pages[0].1, vec![200; 72]);
        // Three identical lines collapse into one repeat record.
        assert!(bytes.len() < 4 + 1796 + 24);
    }

    #[test]
    fn bi_level_option_thresholds() {
        let reader = document(vec![TestPage {
            color_space: "DeviceGray",
            ..rgb_page(8, vec![vec![0, 50, 100, 127, 128, 200, 250, 255]])
        }]);
        let profile = profile(
            r#"{"color_space": "K", "bits_per_color": 1}"#,
            "print-color-mode=bi-level",
            None,
        );
        let (_, bytes) = convert_to_vec(&reader, &profile).unwrap();
        let pages = read_pages(&bytes);
        // Dark samples are inked.
        assert_eq!(pages[0].1, vec![0b1111_0000]);
    }

    #[test]
    fn bad_rotation_aborts_the_job() {
        let mut tilted = rgb_page(1, vec![vec![0, 0, 0]]);
        tilted.rotate = Some(45);
        let reader = document(vec![rgb_page(1, vec![vec![0, 0, 0]]), tilted]);
        let profile = profile(r#"{"color_space": "RGB"}"#, "", None);
        assert!(matches!(
            convert_to_vec(&reader, &profile),
            Err(RasterError::InvalidRotation(45))
        ));
    }

    #[test]
    fn profile_comes_from_described_device() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"color_space": "CMYK", "bits_per_color": 2, "attributes": {{"PWGRaster": "true"}}}}"#
        )
        .unwrap();
        let env = JobEnvironment {
            device_description: Some(file.path().to_path_buf()),
            final_content_type: None,
        };
        let profile = load_profile(&JobOptions::default(), &env).unwrap();
        assert_eq!(profile.bits_per_color, 2);
        assert_eq!(profile.bits_per_pixel, 8);
        assert_eq!(profile.dialect, RasterDialect::Pwg);
    }

    #[test]
    fn profile_without_description_follows_options() {
        let env = JobEnvironment::default();
        let profile = load_profile(&JobOptions::default(), &env).unwrap();
        assert_eq!(profile.dialect, RasterDialect::Pwg);

        let options = JobOptions::parse("media-class=Normal cupsColorSpace=W");
        let profile = load_profile(&options, &env).unwrap();
        assert_eq!(profile.dialect, RasterDialect::Legacy);

        let env = JobEnvironment {
            device_description: Some(PathBuf::from("/nonexistent/device.json")),
            final_content_type: None,
        };
        assert!(load_profile(&JobOptions::default(), &env).is_err());
    }
}
