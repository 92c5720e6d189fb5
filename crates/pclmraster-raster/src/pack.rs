// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bit-depth and color-order packer — turns one source row into one device
// scanline.

use pclmraster_core::error::{RasterError, Result};
use pclmraster_core::{ColorOrder, DeviceRasterProfile, SourceColorSpace};

use crate::colorspace::Converter;
use crate::dither::{DITHER_1, DITHER_2, DITHER_4, one_bit_line, reverse_one_bit_line};

/// Reduce one converted 8-bit pixel to `bits_per_color` bits per channel.
///
/// Channels are packed MSB first into the low `channels × bits_per_color`
/// bits of the result. Depths below 8 are ordered-dithered at `(x, y)`, 1 bit
/// included: the bi-level threshold applies to single-channel rows only.
/// 16 bits repeat each byte.
pub fn convert_bits(pixel: &[u8], x: usize, y: usize, bits_per_color: u32) -> u64 {
    pixel.iter().fold(0u64, |packed, &sample| {
        let value = match bits_per_color {
            1 => u64::from(sample > DITHER_1[y & 15][x & 15]),
            2 => u64::from(sample.saturating_add(DITHER_2[y & 15][x & 15]) >> 6),
            4 => u64::from(sample.saturating_add(DITHER_4[y & 7][x & 7]) >> 4),
            16 => u64::from(sample) << 8 | u64::from(sample),
            _ => u64::from(sample),
        };
        packed << bits_per_color | value
    })
}

/// Write the low `bits` bits of `value` into `dst` at bit offset `offset`,
/// most significant bit first. Bits past the end of `dst` are dropped.
pub fn put_bits(dst: &mut [u8], offset: usize, bits: u32, value: u64) {
    if offset % 8 == 0 && bits % 8 == 0 {
        let bytes = (bits / 8) as usize;
        for n in 0..bytes {
            let shift = 8 * (bytes - 1 - n);
            if let Some(byte) = dst.get_mut(offset / 8 + n) {
                *byte = (value >> shift) as u8;
            }
        }
        return;
    }
    for n in 0..bits as usize {
        let bit = (value >> (bits as usize - 1 - n)) & 1;
        let at = offset + n;
        if let Some(byte) = dst.get_mut(at / 8) {
            let mask = 0x80 >> (at % 8);
            if bit == 1 {
                *byte |= mask;
            } else {
                *byte &= !mask;
            }
        }
    }
}

/// Geometry of one device pixel in a scanline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanlineLayout {
    pub channels: usize,
    pub bits_per_color: u32,
    pub bits_per_pixel: u32,
    pub order: ColorOrder,
}

impl ScanlineLayout {
    pub fn from_profile(profile: &DeviceRasterProfile) -> Self {
        Self {
            channels: profile.num_colors as usize,
            bits_per_color: profile.bits_per_color,
            bits_per_pixel: profile.bits_per_pixel,
            order: profile.color_order,
        }
    }
}

/// Place packed pixel `index` into a scanline.
///
/// Chunked order stores the whole pixel in a `bits_per_pixel` wide field.
/// Banded and planar order store only channel `plane` in a
/// `bits_per_color` wide field.
pub fn write_pixel(dst: &mut [u8], plane: usize, index: usize, packed: u64, layout: ScanlineLayout) {
    let bpc = layout.bits_per_color;
    match layout.order {
        ColorOrder::Chunked => {
            let bpp = layout.bits_per_pixel;
            put_bits(dst, index * bpp as usize, bpp, packed);
        }
        ColorOrder::Banded | ColorOrder::Planar => {
            let last = layout.channels - 1;
            let shift = (last - plane.min(last)) as u32 * bpc;
            let mask = (1u64 << bpc) - 1;
            put_bits(dst, index * bpc as usize, bpc, (packed >> shift) & mask);
        }
    }
}

/// How a scanline is produced from a source row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// 1-bit single channel: convert the row, then threshold or dither it.
    /// Multi-channel 1-bit goes through `PerPixel` and is always dithered.
    OneBit,
    /// 8-bit chunked: the converted row is the scanline.
    Direct,
    /// Per pixel convert, reduce and place.
    PerPixel,
}

/// Converts and packs source rows into device scanlines. Built once per page.
#[derive(Debug)]
pub struct LineAssembler {
    converter: Converter,
    source: SourceColorSpace,
    mode: Mode,
    mirrored: bool,
    width: usize,
    layout: ScanlineLayout,
    bi_level: bool,
    bytes_per_line: usize,
    /// Converted row, or packed bits before mirroring.
    scratch: Vec<u8>,
}

impl LineAssembler {
    /// `mirrored` builds every row right to left (backside image-x swap
    /// without image-y).
    pub fn new(
        profile: &DeviceRasterProfile,
        source: SourceColorSpace,
        width: u32,
        mirrored: bool,
    ) -> Self {
        let converter = Converter::select(profile.color_space, source);
        let layout = ScanlineLayout::from_profile(profile);
        let channels = layout.channels;
        let mode = if profile.bits_per_color == 1 && channels == 1 {
            Mode::OneBit
        } else if profile.bits_per_color == 8 && profile.color_order == ColorOrder::Chunked {
            Mode::Direct
        } else {
            Mode::PerPixel
        };
        let width = width as usize;
        let bytes_per_line = profile.bytes_per_line(width as u32) as usize;
        let scratch = match mode {
            Mode::OneBit => vec![0; width.max(bytes_per_line)],
            Mode::Direct if mirrored => vec![0; width * channels],
            _ => Vec::new(),
        };

        Self {
            converter,
            source,
            mode,
            mirrored,
            width,
            layout,
            bi_level: profile.bi_level,
            bytes_per_line,
            scratch,
        }
    }

    pub fn converter(&self) -> Converter {
        self.converter
    }

    /// Bytes in one emitted scanline (one band or plane).
    pub fn bytes_per_line(&self) -> usize {
        self.bytes_per_line
    }

    /// Produce the scanline for source row `row` and channel `plane` (the
    /// band or plane index; ignored in chunked order) into `dst`.
    pub fn assemble(&mut self, src: &[u8], row: usize, plane: usize, dst: &mut [u8]) -> Result<()> {
        let row_len = self.width * self.source.components();
        if src.len() < row_len || dst.len() < self.bytes_per_line {
            return Err(RasterError::ImageGeometry(format!(
                "row {}: source has {} of {} bytes, scanline has {} of {}",
                row,
                src.len(),
                row_len,
                dst.len(),
                self.bytes_per_line
            )));
        }
        let src = &src[..row_len];
        let dst = &mut dst[..self.bytes_per_line];

        match self.mode {
            Mode::OneBit => {
                self.converter
                    .convert_row(src, &mut self.scratch, self.source, self.width);
                if self.mirrored {
                    let mut bits = vec![0u8; self.bytes_per_line];
                    one_bit_line(&self.scratch[..self.width], &mut bits, row, self.bi_level);
                    reverse_one_bit_line(&bits, dst, self.width);
                } else {
                    let converted = &self.scratch[..self.width];
                    one_bit_line(converted, dst, row, self.bi_level);
                }
            }
            Mode::Direct if self.mirrored => {
                self.converter
                    .convert_row(src, &mut self.scratch, self.source, self.width);
                let c = self.layout.channels;
                for (i, out) in dst.chunks_exact_mut(c).enumerate() {
                    let from = (self.width - 1 - i) * c;
                    out.copy_from_slice(&self.scratch[from..from + c]);
                }
            }
            Mode::Direct => {
                self.converter.convert_row(src, dst, self.source, self.width);
            }
            Mode::PerPixel => {
                dst.fill(0);
                let inc = self.source.components();
                let mut pixel = [0u8; 4];
                for i in 0..self.width {
                    let from = if self.mirrored { self.width - 1 - i } else { i } * inc;
                    self.converter
                        .convert_pixel(&src[from..from + inc], &mut pixel);
                    let packed = convert_bits(
                        &pixel[..self.layout.channels],
                        i,
                        row,
                        self.layout.bits_per_color,
                    );
                    write_pixel(dst, plane, i, packed, self.layout);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pclmraster_core::{DeviceDescription, JobOptions};

    fn profile(options: &str) -> DeviceRasterProfile {
        DeviceRasterProfile::resolve(None, &JobOptions::parse(options), None).unwrap()
    }

    #[test]
    fn convert_bits_per_depth() {
        assert_eq!(convert_bits(&[0x12, 0x34], 0, 0, 8), 0x1234);
        assert_eq!(convert_bits(&[0xAB], 0, 0, 16), 0xABAB);
        // (0,0) has a zero offset in every matrix.
        assert_eq!(convert_bits(&[0xFF, 0x40, 0x00], 0, 0, 2), 0b11_01_00);
        assert_eq!(convert_bits(&[0xFF, 0x10], 0, 0, 4), 0xF1);
        assert_eq!(convert_bits(&[200, 0, 100], 0, 0, 1), 0b101);
    }

    #[test]
    fn put_bits_handles_unaligned_fields() {
        let mut dst = [0u8; 2];
        put_bits(&mut dst, 3, 6, 0b111111);
        assert_eq!(dst, [0b0001_1111, 0b1000_0000]);
        put_bits(&mut dst, 4, 4, 0);
        assert_eq!(dst, [0b0001_0000, 0b1000_0000]);
        put_bits(&mut dst, 8, 8, 0xCD);
        assert_eq!(dst, [0b0001_0000, 0xCD]);
        // Out of range bits are dropped.
        put_bits(&mut dst, 14, 4, 0b1111);
        assert_eq!(dst[1], 0xCF);
    }

    #[test]
    fn write_pixel_selects_channel_for_banded() {
        let banded = ScanlineLayout {
            channels: 4,
            bits_per_color: 8,
            bits_per_pixel: 8,
            order: ColorOrder::Banded,
        };
        let mut dst = [0u8; 2];
        write_pixel(&mut dst, 2, 1, 0x11_22_33_44, banded);
        assert_eq!(dst, [0, 0x33]);

        let planar = ScanlineLayout {
            bits_per_color: 4,
            bits_per_pixel: 4,
            order: ColorOrder::Planar,
            ..banded
        };
        let mut dst = [0u8; 1];
        // 4-bit CMYK planar, plane 0 (cyan) of 0xC_M_Y_K = 0x9ABC.
        write_pixel(&mut dst, 0, 1, 0x9ABC, planar);
        assert_eq!(dst, [0x09]);
    }

    #[test]
    fn chunked_sub_byte_rgb_pads_high_bits() {
        let p = profile("cupsColorSpace=RGB cupsBitsPerColor=1");
        assert_eq!(p.bits_per_pixel, 4);
        let mut asm = LineAssembler::new(&p, SourceColorSpace::Rgb, 2, false);
        let mut dst = [0xFF; 1];
        asm.assemble(&[255, 0, 255, 0, 0, 0], 0, 0, &mut dst).unwrap();
        assert_eq!(dst, [0b0101_0000]);
    }

    #[test]
    fn direct_path_converts_whole_row() {
        let p = profile("cupsColorSpace=CMYK cupsBitsPerColor=8");
        let mut asm = LineAssembler::new(&p, SourceColorSpace::Rgb, 2, false);
        assert_eq!(asm.bytes_per_line(), 8);
        let mut dst = [0xEE; 8];
        asm.assemble(&[255, 255, 255, 0, 0, 0], 0, 0, &mut dst).unwrap();
        assert_eq!(dst, [0, 0, 0, 0, 0, 0, 0, 255]);
    }

    #[test]
    fn mirrored_direct_reverses_pixels() {
        let p = profile("cupsColorSpace=RGB cupsBitsPerColor=8 media-class=x");
        let mut asm = LineAssembler::new(&p, SourceColorSpace::Rgb, 3, true);
        let mut dst = [0u8; 9];
        asm.assemble(&[1, 2, 3, 4, 5, 6, 7, 8, 9], 0, 0, &mut dst).unwrap();
        assert_eq!(dst, [7, 8, 9, 4, 5, 6, 1, 2, 3]);
    }

    #[test]
    fn bi_level_rgb_row_has_no_gray_levels() {
        let p = profile("print-color-mode=bi-level");
        assert_eq!(p.bits_per_color, 1);
        let mut asm = LineAssembler::new(&p, SourceColorSpace::Rgb, 10, false);
        assert_eq!(asm.bytes_per_line(), 2);

        // Mid gray throughout, then two pure black pixels.
        let mut row = vec![128u8; 8 * 3];
        row.extend_from_slice(&[0; 6]);
        let mut dst = [0xFF; 2];
        asm.assemble(&row, 7, 0, &mut dst).unwrap();
        // Black ink 127 for mid gray stays off; pure black prints; padding is 0.
        assert_eq!(dst, [0x00, 0b1100_0000]);
    }

    #[test]
    fn mirrored_one_bit_row() {
        let p = profile("print-color-mode=bi-level");
        let mut asm = LineAssembler::new(&p, SourceColorSpace::Gray, 10, true);
        let mut row = vec![255u8; 10];
        row[0] = 0;
        let mut dst = [0u8; 2];
        asm.assemble(&row, 0, 0, &mut dst).unwrap();
        assert_eq!(dst, [0x00, 0b0100_0000]);
    }

    #[test]
    fn bi_level_does_not_threshold_color_rows() {
        let desc = DeviceDescription::from_json(r#"{"color_space": "RGB", "bits_per_color": 1}"#)
            .unwrap();
        let p = DeviceRasterProfile::resolve(
            Some(&desc),
            &JobOptions::parse("print-color-mode=bi-level"),
            None,
        )
        .unwrap();
        assert!(p.bi_level);
        assert_eq!((p.num_colors, p.bits_per_color), (3, 1));

        // A threshold at 128 would leave dark gray 100 off; the dither
        // offset at (0, 0) is 0, so every channel of the first pixel is on.
        let mut asm = LineAssembler::new(&p, SourceColorSpace::Rgb, 1, false);
        let mut dst = [0u8; 1];
        asm.assemble(&[100, 100, 100], 0, 0, &mut dst).unwrap();
        assert_eq!(dst, [0b0111_0000]);
    }

    #[test]
    fn banded_cmyk_emits_one_channel_per_band() {
        let p = profile("cupsColorSpace=CMYK cupsBitsPerColor=8 cupsColorOrder=banded");
        let mut asm = LineAssembler::new(&p, SourceColorSpace::Cmyk, 2, false);
        assert_eq!(asm.bytes_per_line(), 2);
        let src = [1, 2, 3, 4, 5, 6, 7, 8];
        let mut dst = [0u8; 2];
        asm.assemble(&src, 0, 3, &mut dst).unwrap();
        assert_eq!(dst, [4, 8]);
        asm.assemble(&src, 0, 0, &mut dst).unwrap();
        assert_eq!(dst, [1, 5]);
    }

    #[test]
    fn sixteen_bit_gray_doubles_bytes() {
        let p = profile("cupsColorSpace=W cupsBitsPerColor=16");
        let mut asm = LineAssembler::new(&p, SourceColorSpace::Gray, 2, false);
        let mut dst = [0u8; 4];
        asm.assemble(&[0x12, 0xF0], 0, 0, &mut dst).unwrap();
        assert_eq!(dst, [0x12, 0x12, 0xF0, 0xF0]);
    }

    #[test]
    fn short_rows_are_rejected() {
        let p = profile("cupsColorSpace=CMYK");
        let mut asm = LineAssembler::new(&p, SourceColorSpace::Rgb, 4, false);
        let mut dst = [0u8; 16];
        assert!(matches!(
            asm.assemble(&[0; 5], 0, 0, &mut dst),
            Err(RasterError::ImageGeometry(_))
        ));
    }
}
