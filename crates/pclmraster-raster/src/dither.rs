// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ordered-dither threshold matrices and the 1-bit line packer.

/// 16×16 Bayer thresholds, 0..=255, for 1-bit output.
pub const DITHER_1: [[u8; 16]; 16] = bayer::<16>(4);

/// 16×16 Bayer offsets, 0..=63, added before truncating to 2 bits.
pub const DITHER_2: [[u8; 16]; 16] = scale_down(DITHER_1, 2);

/// 8×8 Bayer offsets, 0..=15, added before truncating to 4 bits.
pub const DITHER_4: [[u8; 8]; 8] = scale_down(bayer::<8>(3), 2);

/// Recursive Bayer index matrix of side `N = 2^bits`: the bit-reversed
/// interleave of `row ^ col` and `row`.
const fn bayer<const N: usize>(bits: u32) -> [[u8; N]; N] {
    let mut matrix = [[0u8; N]; N];
    let mut row = 0;
    while row < N {
        let mut col = 0;
        while col < N {
            let a = row ^ col;
            let mut value = 0usize;
            let mut k = 0;
            while k < bits {
                value |= ((a >> k) & 1) << (2 * bits - 1 - 2 * k);
                value |= ((row >> k) & 1) << (2 * bits - 2 - 2 * k);
                k += 1;
            }
            matrix[row][col] = value as u8;
            col += 1;
        }
        row += 1;
    }
    matrix
}

const fn scale_down<const N: usize>(mut matrix: [[u8; N]; N], shift: u32) -> [[u8; N]; N] {
    let mut row = 0;
    while row < N {
        let mut col = 0;
        while col < N {
            matrix[row][col] >>= shift;
            col += 1;
        }
        row += 1;
    }
    matrix
}

/// Pack an 8-bit single-channel row into 1 bit per pixel, MSB first.
///
/// Bi-level mode is a hard threshold at 128; otherwise each sample is
/// compared against the Bayer matrix at `(row, x)`. Trailing bits of the
/// last byte are zero.
pub fn one_bit_line(src: &[u8], dst: &mut [u8], row: usize, bi_level: bool) {
    dst.fill(0);
    let thresholds = &DITHER_1[row & 15];
    for (x, &sample) in src.iter().enumerate() {
        let on = if bi_level {
            sample >= 128
        } else {
            sample > thresholds[x & 15]
        };
        if on {
            if let Some(byte) = dst.get_mut(x / 8) {
                *byte |= 0x80 >> (x % 8);
            }
        }
    }
}

/// Mirror a packed 1-bit row of `pixels` pixels: output pixel `i` is input
/// pixel `pixels - 1 - i`.
pub fn reverse_one_bit_line(src: &[u8], dst: &mut [u8], pixels: usize) {
    dst.fill(0);
    for i in 0..pixels {
        let j = pixels - 1 - i;
        let set = src.get(j / 8).is_some_and(|byte| byte & (0x80 >> (j % 8)) != 0);
        if set {
            if let Some(byte) = dst.get_mut(i / 8) {
                *byte |= 0x80 >> (i % 8);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bayer_matrices_are_permutations() {
        let mut seen = [false; 256];
        for row in DITHER_1 {
            for value in row {
                assert!(!seen[value as usize], "duplicate threshold {value}");
                seen[value as usize] = true;
            }
        }
        assert_eq!(DITHER_1[0][0], 0);
        assert_eq!(DITHER_1[0][1], 128);
        assert_eq!(DITHER_1[1][1], 64);

        assert!(DITHER_2.iter().flatten().all(|&v| v < 64));
        assert!(DITHER_4.iter().flatten().all(|&v| v < 16));
        assert_eq!(DITHER_4.iter().flatten().filter(|&&v| v == 15).count(), 4);
    }

    #[test]
    fn bi_level_is_a_hard_threshold() {
        let src = [0, 127, 128, 255, 200, 10, 130, 90, 255];
        let mut dst = [0xAA; 2];
        one_bit_line(&src, &mut dst, 3, true);
        assert_eq!(dst, [0b0011_1010, 0b1000_0000]);
    }

    #[test]
    fn dither_spreads_mid_gray() {
        let src = [128u8; 16];
        let mut dst = [0u8; 2];
        one_bit_line(&src, &mut dst, 0, false);
        let ones: u32 = dst.iter().map(|b| b.count_ones()).sum();
        assert!(ones > 0 && ones < 16);
    }

    #[test]
    fn extremes_survive_dithering() {
        let mut dst = [0u8; 2];
        one_bit_line(&[255; 10], &mut dst, 5, false);
        assert_eq!(dst, [0xFF, 0b1100_0000]);
        one_bit_line(&[0; 10], &mut dst, 5, false);
        assert_eq!(dst, [0, 0]);
    }

    #[test]
    fn reversing_mirrors_pixels() {
        // 10 pixels: 1100000001 -> 1000000011
        let src = [0b1100_0000, 0b0100_0000];
        let mut dst = [0u8; 2];
        reverse_one_bit_line(&src, &mut dst, 10);
        assert_eq!(dst, [0b1000_0000, 0b1100_0000]);
    }
}
