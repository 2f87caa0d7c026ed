// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image rasterisation for thermal printing.
//
// Decodes an encoded image (JPEG, PNG, ...) with the `image` crate, scales it
// down to the printable width, and reduces it to one bit per dot using 8x8
// Bayer ordered dithering.

use image::imageops::FilterType;
use tracing::{debug, instrument};

use printdown_core::error::DeviceError;

/// 8x8 Bayer threshold matrix, values 0..64.
const BAYER_8X8: [[u8; 8]; 8] = [
    [0, 32, 8, 40, 2, 34, 10, 42],
    [48, 16, 56, 24, 50, 18, 58, 26],
    [12, 44, 4, 36, 14, 46, 6, 38],
    [60, 28, 52, 20, 62, 30, 54, 22],
    [3, 35, 11, 43, 1, 33, 9, 41],
    [51, 19, 59, 27, 49, 17, 57, 25],
    [15, 47, 7, 39, 13, 45, 5, 37],
    [63, 31, 55, 23, 61, 29, 53, 21],
];

/// A 1-bit image, row-major, most significant bit first, 1 = black dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Raster {
    /// Width in dots.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in dots (rows).
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row.
    pub fn width_bytes(&self) -> usize {
        self.width.div_ceil(8) as usize
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether the dot at (x, y) is black.  Dots outside the raster are
    /// white.
    pub fn is_black(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let index = y as usize * self.width_bytes() + (x / 8) as usize;
        self.data
            .get(index)
            .is_some_and(|byte| byte & (0x80 >> (x % 8)) != 0)
    }

    /// Split into horizontal bands of at most `rows` rows each.
    pub fn bands(&self, rows: u32) -> impl Iterator<Item = (u32, &[u8])> {
        let rows = rows.max(1) as usize;
        let stride = self.width_bytes();
        self.data.chunks(stride * rows).map(move |chunk| {
            let band_rows = (chunk.len() / stride.max(1)) as u32;
            (band_rows, chunk)
        })
    }
}

/// Decode `bytes` and rasterise, never exceeding `max_width` dots.
#[instrument(skip(bytes), fields(bytes = bytes.len()))]
pub fn rasterize(bytes: &[u8], max_width: u32) -> Result<Raster, DeviceError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| DeviceError::Image(format!("failed to decode image: {e}")))?;

    let img = if img.width() > max_width {
        let height = (u64::from(img.height()) * u64::from(max_width) / u64::from(img.width()))
            .max(1) as u32;
        img.resize_exact(max_width, height, FilterType::Triangle)
    } else {
        img
    };

    let gray = img.to_luma8();
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return Err(DeviceError::Image("image has no pixels".into()));
    }

    let stride = width.div_ceil(8) as usize;
    let mut data = vec![0u8; stride * height as usize];
    for (x, y, pixel) in gray.enumerate_pixels() {
        if should_print(x, y, pixel.0[0]) {
            data[y as usize * stride + (x / 8) as usize] |= 0x80 >> (x % 8);
        }
    }

    debug!(width, height, "image rasterised");
    Ok(Raster {
        width,
        height,
        data,
    })
}

/// Ordered-dither decision for a pixel of the given luminance (0 = black).
fn should_print(x: u32, y: u32, luma: u8) -> bool {
    let darkness = 255 - u32::from(luma);
    let threshold = u32::from(BAYER_8X8[(y % 8) as usize][(x % 8) as usize]);
    // darkness / 256 > (threshold + 0.5) / 64
    darkness * 64 > threshold * 256 + 128
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, ImageFormat, Luma};
    use std::io::Cursor;

    fn png(img: GrayImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn black_and_white_are_exact() {
        let mut img = GrayImage::from_pixel(16, 2, Luma([255u8]));
        for x in 0..8 {
            img.put_pixel(x, 0, Luma([0u8]));
            img.put_pixel(x, 1, Luma([0u8]));
        }
        let raster = rasterize(&png(img), 512).unwrap();
        assert_eq!(raster.width(), 16);
        assert_eq!(raster.height(), 2);
        assert_eq!(raster.data(), &[0xFF, 0x00, 0xFF, 0x00]);
    }

    #[test]
    fn wide_images_are_scaled_down() {
        let img = GrayImage::from_pixel(1024, 100, Luma([0u8]));
        let raster = rasterize(&png(img), 512).unwrap();
        assert_eq!(raster.width(), 512);
        assert_eq!(raster.height(), 50);
        assert_eq!(raster.width_bytes(), 64);
    }

    #[test]
    fn mid_gray_is_half_covered() {
        let img = GrayImage::from_pixel(8, 8, Luma([128u8]));
        let raster = rasterize(&png(img), 512).unwrap();
        let black: u32 = raster.data().iter().map(|b| b.count_ones()).sum();
        assert!((24..=40).contains(&black), "black dots: {black}");
    }

    #[test]
    fn odd_width_pads_rows() {
        let img = GrayImage::from_pixel(10, 1, Luma([0u8]));
        let raster = rasterize(&png(img), 512).unwrap();
        assert_eq!(raster.width_bytes(), 2);
        assert_eq!(raster.data(), &[0xFF, 0xC0]);
        assert!(raster.is_black(9, 0));
    }

    #[test]
    fn dots_outside_the_raster_are_white() {
        let img = GrayImage::from_pixel(10, 1, Luma([0u8]));
        let raster = rasterize(&png(img), 512).unwrap();
        assert!(!raster.is_black(10, 0));
        assert!(!raster.is_black(15, 0));
        assert!(!raster.is_black(0, 1));
        assert!(!raster.is_black(u32::MAX, u32::MAX));
    }

    #[test]
    fn bands_split_rows() {
        let img = GrayImage::from_pixel(8, 5, Luma([0u8]));
        let raster = rasterize(&png(img), 512).unwrap();
        let bands: Vec<u32> = raster.bands(2).map(|(rows, _)| rows).collect();
        assert_eq!(bands, vec![2, 2, 1]);
    }

    #[test]
    fn garbage_is_an_image_error() {
        let err = rasterize(b"not an image", 512).unwrap_err();
        assert!(matches!(err, DeviceError::Image(_)));
    }
}
