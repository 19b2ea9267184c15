//! Pupil localization inside an eye crop
//!
//! The pupil is the darkest compact blob of the eye. The crop is converted to
//! grayscale, blurred, inverted-thresholded against a Gaussian-weighted local
//! mean, and the largest 8-connected foreground blob is taken as the pupil.

use image::{GrayImage, Luma, RgbImage};
use imageproc::region_labelling::{connected_components, Connectivity};
use std::collections::HashMap;

/// Border handling for separable filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Border {
    /// `gfedcb|abcdefgh|gfedcba`
    Reflect101,
    /// `aaaaaa|abcdefgh|hhhhhhh`
    Replicate,
}

impl Border {
    fn resolve(self, index: i64, len: i64) -> i64 {
        if len <= 1 {
            return 0;
        }
        match self {
            Border::Replicate => index.clamp(0, len - 1),
            Border::Reflect101 => {
                let mut i = index;
                while i < 0 || i >= len {
                    i = if i < 0 { -i } else { 2 * (len - 1) - i };
                }
                i
            }
        }
    }
}

/// Axis-aligned bounding box of a connected blob
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blob {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Number of foreground pixels
    pub area: usize,
}

impl Blob {
    /// Bounding-box center, integer division
    pub fn center(&self) -> (u32, u32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }
}

/// BT.601 luma
pub fn to_grayscale(image: &RgbImage) -> GrayImage {
    let mut gray = GrayImage::new(image.width(), image.height());
    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let luma = 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
        gray.put_pixel(x, y, Luma([luma.round().clamp(0.0, 255.0) as u8]));
    }
    gray
}

/// Standard deviation implied by a kernel size when none is given
pub fn sigma_for_kernel(size: usize) -> f64 {
    0.3 * ((size as f64 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalized 1-D Gaussian kernel
pub fn gaussian_kernel(size: usize, sigma: f64) -> Vec<f64> {
    let half = (size / 2) as f64;
    let raw: Vec<f64> = (0..size)
        .map(|i| {
            let d = i as f64 - half;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / sum).collect()
}

/// Separable Gaussian blur with the sigma implied by `size`
pub fn gaussian_blur(image: &GrayImage, size: usize, border: Border) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }
    let kernel = gaussian_kernel(size, sigma_for_kernel(size));
    let half = (size / 2) as i64;
    let (w, h) = (width as i64, height as i64);

    let mut horizontal = vec![0.0f64; (width * height) as usize];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = border.resolve(x + k as i64 - half, w);
                acc += weight * image.get_pixel(sx as u32, y as u32).0[0] as f64;
            }
            horizontal[(y * w + x) as usize] = acc;
        }
    }

    let mut out = GrayImage::new(width, height);
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = border.resolve(y + k as i64 - half, h);
                acc += weight * horizontal[(sy * w + x) as usize];
            }
            out.put_pixel(x as u32, y as u32, Luma([acc.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

/// Inverted adaptive threshold against a Gaussian-weighted local mean.
///
/// A pixel becomes foreground (255) when `src <= mean - c`.
pub fn adaptive_threshold_inv(image: &GrayImage, block_size: usize, c: f64) -> GrayImage {
    let mean = gaussian_blur(image, block_size, Border::Replicate);
    let mut out = GrayImage::new(image.width(), image.height());
    for (x, y, pixel) in image.enumerate_pixels() {
        let local = mean.get_pixel(x, y).0[0] as f64;
        let value = if pixel.0[0] as f64 <= local - c { 255 } else { 0 };
        out.put_pixel(x, y, Luma([value]));
    }
    out
}

/// Largest 8-connected foreground blob; the first one in raster order wins ties
pub fn largest_blob(mask: &GrayImage) -> Option<Blob> {
    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));

    // Blobs keyed by label, in order of their first pixel in raster order
    let mut order: HashMap<u32, usize> = HashMap::new();
    let mut blobs: Vec<(u32, u32, u32, u32, usize)> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label.0[0];
        if label == 0 {
            continue;
        }
        let slot = *order.entry(label).or_insert_with(|| {
            blobs.push((x, y, x, y, 0));
            blobs.len() - 1
        });
        let (x0, y0, x1, y1, area) = &mut blobs[slot];
        *x0 = (*x0).min(x);
        *y0 = (*y0).min(y);
        *x1 = (*x1).max(x);
        *y1 = (*y1).max(y);
        *area += 1;
    }

    let mut best: Option<Blob> = None;
    for (x0, y0, x1, y1, area) in blobs {
        if best.map_or(true, |b| area > b.area) {
            best = Some(Blob {
                x: x0,
                y: y0,
                width: x1 - x0 + 1,
                height: y1 - y0 + 1,
                area,
            });
        }
    }
    best
}

/// Parameters of the localization pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PupilParams {
    pub blur_kernel_size: usize,
    pub block_size: usize,
    pub c: f64,
}

/// Pupil position in crop coordinates, `None` when no blob is found
pub fn locate_pupil(crop: &RgbImage, params: &PupilParams) -> Option<(u32, u32)> {
    if crop.width() == 0 || crop.height() == 0 {
        return None;
    }
    let gray = to_grayscale(crop);
    let blurred = gaussian_blur(&gray, params.blur_kernel_size, Border::Reflect101);
    let mask = adaptive_threshold_inv(&blurred, params.block_size, params.c);
    largest_blob(&mask).map(|blob| blob.center())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::Rgb;

    /// Paint a filled dark disk
    pub(crate) fn draw_disk(image: &mut RgbImage, cx: i64, cy: i64, radius: i64) {
        for y in (cy - radius)..=(cy + radius) {
            for x in (cx - radius)..=(cx + radius) {
                let inside = (x - cx).pow(2) + (y - cy).pow(2) <= radius * radius;
                if inside && x >= 0 && y >= 0 && x < image.width() as i64 && y < image.height() as i64
                {
                    image.put_pixel(x as u32, y as u32, Rgb([10, 10, 10]));
                }
            }
        }
    }

    fn params() -> PupilParams {
        PupilParams {
            blur_kernel_size: 5,
            block_size: 11,
            c: 4.0,
        }
    }

    #[test]
    fn test_grayscale_weights() {
        let mut image = RgbImage::new(1, 1);
        image.put_pixel(0, 0, Rgb([255, 0, 0]));
        assert_eq!(to_grayscale(&image).get_pixel(0, 0).0[0], 76);
        image.put_pixel(0, 0, Rgb([255, 255, 255]));
        assert_eq!(to_grayscale(&image).get_pixel(0, 0).0[0], 255);
    }

    #[test]
    fn test_kernel_sigma() {
        assert!((sigma_for_kernel(5) - 1.1).abs() < 1e-12);
        assert!((sigma_for_kernel(11) - 2.0).abs() < 1e-12);
        let kernel = gaussian_kernel(5, 1.1);
        assert!((kernel.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((kernel[0] - kernel[4]).abs() < 1e-15);
        assert!(kernel[2] > kernel[1]);
    }

    #[test]
    fn test_border_resolution() {
        assert_eq!(Border::Reflect101.resolve(-1, 5), 1);
        assert_eq!(Border::Reflect101.resolve(-2, 5), 2);
        assert_eq!(Border::Reflect101.resolve(5, 5), 3);
        assert_eq!(Border::Reflect101.resolve(-4, 2), 0);
        assert_eq!(Border::Replicate.resolve(-3, 5), 0);
        assert_eq!(Border::Replicate.resolve(9, 5), 4);
        assert_eq!(Border::Reflect101.resolve(3, 1), 0);
    }

    #[test]
    fn test_blur_preserves_flat_image() {
        let image = GrayImage::from_pixel(7, 4, Luma([200]));
        let blurred = gaussian_blur(&image, 5, Border::Reflect101);
        assert!(blurred.pixels().all(|p| p.0[0] == 200));
    }

    #[test]
    fn test_flat_image_has_no_foreground() {
        let image = GrayImage::from_pixel(20, 20, Luma([128]));
        let mask = adaptive_threshold_inv(&image, 11, 4.0);
        assert!(mask.pixels().all(|p| p.0[0] == 0));
        assert_eq!(largest_blob(&mask), None);
    }

    #[test]
    fn test_largest_blob_picks_biggest() {
        let mut mask = GrayImage::new(10, 10);
        mask.put_pixel(0, 0, Luma([255]));
        for (x, y) in [(5, 5), (6, 6), (7, 5), (6, 4)] {
            mask.put_pixel(x, y, Luma([255]));
        }
        let blob = largest_blob(&mask).unwrap();
        assert_eq!(
            blob,
            Blob {
                x: 5,
                y: 4,
                width: 3,
                height: 3,
                area: 4
            }
        );
        assert_eq!(blob.center(), (6, 5));
    }

    #[test]
    fn test_blob_tie_keeps_first() {
        let mut mask = GrayImage::new(10, 3);
        mask.put_pixel(1, 1, Luma([255]));
        mask.put_pixel(8, 1, Luma([255]));
        assert_eq!(largest_blob(&mask).unwrap().x, 1);
    }

    #[test]
    fn test_blob_arms_joined_below() {
        // Two arms that only meet on the bottom row form one blob
        let mut mask = GrayImage::new(8, 6);
        for y in 0..5 {
            mask.put_pixel(1, y, Luma([255]));
            mask.put_pixel(5, y, Luma([255]));
        }
        for x in 1..=5 {
            mask.put_pixel(x, 5, Luma([255]));
        }
        mask.put_pixel(7, 0, Luma([255]));
        let blob = largest_blob(&mask).unwrap();
        assert_eq!((blob.x, blob.y, blob.width, blob.height), (1, 0, 5, 6));
        assert_eq!(blob.area, 15);
        assert_eq!(blob.center(), (3, 3));
    }

    #[test]
    fn test_locates_dark_disk() {
        let mut crop = RgbImage::from_pixel(50, 30, Rgb([240, 240, 240]));
        draw_disk(&mut crop, 25, 15, 4);
        assert_eq!(locate_pupil(&crop, &params()), Some((25, 15)));
    }

    #[test]
    fn test_uniform_crop_has_no_pupil() {
        let crop = RgbImage::from_pixel(50, 30, Rgb([240, 240, 240]));
        assert_eq!(locate_pupil(&crop, &params()), None);
        assert_eq!(locate_pupil(&RgbImage::new(0, 0), &params()), None);
    }
}
