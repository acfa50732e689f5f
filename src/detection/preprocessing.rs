use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::filter::gaussian_blur_f32;

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Apply Gaussian blur to reduce noise
pub fn apply_blur(img: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 {
        return img.clone();
    }
    gaussian_blur_f32(img, sigma)
}

/// Which side of the Otsu level counts as foreground
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Dark,
    Bright,
}

/// Binarize with Otsu's level; foreground pixels become 255
pub fn binarize(img: &GrayImage, polarity: Polarity) -> GrayImage {
    let level = otsu_level(img);
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let v = img.get_pixel(x, y)[0];
        let fg = match polarity {
            Polarity::Dark => v <= level,
            Polarity::Bright => v > level,
        };
        if fg { Luma([255u8]) } else { Luma([0u8]) }
    })
}
