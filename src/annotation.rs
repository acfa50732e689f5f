//! Per-image outputs of the detection stage: a colored overlay and the
//! `_centers_and_radii.txt` record that the converter later reads back.

use anyhow::{Context, Result};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut};
use rand::Rng;
use std::path::{Path, PathBuf};

use crate::detection::Accepted;
use crate::models::{RoundObject, SegmentationMask};

pub const OVERLAY_SUFFIX: &str = "_round_masks.png";
pub const RECORD_SUFFIX: &str = "_centers_and_radii.txt";

const IMAGE_WEIGHT: f32 = 0.6;
const LAYER_WEIGHT: f32 = 0.4;
const CENTER_MARKER_RADIUS: i32 = 5;
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Paths written for one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationPaths {
    pub overlay: PathBuf,
    pub record: PathBuf,
}

/// Record filename for an image or container stem
pub fn record_file_name(stem: &str) -> String {
    format!("{}{}", stem, RECORD_SUFFIX)
}

pub fn overlay_file_name(stem: &str) -> String {
    format!("{}{}", stem, OVERLAY_SUFFIX)
}

/// One line per object, 1-based index, radius with two decimals
pub fn format_record(objects: &[RoundObject]) -> String {
    objects
        .iter()
        .enumerate()
        .map(|(idx, obj)| {
            format!(
                "Round Mask {}: Center = ({}, {}), Radius = {:.2}\n",
                idx + 1,
                obj.center.x,
                obj.center.y,
                obj.radius
            )
        })
        .collect()
}

pub fn write_record(path: &Path, objects: &[RoundObject]) -> Result<()> {
    std::fs::write(path, format_record(objects))
        .with_context(|| format!("Failed to write record {}", path.display()))
}

/// Paint accepted masks in random colors with center and radius markers,
/// then blend 60/40 over the image.
pub fn render_overlay<M: SegmentationMask>(
    image: &DynamicImage,
    masks: &[M],
    accepted: &[Accepted],
    rng: &mut impl Rng,
) -> RgbImage {
    let base = image.to_rgb8();
    let (width, height) = base.dimensions();
    let mut layer = RgbImage::new(width, height);

    for item in accepted {
        let color = Rgb([
            rng.random_range(0..255u8),
            rng.random_range(0..255u8),
            rng.random_range(0..255u8),
        ]);

        if let Some(mask) = masks.get(item.mask_index) {
            for (x, y) in mask.segmentation().foreground() {
                if x < width && y < height {
                    layer.put_pixel(x, y, color);
                }
            }
        }

        let center = (item.object.center.x as i32, item.object.center.y as i32);
        let radius = item.object.radius as i32;
        draw_filled_circle_mut(&mut layer, center, CENTER_MARKER_RADIUS, WHITE);
        // Two concentric rings give a 2 px outline
        draw_hollow_circle_mut(&mut layer, center, radius, WHITE);
        if radius > 0 {
            draw_hollow_circle_mut(&mut layer, center, radius - 1, WHITE);
        }
    }

    blend(&base, &layer)
}

fn blend(base: &RgbImage, layer: &RgbImage) -> RgbImage {
    RgbImage::from_fn(base.width(), base.height(), |x, y| {
        let a = base.get_pixel(x, y);
        let b = layer.get_pixel(x, y);
        let mix = |i: usize| {
            (a[i] as f32 * IMAGE_WEIGHT + b[i] as f32 * LAYER_WEIGHT)
                .round()
                .clamp(0.0, 255.0) as u8
        };
        Rgb([mix(0), mix(1), mix(2)])
    })
}

/// Write `{stem}_round_masks.png` and `{stem}_centers_and_radii.txt` into
/// `output_dir`, creating it if needed.
pub fn write_annotations<M: SegmentationMask>(
    image: &DynamicImage,
    masks: &[M],
    accepted: &[Accepted],
    image_name: &Path,
    output_dir: &Path,
    rng: &mut impl Rng,
) -> Result<AnnotationPaths> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let stem = image_name
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid image filename: {}", image_name.display()))?;

    let overlay_path = output_dir.join(overlay_file_name(stem));
    let overlay = render_overlay(image, masks, accepted, rng);
    overlay
        .save(&overlay_path)
        .map_err(|e| anyhow::anyhow!("Failed to save overlay {}: {}", overlay_path.display(), e))?;

    let record_path = output_dir.join(record_file_name(stem));
    let objects: Vec<RoundObject> = accepted.iter().map(|a| a.object).collect();
    write_record(&record_path, &objects)?;

    tracing::debug!(
        overlay = %overlay_path.display(),
        record = %record_path.display(),
        objects = objects.len(),
        "annotations written"
    );

    Ok(AnnotationPaths {
        overlay: overlay_path,
        record: record_path,
    })
}
