use anyhow::{Context, Result, bail};
use image::{DynamicImage, GenericImageView};
use std::path::{Path, PathBuf};

use crate::detection::{contours, preprocessing};
use crate::detection::preprocessing::Polarity;
use crate::models::{Mask, SegmentationMask};

/// Anything that turns an image into candidate object masks.
///
/// The masks come back in the collaborator's own order; the selector keeps it.
pub trait Segmenter {
    type Mask: SegmentationMask;

    /// `source` is the path the image was loaded from, for collaborators that
    /// key their output on the filename.
    fn generate(&self, image: &DynamicImage, source: &Path) -> Result<Vec<Self::Mask>>;

    /// Human-readable name (used in log output)
    fn name(&self) -> &str;
}

/// Classical fallback: blur, Otsu threshold, one mask per connected component
#[derive(Debug, Clone)]
pub struct ThresholdSegmenter {
    pub sigma: f32,
    pub polarity: Polarity,
    pub min_area: u64,
}

impl ThresholdSegmenter {
    pub fn new() -> Self {
        Self {
            sigma: 2.0,
            polarity: Polarity::Dark,
            min_area: 64,
        }
    }
}

impl Default for ThresholdSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter for ThresholdSegmenter {
    type Mask = Mask;

    fn generate(&self, image: &DynamicImage, _source: &Path) -> Result<Vec<Mask>> {
        let gray = preprocessing::to_grayscale(image);
        let blurred = preprocessing::apply_blur(&gray, self.sigma);
        let binary = preprocessing::binarize(&blurred, self.polarity);
        Ok(contours::component_masks(&binary, self.min_area))
    }

    fn name(&self) -> &str {
        "Otsu Threshold"
    }
}

/// A mask exported by an external segmentation model, with the file it came from
#[derive(Debug, Clone)]
pub struct MaskFile {
    pub path: PathBuf,
    pub mask: Mask,
}

impl SegmentationMask for MaskFile {
    fn segmentation(&self) -> &Mask {
        &self.mask
    }
}

/// Reads masks that an external model wrote next to each other as
/// `<stem>_mask_<n>.png`. Nonzero pixels are foreground; masks are returned in
/// ascending `n`.
#[derive(Debug, Clone)]
pub struct PrecomputedMasks {
    dir: PathBuf,
}

impl PrecomputedMasks {
    /// Fails if the mask directory does not exist: without it there is no
    /// segmentation collaborator at all.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            bail!("Mask directory not found: {}", dir.display());
        }
        Ok(Self { dir })
    }

    /// Mask files belonging to `stem`, sorted by their numeric suffix
    pub fn mask_paths(&self, stem: &str) -> Result<Vec<PathBuf>> {
        let prefix = format!("{}_mask_", stem);
        let mut found = Vec::new();

        for entry in std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read mask directory {}", self.dir.display()))?
        {
            let path = entry?.path();
            let Some(file_stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let is_png = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("png"));
            if !is_png {
                continue;
            }
            if let Some(index) = file_stem
                .strip_prefix(&prefix)
                .and_then(|n| n.parse::<usize>().ok())
            {
                found.push((index, path));
            }
        }

        found.sort_by_key(|(index, _)| *index);
        Ok(found.into_iter().map(|(_, path)| path).collect())
    }
}

impl Segmenter for PrecomputedMasks {
    type Mask = MaskFile;

    fn generate(&self, image: &DynamicImage, source: &Path) -> Result<Vec<MaskFile>> {
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow::anyhow!("Invalid image filename: {}", source.display()))?;
        let (width, height) = image.dimensions();

        let mut masks = Vec::new();
        for path in self.mask_paths(stem)? {
            let img = image::open(&path)
                .map_err(|e| anyhow::anyhow!("Failed to decode mask {}: {}", path.display(), e))?;
            if img.dimensions() != (width, height) {
                bail!(
                    "Mask {} is {}x{}, image is {}x{}",
                    path.display(),
                    img.width(),
                    img.height(),
                    width,
                    height
                );
            }
            let mask = Mask::from_luma(&img.to_luma8());
            masks.push(MaskFile { path, mask });
        }

        if masks.is_empty() {
            tracing::warn!(image = %source.display(), "no precomputed masks found");
        }
        Ok(masks)
    }

    fn name(&self) -> &str {
        "Precomputed Masks"
    }
}
