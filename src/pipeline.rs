use anyhow::{Context, Result, bail};
use image::{DynamicImage, GenericImageView, ImageReader};
use std::path::{Path, PathBuf};

use crate::annotation::{AnnotationPaths, write_annotations};
use crate::detection::selector::{self, Accepted, SelectionConfig, Verdict};
use crate::detection::Segmenter;
use crate::models::SegmentationMask;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

/// Result for one image
#[derive(Debug, Clone)]
pub struct ImageOutcome {
    pub image: PathBuf,
    pub candidates: usize,
    pub accepted: Vec<Accepted>,
    pub paths: AnnotationPaths,
}

#[derive(Debug, Default)]
pub struct DetectionReport {
    pub processed: Vec<ImageOutcome>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Segment, select and annotate images one at a time
pub struct DetectionPipeline<S: Segmenter> {
    segmenter: S,
    config: SelectionConfig,
    debug: Option<DebugConfig>,
}

impl<S: Segmenter> DetectionPipeline<S> {
    pub fn new(segmenter: S) -> Self {
        Self {
            segmenter,
            config: SelectionConfig::default(),
            debug: None,
        }
    }

    pub fn with_config(mut self, config: SelectionConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Enable debug mode with output directory.
    /// The directory must be empty or non-existent.
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                bail!("Debug directory is not empty: {}", output_dir.display());
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.debug = Some(DebugConfig { output_dir });
        Ok(self)
    }

    /// Process one image already in memory
    pub fn run_loaded(
        &self,
        image: &DynamicImage,
        source: &Path,
        output_dir: &Path,
    ) -> Result<ImageOutcome> {
        let masks = self
            .segmenter
            .generate(image, source)
            .with_context(|| format!("{} failed on {}", self.segmenter.name(), source.display()))?;

        let (width, height) = image.dimensions();
        if let Some(bad) = masks
            .iter()
            .map(|m| m.segmentation())
            .find(|m| m.dimensions() != (width, height))
        {
            bail!(
                "Mask is {}x{} but image {} is {}x{}",
                bad.width(),
                bad.height(),
                source.display(),
                width,
                height
            );
        }

        let verdicts = selector::classify(&masks, &self.config);
        let accepted = selector::accepted_from_verdicts(&verdicts);
        tracing::debug!(
            image = %source.display(),
            candidates = masks.len(),
            accepted = accepted.len(),
            "selection done"
        );

        if let Some(debug) = &self.debug {
            save_debug_masks(debug, source, &masks, &verdicts)?;
        }

        let paths = write_annotations(image, &masks, &accepted, source, output_dir, &mut rand::rng())?;

        Ok(ImageOutcome {
            image: source.to_path_buf(),
            candidates: masks.len(),
            accepted,
            paths,
        })
    }

    /// Load, segment, select and annotate a single image file
    pub fn run_image(&self, path: &Path, output_dir: &Path) -> Result<ImageOutcome> {
        let image = ImageReader::open(path)
            .with_context(|| format!("Failed to open image {}", path.display()))?
            .decode()
            .map_err(|e| anyhow::anyhow!("Failed to decode image {}: {}", path.display(), e))?;
        self.run_loaded(&image, path, output_dir)
    }

    /// Process every png/jpg/jpeg in `input_dir`. A failing image is recorded
    /// and skipped; a missing input directory aborts the run.
    pub fn run_directory(&self, input_dir: &Path, output_dir: &Path) -> Result<DetectionReport> {
        let images = list_images(input_dir)?;
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

        tracing::info!(count = images.len(), input = %input_dir.display(), "processing images");

        let mut report = DetectionReport::default();
        for path in images {
            match self.run_image(&path, output_dir) {
                Ok(outcome) => {
                    tracing::info!(
                        image = %path.display(),
                        round = outcome.accepted.len(),
                        candidates = outcome.candidates,
                        "annotated"
                    );
                    report.processed.push(outcome);
                }
                Err(e) => {
                    tracing::error!(image = %path.display(), "{:#}", e);
                    report.failed.push((path, format!("{:#}", e)));
                }
            }
        }

        Ok(report)
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|ext| e.eq_ignore_ascii_case(ext)))
}

/// Images in `dir`, sorted by name
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Input directory not found: {}", dir.display());
    }
    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read input directory {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && is_image(&path) {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

/// Save each candidate mask as `{stem}/{nn}_{verdict}.png`
fn save_debug_masks<M: SegmentationMask>(
    debug: &DebugConfig,
    source: &Path,
    masks: &[M],
    verdicts: &[Verdict],
) -> Result<()> {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    let dir = debug.output_dir.join(stem);
    std::fs::create_dir_all(&dir)?;

    for (idx, (mask, verdict)) in masks.iter().zip(verdicts).enumerate() {
        let filename = format!("{:02}_{}.png", idx + 1, verdict.label());
        let path = dir.join(&filename);
        mask.segmentation()
            .to_luma()
            .save(&path)
            .map_err(|e| anyhow::anyhow!("Failed to save debug mask: {}", e))?;
        tracing::trace!("Debug: saved {}/{}", stem, filename);
    }

    Ok(())
}
