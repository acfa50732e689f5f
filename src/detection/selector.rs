use crate::detection::geometry;
use crate::models::{RoundObject, SegmentationMask};
use anyhow::{Result, bail};

/// Thresholds applied to every candidate mask of an image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionConfig {
    /// Minimum fill ratio of the circumscribing disk
    pub threshold: f64,
    /// Minimum circumscribing radius in pixels
    pub min_radius: f64,
}

impl SelectionConfig {
    pub fn new() -> Self {
        Self {
            threshold: 0.9,
            min_radius: 100.0,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_min_radius(mut self, min_radius: f64) -> Self {
        self.min_radius = min_radius;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            bail!("Roundness threshold must be a positive number, got {}", self.threshold);
        }
        if !self.min_radius.is_finite() || self.min_radius < 0.0 {
            bail!("Minimum radius must be non-negative, got {}", self.min_radius);
        }
        Ok(())
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome for one candidate mask
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Accepted(RoundObject),
    /// Zero area, no centroid
    Empty,
    NotRound { radius: f64, fill_ratio: f64 },
    TooSmall { radius: f64 },
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted(_))
    }

    /// Short label used in debug filenames
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Accepted(_) => "accepted",
            Verdict::Empty => "empty",
            Verdict::NotRound { .. } => "not_round",
            Verdict::TooSmall { .. } => "too_small",
        }
    }
}

/// An accepted object together with the index of the mask it came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Accepted {
    pub mask_index: usize,
    pub object: RoundObject,
}

/// Judge a single mask
pub fn classify_one<M: SegmentationMask + ?Sized>(mask: &M, config: &SelectionConfig) -> Verdict {
    let mask = mask.segmentation();
    let Some(center) = mask.centroid() else {
        return Verdict::Empty;
    };

    let eval = geometry::evaluate(mask, center, config.threshold);
    if !eval.is_round {
        Verdict::NotRound {
            radius: eval.radius,
            fill_ratio: eval.fill_ratio,
        }
    } else if eval.radius < config.min_radius {
        Verdict::TooSmall { radius: eval.radius }
    } else {
        Verdict::Accepted(RoundObject::new(center, eval.radius))
    }
}

/// One verdict per mask, in input order
pub fn classify<M: SegmentationMask>(masks: &[M], config: &SelectionConfig) -> Vec<Verdict> {
    masks.iter().map(|m| classify_one(m, config)).collect()
}

/// Keep the round, large enough masks. Output order is input order; this order
/// becomes the row order of every downstream record.
pub fn select<M: SegmentationMask>(masks: &[M], config: &SelectionConfig) -> Vec<Accepted> {
    accepted_from_verdicts(&classify(masks, config))
}

pub fn accepted_from_verdicts(verdicts: &[Verdict]) -> Vec<Accepted> {
    verdicts
        .iter()
        .enumerate()
        .filter_map(|(mask_index, verdict)| match verdict {
            Verdict::Accepted(object) => Some(Accepted {
                mask_index,
                object: *object,
            }),
            Verdict::Empty => {
                tracing::trace!(mask_index, "skipping empty mask");
                None
            }
            Verdict::NotRound { radius, fill_ratio } => {
                tracing::trace!(mask_index, radius, fill_ratio, "mask not round enough");
                None
            }
            Verdict::TooSmall { radius } => {
                tracing::trace!(mask_index, radius, "mask below minimum radius");
                None
            }
        })
        .collect()
}
