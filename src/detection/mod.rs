pub mod preprocessing;
pub mod contours;
pub mod geometry;
pub mod selector;
pub mod segmentation;

pub use geometry::{Evaluation, evaluate};
pub use segmentation::{MaskFile, PrecomputedMasks, Segmenter, ThresholdSegmenter};
pub use selector::{Accepted, SelectionConfig, Verdict, classify, select};
