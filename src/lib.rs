pub mod annotation;
pub mod convert;
pub mod detection;
pub mod formats;
pub mod logging;
pub mod models;
pub mod pipeline;

pub use models::{Centroid, Mask, Moments, RoundObject, SegmentationMask};
pub use detection::{Accepted, SelectionConfig, Segmenter, Verdict};
pub use convert::{FuseConfig, FuseReport, MatrixFileRecord, export, fuse, fuse_directory};
pub use pipeline::{DetectionPipeline, DetectionReport, ImageOutcome};
