mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from lipopick for tests
pub use lipopick::formats::{NumericArray, NumericData};
pub use lipopick::{Accepted, Centroid, Mask, RoundObject, SelectionConfig, Verdict};
