use image::{GrayImage, Luma};
use imageproc::region_labelling::{Connectivity, connected_components};
use std::collections::BTreeMap;
use crate::models::Mask;

/// Split a binary image into one mask per 8-connected foreground component.
/// Components smaller than `min_area` are dropped; masks are ordered by label.
pub fn component_masks(binary: &GrayImage, min_area: u64) -> Vec<Mask> {
    let labeled = connected_components(binary, Connectivity::Eight, Luma([0u8]));
    let (width, height) = binary.dimensions();

    // Count first so that noise components never allocate a full-size mask
    let mut areas: BTreeMap<u32, u64> = BTreeMap::new();
    for label in labeled.pixels() {
        if label[0] != 0 {
            *areas.entry(label[0]).or_insert(0) += 1;
        }
    }

    let mut regions: BTreeMap<u32, Mask> = areas
        .into_iter()
        .filter(|&(_, area)| area >= min_area)
        .map(|(label, _)| (label, Mask::new(width, height)))
        .collect();

    for (x, y, label) in labeled.enumerate_pixels() {
        if let Some(mask) = regions.get_mut(&label[0]) {
            mask.set(x, y, true);
        }
    }

    regions.into_values().collect()
}
