use crate::models::{Centroid, Mask};
use std::f64::consts::PI;

/// Radius and roundness verdict for one mask
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub radius: f64,
    /// Mask area divided by the area of its circumscribing disk
    pub fill_ratio: f64,
    pub is_round: bool,
}

/// Maximum distance from `center` to any foreground pixel.
///
/// Callers must skip empty masks; an empty mask yields 0.0.
pub fn circumscribed_radius(mask: &Mask, center: Centroid) -> f64 {
    mask.foreground()
        .map(|(x, y)| center.distance_to(x, y))
        .fold(0.0, f64::max)
}

/// Area of the mask relative to a disk of the given radius
pub fn fill_ratio(area: u64, radius: f64) -> f64 {
    let circle_area = PI * radius * radius;
    if circle_area == 0.0 {
        return if area > 0 { f64::INFINITY } else { 0.0 };
    }
    area as f64 / circle_area
}

/// Packing test: does the mask cover at least `threshold` of its circumscribing disk?
pub fn is_round_enough(mask: &Mask, radius: f64, threshold: f64) -> bool {
    let circle_area = PI * radius * radius;
    mask.area() as f64 >= threshold * circle_area
}

/// Compute radius and roundness of a non-empty mask around its centroid
pub fn evaluate(mask: &Mask, center: Centroid, threshold: f64) -> Evaluation {
    let radius = circumscribed_radius(mask, center);
    Evaluation {
        radius,
        fill_ratio: fill_ratio(mask.area(), radius),
        is_round: is_round_enough(mask, radius, threshold),
    }
}
