//! Geometry evaluator and round-object selector.

mod common;

use lipopick::detection::geometry::{circumscribed_radius, evaluate, fill_ratio, is_round_enough};
use lipopick::detection::selector::{classify, select};

use common::*;

#[test]
fn test_disk_is_round() {
    let mask = disk_mask(300, 300, 150.0, 150.0, 120.0);
    let center = mask.centroid().expect("disk has area");

    for threshold in [0.5, 0.9, 0.99] {
        let eval = evaluate(&mask, center, threshold);
        assert!(eval.is_round, "disk should pass threshold {}, ratio {}", threshold, eval.fill_ratio);
    }
}

#[test]
fn test_elongated_ellipse_is_not_round() {
    // 10:1 aspect ratio, same area as a disk of radius 120
    let a = 120.0 * 10f64.sqrt();
    let b = 120.0 / 10f64.sqrt();
    let mask = ellipse_mask(900, 200, 450.0, 100.0, a, b);
    let center = mask.centroid().expect("ellipse has area");

    let eval = evaluate(&mask, center, 0.9);
    assert!(!eval.is_round);
    assert!(eval.fill_ratio < 0.2, "fill ratio was {}", eval.fill_ratio);
}

#[test]
fn test_radius_matches_disk() {
    let mask = disk_mask(400, 400, 200.0, 180.0, 110.5);
    let center = mask.centroid().expect("disk has area");
    assert_eq!(center, Centroid::new(200, 180));

    let radius = circumscribed_radius(&mask, center);
    assert!((radius - 110.5).abs() <= 1.0, "radius was {}", radius);
}

#[test]
fn test_centroid_truncates_and_empty_mask_has_none() {
    let mut mask = Mask::new(10, 10);
    assert_eq!(mask.centroid(), None);

    mask.set(2, 3, true);
    mask.set(3, 3, true);
    // m10 / m00 = 2.5, truncated to 2
    assert_eq!(mask.centroid(), Some(Centroid::new(2, 3)));
    assert_eq!(mask.moments().m00, 2);
}

#[test]
fn test_roundness_has_no_upper_clamp() {
    // A 3x3 block around its center fills more than its circumscribing disk
    let mask = Mask::from_fn(5, 5, |x, y| (1..=3).contains(&x) && (1..=3).contains(&y));
    let center = mask.centroid().unwrap();
    let radius = circumscribed_radius(&mask, center);
    assert!(fill_ratio(mask.area(), radius) > 1.0);
    assert!(is_round_enough(&mask, radius, 1.0));
}

#[test]
fn test_evaluate_agrees_with_packing_test() {
    let masks = [
        disk_mask(300, 300, 150.0, 150.0, 120.0),
        ellipse_mask(400, 200, 200.0, 100.0, 150.0, 60.0),
        Mask::from_fn(5, 5, |x, y| (1..=3).contains(&x) && (1..=3).contains(&y)),
    ];
    for mask in &masks {
        let center = mask.centroid().unwrap();
        for threshold in [0.3, 0.6, 0.9, 1.0, 1.5] {
            let eval = evaluate(mask, center, threshold);
            assert_eq!(eval.is_round, is_round_enough(mask, eval.radius, threshold));
        }
    }
}

#[test]
fn test_selector_keeps_input_order() {
    let (w, h) = (700, 300);
    let masks = vec![
        disk_mask(w, h, 150.0, 150.0, 120.0),
        Mask::new(w, h),
        ellipse_mask(w, h, 350.0, 150.0, 300.0, 20.0),
        disk_mask(w, h, 350.0, 150.0, 50.0),
        disk_mask(w, h, 560.0, 150.0, 110.0),
    ];
    let config = SelectionConfig::default();

    let verdicts = classify(&masks, &config);
    assert!(verdicts[0].is_accepted());
    assert_eq!(verdicts[1], Verdict::Empty);
    assert!(matches!(verdicts[2], Verdict::NotRound { .. }));
    assert!(matches!(verdicts[3], Verdict::TooSmall { .. }));
    assert!(verdicts[4].is_accepted());

    let accepted = select(&masks, &config);
    let indices: Vec<usize> = accepted.iter().map(|a| a.mask_index).collect();
    assert_eq!(indices, vec![0, 4]);
    assert_eq!(accepted[0].object.center, Centroid::new(150, 150));
    assert_eq!(accepted[1].object.center, Centroid::new(560, 150));

    // Reversed input gives reversed output, never a size or position sort
    let reversed: Vec<Mask> = masks.into_iter().rev().collect();
    let centers: Vec<Centroid> = select(&reversed, &config)
        .iter()
        .map(|a| a.object.center)
        .collect();
    assert_eq!(centers, vec![Centroid::new(560, 150), Centroid::new(150, 150)]);
}

#[test]
fn test_min_radius_is_inclusive() {
    let masks = vec![disk_mask(260, 260, 130.0, 130.0, 100.0)];
    let accepted = select(&masks, &SelectionConfig::new().with_min_radius(100.0));
    assert_eq!(accepted.len(), 1);
    assert_eq!(accepted[0].object.radius, 100.0);

    let rejected = select(&masks, &SelectionConfig::new().with_min_radius(100.5));
    assert!(rejected.is_empty());
}

#[test]
fn test_config_validation() {
    assert!(SelectionConfig::default().validate().is_ok());
    assert!(SelectionConfig::new().with_threshold(0.0).validate().is_err());
    assert!(SelectionConfig::new().with_threshold(f64::NAN).validate().is_err());
    assert!(SelectionConfig::new().with_min_radius(-1.0).validate().is_err());
}
