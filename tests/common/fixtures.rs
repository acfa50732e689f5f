use lipopick::formats::{NumericArray, NumericData, write_mrc};
use lipopick::Mask;
use std::path::{Path, PathBuf};

/// Filled disk of `radius` around (cx, cy)
pub fn disk_mask(width: u32, height: u32, cx: f64, cy: f64, radius: f64) -> Mask {
    Mask::from_fn(width, height, |x, y| {
        let dx = x as f64 - cx;
        let dy = y as f64 - cy;
        dx * dx + dy * dy <= radius * radius
    })
}

/// Filled axis-aligned ellipse with semi-axes `a` (x) and `b` (y)
pub fn ellipse_mask(width: u32, height: u32, cx: f64, cy: f64, a: f64, b: f64) -> Mask {
    Mask::from_fn(width, height, |x, y| {
        let dx = (x as f64 - cx) / a;
        let dy = (y as f64 - cy) / b;
        dx * dx + dy * dy <= 1.0
    })
}

/// Writes a small float32 micrograph whose values encode their position
pub fn write_test_mrc(dir: &Path, stem: &str, ny: usize, nx: usize) -> PathBuf {
    let data: Vec<f32> = (0..ny * nx).map(|i| i as f32 * 0.5 - 3.0).collect();
    let array = NumericArray::new(vec![ny, nx], NumericData::Single(data))
        .expect("shape matches data");
    let path = dir.join(format!("{}.mrc", stem));
    write_mrc(&path, &array).expect("Failed to write test MRC");
    path
}

/// Writes `{stem}_centers_and_radii.txt` with the given lines
pub fn write_test_record(dir: &Path, stem: &str, lines: &[&str]) -> PathBuf {
    let path = dir.join(format!("{}_centers_and_radii.txt", stem));
    let mut text = lines.join("\n");
    text.push('\n');
    std::fs::write(&path, text).expect("Failed to write test record");
    path
}
