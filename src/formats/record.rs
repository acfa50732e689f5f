use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::models::{Centroid, RoundObject};

static CIRCLE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Center\s*=\s*\((\d+),\s*(\d+)\),\s*Radius\s*=\s*([\d.]+)")
        .expect("circle record pattern is valid")
});

/// Center and radius columns recovered from a record; always equal length
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryColumns {
    x: Vec<f64>,
    y: Vec<f64>,
    radius: Vec<f64>,
}

impl GeometryColumns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, x: f64, y: f64, radius: f64) {
        self.x.push(x);
        self.y.push(y);
        self.radius.push(radius);
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn radius(&self) -> &[f64] {
        &self.radius
    }

    /// Rows back as round objects
    pub fn to_objects(&self) -> Vec<RoundObject> {
        (0..self.len())
            .map(|i| RoundObject::new(Centroid::new(self.x[i] as u32, self.y[i] as u32), self.radius[i]))
            .collect()
    }
}

/// Parse record text; lines that do not match the record grammar are skipped
pub fn parse_record_str(text: &str) -> GeometryColumns {
    let mut columns = GeometryColumns::new();

    for (line_no, line) in text.lines().enumerate() {
        let Some(caps) = CIRCLE_LINE.captures(line) else {
            tracing::trace!(line = line_no + 1, "skipping non-record line");
            continue;
        };

        let parsed = (
            caps[1].parse::<u32>(),
            caps[2].parse::<u32>(),
            caps[3].parse::<f64>(),
        );
        match parsed {
            (Ok(x), Ok(y), Ok(r)) => columns.push(x as f64, y as f64, r),
            _ => {
                tracing::trace!(line = line_no + 1, text = line, "skipping unparsable record line");
            }
        }
    }

    columns
}

/// Read and parse a `_centers_and_radii.txt` record
pub fn parse_record(path: &Path) -> Result<GeometryColumns> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read record {}", path.display()))?;
    Ok(parse_record_str(&text))
}
