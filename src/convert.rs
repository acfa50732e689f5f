use anyhow::{Context, Result, bail};
use image::{GrayImage, Luma};
use std::path::{Path, PathBuf};

use crate::annotation::record_file_name;
use crate::formats::{
    GeometryColumns, MatVariable, NumericArray, parse_record, read_mrc, read_variable, write_mat,
    write_mrc,
};

pub const MICROGRAPH_FIELD: &str = "mMicrograph";
pub const CENTER_X_FIELD: &str = "dVesicleCntX";
pub const CENTER_Y_FIELD: &str = "dVesicleCntY";
pub const RADIUS_FIELD: &str = "dVesicleR";
/// Field holding the micrograph after vesicle subtraction
pub const SUBTRACTED_FIELD: &str = "mMicrographVesiclesSubtracted";

/// Micrograph plus the geometry of the vesicles picked on it
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixFileRecord {
    pub micrograph: NumericArray,
    pub geometry: GeometryColumns,
}

impl MatrixFileRecord {
    /// The four MAT variables; geometry is always `n x 1` double, even for n = 0
    pub fn to_variables(&self) -> Vec<MatVariable> {
        vec![
            MatVariable::new(CENTER_X_FIELD, NumericArray::column(self.geometry.x().to_vec())),
            MatVariable::new(CENTER_Y_FIELD, NumericArray::column(self.geometry.y().to_vec())),
            MatVariable::new(RADIUS_FIELD, NumericArray::column(self.geometry.radius().to_vec())),
            MatVariable::new(MICROGRAPH_FIELD, self.micrograph.clone()),
        ]
    }
}

/// Join a micrograph container with its geometry record.
///
/// The container is read verbatim. Without a record the geometry columns are
/// empty.
pub fn fuse(container: &Path, record: Option<&Path>) -> Result<MatrixFileRecord> {
    let micrograph = read_mrc(container)?;
    let geometry = match record {
        Some(path) => parse_record(path)?,
        None => {
            tracing::warn!(container = %container.display(), "no geometry record, writing empty columns");
            GeometryColumns::new()
        }
    };
    Ok(MatrixFileRecord { micrograph, geometry })
}

pub fn write_matrix_record(record: &MatrixFileRecord, path: &Path) -> Result<()> {
    write_mat(path, &record.to_variables())?;
    Ok(())
}

/// Pull one field out of a MAT file and write it as a float32 MRC container,
/// replacing `target` if it exists.
pub fn export(mat_path: &Path, field: &str, target: &Path) -> Result<()> {
    let array = read_variable(mat_path, field)?;
    write_mrc(target, &array.to_single())?;
    tracing::info!(source = %mat_path.display(), target = %target.display(), "micrograph saved");
    Ok(())
}

/// Directories for a batch fuse
#[derive(Debug, Clone)]
pub struct FuseConfig {
    pub mrc_dir: PathBuf,
    pub record_dir: PathBuf,
    pub output_dir: PathBuf,
}

/// One successfully written `.mat`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FusedOutput {
    pub index: usize,
    pub container: PathBuf,
    pub record: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Default)]
pub struct FuseReport {
    pub written: Vec<FusedOutput>,
    /// Containers without a record of the same stem
    pub unmatched: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

pub fn output_file_name(index: usize) -> String {
    format!("MicData_{}.mat", index)
}

/// Files in `dir` with the given extension, sorted by name
pub fn list_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Directory not found: {}", dir.display());
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?
    {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if path.is_file() && matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Fuse every container that has a record. Outputs are numbered from 0 in
/// container-name order; only successful fuses consume a number.
pub fn fuse_directory(config: &FuseConfig) -> Result<FuseReport> {
    let containers = list_files(&config.mrc_dir, "mrc")?;
    if !config.record_dir.is_dir() {
        bail!("Record directory not found: {}", config.record_dir.display());
    }
    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!("Failed to create output directory {}", config.output_dir.display())
    })?;

    let mut report = FuseReport::default();
    let mut next_index = 0usize;

    for container in containers {
        let Some(stem) = container.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let record = config.record_dir.join(record_file_name(stem));
        if !record.is_file() {
            tracing::warn!(container = %container.display(), "no matching record");
            report.unmatched.push(container);
            continue;
        }

        let output = config.output_dir.join(output_file_name(next_index));
        let result = fuse(&container, Some(&record)).and_then(|fused| {
            write_matrix_record(&fused, &output)?;
            Ok(fused.geometry.len())
        });

        match result {
            Ok(count) => {
                tracing::info!(
                    container = %container.display(),
                    output = %output.display(),
                    vesicles = count,
                    "fused"
                );
                report.written.push(FusedOutput {
                    index: next_index,
                    container,
                    record,
                    output,
                });
                next_index += 1;
            }
            Err(e) => {
                tracing::error!(container = %container.display(), "fuse failed: {:#}", e);
                report.failed.push((container, format!("{:#}", e)));
            }
        }
    }

    Ok(report)
}

/// Min-max stretch of the first section to 8 bits. A flat image maps to 0.
pub fn to_preview(array: &NumericArray) -> Result<GrayImage> {
    let (height, width) = match *array.shape() {
        [h, w] => (h, w),
        [_, h, w] => (h, w),
        _ => bail!("Cannot preview a {}-dimensional array", array.shape().len()),
    };
    let values = array.data().to_f64_vec();
    let section = &values[..width * height];

    let (min, max) = section
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;

    Ok(GrayImage::from_fn(width as u32, height as u32, |x, y| {
        let v = section[y as usize * width + x as usize];
        if range > 0.0 {
            Luma([((v - min) / range * 255.0) as u8])
        } else {
            Luma([0u8])
        }
    }))
}

/// Write an 8-bit JPEG preview of an MRC micrograph
pub fn preview(mrc_path: &Path, jpg_path: &Path) -> Result<()> {
    let array = read_mrc(mrc_path)?;
    let img = to_preview(&array)?;
    img.save(jpg_path)
        .map_err(|e| anyhow::anyhow!("Failed to save preview {}: {}", jpg_path.display(), e))?;
    tracing::info!(preview = %jpg_path.display(), "image saved");
    Ok(())
}

/// Preview every container in `mrc_dir` as `{stem}.jpg`; returns written paths
pub fn preview_directory(mrc_dir: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let containers = list_files(mrc_dir, "mrc")?;
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let mut written = Vec::new();
    for container in containers {
        let Some(stem) = container.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let target = output_dir.join(format!("{}.jpg", stem));
        match preview(&container, &target) {
            Ok(()) => written.push(target),
            Err(e) => tracing::error!(container = %container.display(), "preview failed: {:#}", e),
        }
    }
    Ok(written)
}
