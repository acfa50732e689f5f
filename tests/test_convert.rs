//! Fuse, export and batch pairing between MRC containers, records and MAT files.

mod common;

use lipopick::convert::{
    self, CENTER_X_FIELD, CENTER_Y_FIELD, FuseConfig, MICROGRAPH_FIELD, RADIUS_FIELD,
    SUBTRACTED_FIELD,
};
use lipopick::formats::{MatVariable, read_mat, read_mrc, write_mat};

use common::*;

fn fuse_dirs(root: &std::path::Path) -> FuseConfig {
    let config = FuseConfig {
        mrc_dir: root.join("mrc"),
        record_dir: root.join("records"),
        output_dir: root.join("mat"),
    };
    std::fs::create_dir_all(&config.mrc_dir).unwrap();
    std::fs::create_dir_all(&config.record_dir).unwrap();
    config
}

#[test]
fn test_fuse_packs_micrograph_and_columns() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let mrc = write_test_mrc(dir.path(), "A", 4, 5);
    let record = write_test_record(
        dir.path(),
        "A",
        &[
            "Round Mask 1: Center = (1, 2), Radius = 100.25",
            "Round Mask 2: Center = (3, 4), Radius = 150.00",
        ],
    );

    let fused = convert::fuse(&mrc, Some(&record))?;
    assert_eq!(fused.micrograph, read_mrc(&mrc)?);
    assert_eq!(fused.geometry.x(), &[1.0, 3.0]);

    let out = dir.path().join("out.mat");
    convert::write_matrix_record(&fused, &out)?;
    let mat = read_mat(&out)?;

    let names: Vec<&str> = mat.names().collect();
    assert_eq!(names, vec![CENTER_X_FIELD, CENTER_Y_FIELD, RADIUS_FIELD, MICROGRAPH_FIELD]);
    for field in [CENTER_X_FIELD, CENTER_Y_FIELD, RADIUS_FIELD] {
        assert_eq!(mat.get(field).unwrap().shape(), &[2, 1]);
    }
    assert_eq!(
        mat.get(RADIUS_FIELD).unwrap().data(),
        &NumericData::Double(vec![100.25, 150.0])
    );
    // Micrograph keeps its stored type and layout
    assert_eq!(mat.get(MICROGRAPH_FIELD), Some(&fused.micrograph));
    Ok(())
}

#[test]
fn test_fuse_without_record_writes_empty_columns() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let mrc = write_test_mrc(dir.path(), "lonely", 3, 3);

    let fused = convert::fuse(&mrc, None)?;
    assert!(fused.geometry.is_empty());

    let out = dir.path().join("lonely.mat");
    convert::write_matrix_record(&fused, &out)?;
    let mat = read_mat(&out)?;
    for field in [CENTER_X_FIELD, CENTER_Y_FIELD, RADIUS_FIELD] {
        let column = mat.get(field).expect("empty column is still written");
        assert_eq!(column.shape(), &[0, 1]);
    }
    Ok(())
}

#[test]
fn test_fuse_fails_on_unreadable_container() {
    let dir = tempfile::TempDir::new().unwrap();
    let missing = dir.path().join("nope.mrc");
    assert!(convert::fuse(&missing, None).is_err());

    let junk = dir.path().join("junk.mrc");
    std::fs::write(&junk, b"not an mrc file").unwrap();
    assert!(convert::fuse(&junk, None).is_err());
}

#[test]
fn test_batch_pairs_by_stem_and_counts_from_zero() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let config = fuse_dirs(dir.path());
    write_test_mrc(&config.mrc_dir, "A", 2, 2);
    write_test_mrc(&config.mrc_dir, "B", 2, 2);
    write_test_record(&config.record_dir, "A", &["Round Mask 1: Center = (1, 1), Radius = 120.00"]);

    let report = convert::fuse_directory(&config)?;

    assert_eq!(report.written.len(), 1);
    assert_eq!(report.written[0].index, 0);
    assert_eq!(report.written[0].output, config.output_dir.join("MicData_0.mat"));
    assert!(report.written[0].container.ends_with("A.mrc"));
    assert_eq!(report.unmatched, vec![config.mrc_dir.join("B.mrc")]);
    assert!(report.failed.is_empty());

    assert!(config.output_dir.join("MicData_0.mat").is_file());
    assert!(!config.output_dir.join("MicData_1.mat").exists());
    Ok(())
}

#[test]
fn test_batch_skips_do_not_consume_indices() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let config = fuse_dirs(dir.path());
    for stem in ["a", "b", "c", "d"] {
        write_test_mrc(&config.mrc_dir, stem, 2, 3);
    }
    // "c" is paired but unreadable
    std::fs::write(config.mrc_dir.join("c.mrc"), b"broken")?;
    for stem in ["a", "c", "d"] {
        write_test_record(&config.record_dir, stem, &["Round Mask 1: Center = (0, 0), Radius = 100.00"]);
    }

    let report = convert::fuse_directory(&config)?;

    let produced: Vec<(usize, String)> = report
        .written
        .iter()
        .map(|w| (w.index, w.container.file_stem().unwrap().to_string_lossy().into_owned()))
        .collect();
    assert_eq!(produced, vec![(0, "a".to_string()), (1, "d".to_string())]);
    assert_eq!(report.unmatched.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].0.ends_with("c.mrc"));
    Ok(())
}

#[test]
fn test_batch_survives_corrupt_container_header() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let config = fuse_dirs(dir.path());

    // Header claims i32::MAX in every dimension over a few bytes of data
    let mut corrupt = vec![0u8; 1024];
    for offset in [0, 4, 8] {
        corrupt[offset..offset + 4].copy_from_slice(&i32::MAX.to_le_bytes());
    }
    corrupt[12..16].copy_from_slice(&2i32.to_le_bytes());
    corrupt[208..212].copy_from_slice(b"MAP ");
    corrupt.extend_from_slice(&[0u8; 16]);
    std::fs::write(config.mrc_dir.join("a_corrupt.mrc"), corrupt)?;
    write_test_mrc(&config.mrc_dir, "b_good", 2, 3);
    for stem in ["a_corrupt", "b_good"] {
        write_test_record(&config.record_dir, stem, &["Round Mask 1: Center = (1, 1), Radius = 120.00"]);
    }

    let report = convert::fuse_directory(&config)?;

    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].0.ends_with("a_corrupt.mrc"));
    assert_eq!(report.written.len(), 1);
    assert_eq!(report.written[0].index, 0);
    assert!(config.output_dir.join("MicData_0.mat").is_file());
    Ok(())
}

#[test]
fn test_batch_requires_input_directories() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = FuseConfig {
        mrc_dir: dir.path().join("missing"),
        record_dir: dir.path().to_path_buf(),
        output_dir: dir.path().join("out"),
    };
    assert!(convert::fuse_directory(&config).is_err());
}

#[test]
fn test_export_coerces_to_single_and_overwrites() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let mat = dir.path().join("subtracted.mat");
    let micrograph = NumericArray::new(
        vec![2, 3],
        NumericData::Double(vec![0.5, -1.25, 2.0, 3.0, 4.5, 0.25]),
    )
    .unwrap();
    write_mat(
        &mat,
        &[
            MatVariable::new("dVesicleR", NumericArray::column(vec![100.0])),
            MatVariable::new(SUBTRACTED_FIELD, micrograph.clone()),
        ],
    )?;

    let target = dir.path().join("output_micrograph.mrc");
    std::fs::write(&target, b"stale contents")?;
    convert::export(&mat, SUBTRACTED_FIELD, &target)?;

    let back = read_mrc(&target)?;
    assert_eq!(back.shape(), &[2, 3]);
    assert_eq!(back.data(), &NumericData::Single(vec![0.5, -1.25, 2.0, 3.0, 4.5, 0.25]));
    assert_eq!(back, micrograph.to_single());
    Ok(())
}

#[test]
fn test_export_reports_missing_field() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let mat = dir.path().join("other.mat");
    write_mat(&mat, &[MatVariable::new("x", NumericArray::column(vec![1.0]))])?;

    let err = convert::export(&mat, SUBTRACTED_FIELD, &dir.path().join("out.mrc")).unwrap_err();
    assert!(err.to_string().contains(SUBTRACTED_FIELD), "got: {}", err);
    Ok(())
}

#[test]
fn test_preview_stretches_to_full_range() -> anyhow::Result<()> {
    let array = NumericArray::new(vec![1, 3], NumericData::Int16(vec![-10, 0, 10]))
        .expect("shape matches");
    let img = convert::to_preview(&array)?;
    assert_eq!(img.as_raw(), &vec![0u8, 127, 255]);

    let flat = NumericArray::new(vec![2, 2], NumericData::Single(vec![4.0; 4])).unwrap();
    assert!(convert::to_preview(&flat)?.pixels().all(|p| p[0] == 0));
    Ok(())
}

#[test]
fn test_preview_directory_writes_jpegs() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let mrc_dir = dir.path().join("mrc");
    std::fs::create_dir_all(&mrc_dir)?;
    write_test_mrc(&mrc_dir, "stack_01", 8, 8);

    let out = dir.path().join("images");
    let written = convert::preview_directory(&mrc_dir, &out)?;
    assert_eq!(written, vec![out.join("stack_01.jpg")]);
    let img = image::open(&written[0])?;
    assert_eq!((img.width(), img.height()), (8, 8));
    Ok(())
}
