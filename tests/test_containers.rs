//! MRC and MAT codecs through the public API.

mod common;

use lipopick::formats::mrc::{Mode, read_header};
use lipopick::formats::{MatError, MatVariable, MrcError, read_mat, read_mrc, read_variable, write_mat, write_mrc};

use common::*;

#[test]
fn test_mrc_stack_keeps_three_dimensions() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("stack.mrc");
    let data: Vec<f32> = (0..2 * 3 * 4).map(|v| v as f32).collect();
    let stack = NumericArray::new(vec![2, 3, 4], NumericData::Single(data)).unwrap();

    write_mrc(&path, &stack)?;
    let header = read_header(&path)?;
    assert_eq!((header.nx, header.ny, header.nz), (4, 3, 2));
    assert_eq!(header.mode, Mode::Float32);
    assert_eq!(read_mrc(&path)?, stack);
    Ok(())
}

#[test]
fn test_mrc_write_coerces_integers_to_float() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("ints.mrc");
    let ints = NumericArray::new(vec![2, 2], NumericData::Uint16(vec![0, 1, 65535, 7])).unwrap();

    write_mrc(&path, &ints)?;
    let back = read_mrc(&path)?;
    assert_eq!(back.data(), &NumericData::Single(vec![0.0, 1.0, 65535.0, 7.0]));
    Ok(())
}

#[test]
fn test_mrc_rejects_one_dimensional_data() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("line.mrc");
    let line = NumericArray::new(vec![3], NumericData::Single(vec![1.0, 2.0, 3.0])).unwrap();
    assert!(matches!(write_mrc(&path, &line), Err(MrcError::Dimensions { ndim: 1, .. })));
}

#[test]
fn test_mrc_truncated_data_is_an_error() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = write_test_mrc(dir.path(), "short", 4, 4);
    let mut bytes = std::fs::read(&path)?;
    bytes.truncate(bytes.len() - 4);
    std::fs::write(&path, bytes)?;

    assert!(matches!(read_mrc(&path), Err(MrcError::Truncated { .. })));
    Ok(())
}

#[test]
fn test_mat_preserves_names_types_and_layout() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("mixed.mat");
    let vars = vec![
        MatVariable::new("a", NumericArray::new(vec![2, 3], NumericData::Int16(vec![1, 2, 3, 4, 5, 6])).unwrap()),
        MatVariable::new("b", NumericArray::column(vec![])),
        MatVariable::new("c_long_name", NumericArray::new(vec![1, 1], NumericData::Uint8(vec![9])).unwrap()),
    ];

    write_mat(&path, &vars)?;
    let file = read_mat(&path)?;
    assert_eq!(file.variables, vars);
    Ok(())
}

#[test]
fn test_mat_missing_variable() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("one.mat");
    write_mat(&path, &[MatVariable::new("only", NumericArray::column(vec![2.0]))])?;

    assert!(matches!(
        read_variable(&path, "absent"),
        Err(MatError::MissingVariable { .. })
    ));
    Ok(())
}

#[test]
fn test_mat_rejects_invalid_variable_name() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("bad.mat");
    let result = write_mat(&path, &[MatVariable::new("not valid", NumericArray::column(vec![1.0]))]);
    assert!(matches!(result, Err(MatError::InvalidName { .. })));
}

#[test]
fn test_non_mat_file_is_malformed() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("text.mat");
    std::fs::write(&path, vec![b'x'; 200])?;
    assert!(matches!(read_mat(&path), Err(MatError::Malformed { .. })));
    Ok(())
}
