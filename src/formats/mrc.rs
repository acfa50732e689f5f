use std::path::Path;

use half::f16;

use super::array::{NumericArray, NumericData, element_count};
use super::error::MrcError;

pub const HEADER_LEN: usize = 1024;
const MAP_TAG: &[u8; 4] = b"MAP ";
const NVERSION: i32 = 20140;
const STAMP_LITTLE: [u8; 4] = [0x44, 0x44, 0x00, 0x00];

/// Storage modes this codec understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Int8,
    Int16,
    Float32,
    Uint16,
    Float16,
}

impl Mode {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Mode::Int8),
            1 => Some(Mode::Int16),
            2 => Some(Mode::Float32),
            6 => Some(Mode::Uint16),
            12 => Some(Mode::Float16),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Mode::Int8 => 0,
            Mode::Int16 => 1,
            Mode::Float32 => 2,
            Mode::Uint16 => 6,
            Mode::Float16 => 12,
        }
    }

    pub fn element_size(self) -> usize {
        match self {
            Mode::Int8 => 1,
            Mode::Int16 | Mode::Uint16 | Mode::Float16 => 2,
            Mode::Float32 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

/// The parts of an MRC header needed to locate and shape the data block
#[derive(Debug, Clone, PartialEq)]
pub struct MrcHeader {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    pub mode: Mode,
    /// Extended header length in bytes
    pub nsymbt: usize,
    pub endian: Endian,
    pub dmin: f32,
    pub dmax: f32,
    pub dmean: f32,
    pub rms: f32,
}

impl MrcHeader {
    /// Row-major shape of the data block: `[ny, nx]` for a single section,
    /// `[nz, ny, nx]` otherwise
    pub fn shape(&self) -> Vec<usize> {
        if self.nz == 1 {
            vec![self.ny, self.nx]
        } else {
            vec![self.nz, self.ny, self.nx]
        }
    }

    /// Data block size in bytes; None when the dimensions overflow
    pub fn data_len(&self) -> Option<usize> {
        element_count(&[self.nx, self.ny, self.nz, self.mode.element_size()])
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    endian: Endian,
}

impl Reader<'_> {
    fn word(&self, offset: usize) -> [u8; 4] {
        let mut w = [0u8; 4];
        w.copy_from_slice(&self.bytes[offset..offset + 4]);
        w
    }

    fn i32(&self, offset: usize) -> i32 {
        match self.endian {
            Endian::Little => i32::from_le_bytes(self.word(offset)),
            Endian::Big => i32::from_be_bytes(self.word(offset)),
        }
    }

    fn f32(&self, offset: usize) -> f32 {
        match self.endian {
            Endian::Little => f32::from_le_bytes(self.word(offset)),
            Endian::Big => f32::from_be_bytes(self.word(offset)),
        }
    }
}

fn parse_header(bytes: &[u8], path: &Path) -> Result<MrcHeader, MrcError> {
    let header_err = |reason: String| MrcError::Header {
        path: path.to_path_buf(),
        reason,
    };

    if bytes.len() < HEADER_LEN {
        return Err(header_err(format!(
            "file is {} bytes, shorter than the {}-byte header",
            bytes.len(),
            HEADER_LEN
        )));
    }

    // Machine stamp: 0x11 marks big-endian; a zeroed stamp is read as little
    let endian = if bytes[212] == 0x11 { Endian::Big } else { Endian::Little };
    let r = Reader { bytes, endian };

    let dims = [r.i32(0), r.i32(4), r.i32(8)];
    if dims.iter().any(|&d| d <= 0) {
        return Err(header_err(format!(
            "non-positive dimensions {}x{}x{}",
            dims[0], dims[1], dims[2]
        )));
    }

    let mode_code = r.i32(12);
    let mode = Mode::from_code(mode_code).ok_or_else(|| MrcError::UnsupportedMode {
        path: path.to_path_buf(),
        mode: mode_code,
    })?;

    let nsymbt = r.i32(92);
    if nsymbt < 0 {
        return Err(header_err(format!("negative extended header length {}", nsymbt)));
    }

    Ok(MrcHeader {
        nx: dims[0] as usize,
        ny: dims[1] as usize,
        nz: dims[2] as usize,
        mode,
        nsymbt: nsymbt as usize,
        endian,
        dmin: r.f32(76),
        dmax: r.f32(80),
        dmean: r.f32(84),
        rms: r.f32(216),
    })
}

fn decode_data(block: &[u8], mode: Mode, endian: Endian) -> NumericData {
    macro_rules! decode {
        ($ty:ty, $n:expr) => {
            block
                .chunks_exact($n)
                .map(|c| {
                    let mut w = [0u8; $n];
                    w.copy_from_slice(c);
                    match endian {
                        Endian::Little => <$ty>::from_le_bytes(w),
                        Endian::Big => <$ty>::from_be_bytes(w),
                    }
                })
                .collect()
        };
    }

    match mode {
        Mode::Int8 => NumericData::Int8(block.iter().map(|&b| b as i8).collect()),
        Mode::Int16 => NumericData::Int16(decode!(i16, 2)),
        Mode::Uint16 => NumericData::Uint16(decode!(u16, 2)),
        Mode::Float32 => NumericData::Single(decode!(f32, 4)),
        // No half-precision storage type; widen on read
        Mode::Float16 => {
            let halves: Vec<f16> = decode!(f16, 2);
            NumericData::Single(halves.into_iter().map(f16::to_f32).collect())
        }
    }
}

/// Read only the header of an MRC file
pub fn read_header(path: &Path) -> Result<MrcHeader, MrcError> {
    let bytes = std::fs::read(path).map_err(|source| MrcError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_header(&bytes, path)
}

/// Read the data block of an MRC file in its stored element type (float16
/// data comes back as single precision)
pub fn read_mrc(path: &Path) -> Result<NumericArray, MrcError> {
    let bytes = std::fs::read(path).map_err(|source| MrcError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let header = parse_header(&bytes, path)?;

    let start = HEADER_LEN + header.nsymbt;
    let expected = header.data_len().ok_or_else(|| MrcError::Header {
        path: path.to_path_buf(),
        reason: format!(
            "dimensions {}x{}x{} are too large",
            header.nx, header.ny, header.nz
        ),
    })?;
    let found = bytes.len().saturating_sub(start);
    if found < expected {
        return Err(MrcError::Truncated {
            path: path.to_path_buf(),
            expected,
            found,
        });
    }

    let data = decode_data(&bytes[start..start + expected], header.mode, header.endian);
    NumericArray::new(header.shape(), data).ok_or_else(|| MrcError::Header {
        path: path.to_path_buf(),
        reason: "data length does not match header dimensions".to_string(),
    })
}

/// Write a 2-D or 3-D array as a little-endian mode 2 (float32) MRC file,
/// replacing any existing file.
pub fn write_mrc(path: &Path, array: &NumericArray) -> Result<(), MrcError> {
    let (nx, ny, nz) = match *array.shape() {
        [ny, nx] => (nx, ny, 1),
        [nz, ny, nx] => (nx, ny, nz),
        _ => {
            return Err(MrcError::Dimensions {
                path: path.to_path_buf(),
                ndim: array.shape().len(),
            });
        }
    };

    let values = array.data().to_f32_vec();
    let stats = Stats::of(&values);

    let mut header = vec![0u8; HEADER_LEN];
    let mut put_i32 = |offset: usize, v: i32| header[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
    put_i32(0, nx as i32);
    put_i32(4, ny as i32);
    put_i32(8, nz as i32);
    put_i32(12, Mode::Float32.code());
    // mx, my, mz: sampling equals dimensions
    put_i32(28, nx as i32);
    put_i32(32, ny as i32);
    put_i32(36, nz as i32);
    // mapc, mapr, maps
    put_i32(64, 1);
    put_i32(68, 2);
    put_i32(72, 3);
    put_i32(88, if nz == 1 { 0 } else { 1 });
    put_i32(108, NVERSION);

    let mut put_f32 = |offset: usize, v: f32| header[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
    // Cell angles
    put_f32(52, 90.0);
    put_f32(56, 90.0);
    put_f32(60, 90.0);
    put_f32(76, stats.min);
    put_f32(80, stats.max);
    put_f32(84, stats.mean);
    put_f32(216, stats.rms);

    header[208..212].copy_from_slice(MAP_TAG);
    header[212..216].copy_from_slice(&STAMP_LITTLE);

    let mut bytes = header;
    bytes.reserve(values.len() * 4);
    for v in &values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }

    std::fs::write(path, bytes).map_err(|source| MrcError::Write {
        path: path.to_path_buf(),
        source,
    })
}

struct Stats {
    min: f32,
    max: f32,
    mean: f32,
    rms: f32,
}

impl Stats {
    /// `rms` is the standard deviation from the mean
    fn of(values: &[f32]) -> Self {
        if values.is_empty() {
            return Self { min: 0.0, max: 0.0, mean: 0.0, rms: 0.0 };
        }
        let n = values.len() as f64;
        let (mut min, mut max, mut sum) = (f32::INFINITY, f32::NEG_INFINITY, 0.0f64);
        for &v in values {
            min = min.min(v);
            max = max.max(v);
            sum += v as f64;
        }
        let mean = sum / n;
        let var = values
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        Self {
            min,
            max,
            mean: mean as f32,
            rms: var.sqrt() as f32,
        }
    }
}
