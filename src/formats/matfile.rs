//! MATLAB Level 5 MAT files, numeric variables only.
//!
//! The reader accepts both byte orders, zlib-compressed elements and the
//! packed "small data element" tags MATLAB emits. The writer produces
//! uncompressed little-endian files.

use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::array::{NumericArray, NumericData, element_count};
use super::error::MatError;

const HEADER_LEN: usize = 128;
const HEADER_TEXT_LEN: usize = 116;
const VERSION: u16 = 0x0100;

const MI_INT8: u32 = 1;
const MI_UINT8: u32 = 2;
const MI_INT16: u32 = 3;
const MI_UINT16: u32 = 4;
const MI_INT32: u32 = 5;
const MI_UINT32: u32 = 6;
const MI_SINGLE: u32 = 7;
const MI_DOUBLE: u32 = 9;
const MI_MATRIX: u32 = 14;
const MI_COMPRESSED: u32 = 15;

const FLAG_COMPLEX: u32 = 0x0800;

/// MATLAB array classes with a numeric, non-sparse payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatClass {
    Double,
    Single,
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
}

impl MatClass {
    fn from_code(code: u32) -> Option<Self> {
        match code {
            6 => Some(MatClass::Double),
            7 => Some(MatClass::Single),
            8 => Some(MatClass::Int8),
            9 => Some(MatClass::Uint8),
            10 => Some(MatClass::Int16),
            11 => Some(MatClass::Uint16),
            12 => Some(MatClass::Int32),
            13 => Some(MatClass::Uint32),
            _ => None,
        }
    }

    fn code(self) -> u32 {
        match self {
            MatClass::Double => 6,
            MatClass::Single => 7,
            MatClass::Int8 => 8,
            MatClass::Uint8 => 9,
            MatClass::Int16 => 10,
            MatClass::Uint16 => 11,
            MatClass::Int32 => 12,
            MatClass::Uint32 => 13,
        }
    }

    fn of(data: &NumericData) -> Self {
        match data {
            NumericData::Double(_) => MatClass::Double,
            NumericData::Single(_) => MatClass::Single,
            NumericData::Int8(_) => MatClass::Int8,
            NumericData::Uint8(_) => MatClass::Uint8,
            NumericData::Int16(_) => MatClass::Int16,
            NumericData::Uint16(_) => MatClass::Uint16,
            NumericData::Int32(_) => MatClass::Int32,
            NumericData::Uint32(_) => MatClass::Uint32,
        }
    }

    /// Convert stored elements to this class's element type
    fn coerce(self, data: NumericData) -> NumericData {
        if MatClass::of(&data) == self {
            return data;
        }
        let v = data.to_f64_vec();
        match self {
            MatClass::Double => NumericData::Double(v),
            MatClass::Single => NumericData::Single(v.iter().map(|&x| x as f32).collect()),
            MatClass::Int8 => NumericData::Int8(v.iter().map(|&x| x as i8).collect()),
            MatClass::Uint8 => NumericData::Uint8(v.iter().map(|&x| x as u8).collect()),
            MatClass::Int16 => NumericData::Int16(v.iter().map(|&x| x as i16).collect()),
            MatClass::Uint16 => NumericData::Uint16(v.iter().map(|&x| x as u16).collect()),
            MatClass::Int32 => NumericData::Int32(v.iter().map(|&x| x as i32).collect()),
            MatClass::Uint32 => NumericData::Uint32(v.iter().map(|&x| x as u32).collect()),
        }
    }
}

/// A named numeric variable
#[derive(Debug, Clone, PartialEq)]
pub struct MatVariable {
    pub name: String,
    pub array: NumericArray,
}

impl MatVariable {
    pub fn new(name: impl Into<String>, array: NumericArray) -> Self {
        Self {
            name: name.into(),
            array,
        }
    }
}

/// The numeric variables of a MAT file, in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatFile {
    pub variables: Vec<MatVariable>,
}

impl MatFile {
    pub fn get(&self, name: &str) -> Option<&NumericArray> {
        self.variables
            .iter()
            .find(|v| v.name == name)
            .map(|v| &v.array)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|v| v.name.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endian {
    Little,
    Big,
}

struct Cursor<'a> {
    buf: &'a [u8],
    endian: Endian,
    path: &'a Path,
}

/// One parsed data element tag
struct Tag {
    ty: u32,
    start: usize,
    len: usize,
    next: usize,
}

impl<'a> Cursor<'a> {
    fn malformed(&self, reason: impl Into<String>) -> MatError {
        MatError::Malformed {
            path: self.path.to_path_buf(),
            reason: reason.into(),
        }
    }

    fn u32_at(&self, buf: &[u8], offset: usize) -> Result<u32, MatError> {
        let bytes: [u8; 4] = buf
            .get(offset..offset + 4)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| self.malformed(format!("unexpected end of data at byte {}", offset)))?;
        Ok(match self.endian {
            Endian::Little => u32::from_le_bytes(bytes),
            Endian::Big => u32::from_be_bytes(bytes),
        })
    }

    fn tag(&self, buf: &[u8], offset: usize) -> Result<Tag, MatError> {
        let first = self.u32_at(buf, offset)?;
        let tag = if first >> 16 != 0 {
            // Small data element: size and type packed into one word
            Tag {
                ty: first & 0xFFFF,
                start: offset + 4,
                len: (first >> 16) as usize,
                next: offset + 8,
            }
        } else {
            let len = self.u32_at(buf, offset + 4)? as usize;
            Tag {
                ty: first,
                start: offset + 8,
                len,
                next: offset + 8 + align8(len),
            }
        };
        if tag.start + tag.len > buf.len() {
            return Err(self.malformed(format!(
                "element of {} bytes at byte {} runs past the end",
                tag.len, offset
            )));
        }
        Ok(tag)
    }

    fn decode(&self, ty: u32, bytes: &[u8]) -> Result<NumericData, MatError> {
        let endian = self.endian;
        macro_rules! decode {
            ($ty:ty, $n:expr) => {
                bytes
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

        Ok(match ty {
            MI_INT8 => NumericData::Int8(bytes.iter().map(|&b| b as i8).collect()),
            MI_UINT8 => NumericData::Uint8(bytes.to_vec()),
            MI_INT16 => NumericData::Int16(decode!(i16, 2)),
            MI_UINT16 => NumericData::Uint16(decode!(u16, 2)),
            MI_INT32 => NumericData::Int32(decode!(i32, 4)),
            MI_UINT32 => NumericData::Uint32(decode!(u32, 4)),
            MI_SINGLE => NumericData::Single(decode!(f32, 4)),
            MI_DOUBLE => NumericData::Double(decode!(f64, 8)),
            other => return Err(self.malformed(format!("unsupported numeric storage type {}", other))),
        })
    }

    /// Walk a sequence of top-level elements
    fn elements(&self, buf: &[u8], out: &mut Vec<MatVariable>) -> Result<(), MatError> {
        let mut offset = 0;
        while offset + 8 <= buf.len() {
            let tag = self.tag(buf, offset)?;
            let body = &buf[tag.start..tag.start + tag.len];
            match tag.ty {
                MI_MATRIX => {
                    if let Some(var) = self.matrix(body)? {
                        out.push(var);
                    }
                    offset = tag.next;
                }
                MI_COMPRESSED => {
                    let mut inflated = Vec::new();
                    ZlibDecoder::new(body)
                        .read_to_end(&mut inflated)
                        .map_err(|e| self.malformed(format!("bad compressed element: {}", e)))?;
                    self.elements(&inflated, out)?;
                    // Compressed elements are not padded
                    offset = tag.start + tag.len;
                }
                other => {
                    tracing::debug!(element_type = other, "skipping non-matrix element");
                    offset = tag.next;
                }
            }
        }
        Ok(())
    }

    /// Parse one miMATRIX body; None for classes this reader does not keep
    fn matrix(&self, body: &[u8]) -> Result<Option<MatVariable>, MatError> {
        if body.is_empty() {
            return Ok(None);
        }

        let flags_tag = self.tag(body, 0)?;
        let flags = self.u32_at(body, flags_tag.start)?;

        let dims_tag = self.tag(body, flags_tag.next)?;
        let dims = match self.decode(dims_tag.ty, &body[dims_tag.start..dims_tag.start + dims_tag.len])? {
            NumericData::Int32(d) => d,
            other => other.to_f64_vec().into_iter().map(|d| d as i32).collect(),
        };
        if dims.iter().any(|&d| d < 0) {
            return Err(self.malformed("negative array dimension"));
        }
        let dims: Vec<usize> = dims.into_iter().map(|d| d as usize).collect();
        if element_count(&dims).is_none() {
            return Err(self.malformed(format!("dimensions {:?} overflow the address space", dims)));
        }

        let name_tag = self.tag(body, dims_tag.next)?;
        let name = String::from_utf8_lossy(&body[name_tag.start..name_tag.start + name_tag.len])
            .trim_end_matches('\0')
            .to_string();

        let Some(class) = MatClass::from_code(flags & 0xFF) else {
            tracing::debug!(variable = %name, class = flags & 0xFF, "skipping non-numeric variable");
            return Ok(None);
        };
        if flags & FLAG_COMPLEX != 0 {
            tracing::debug!(variable = %name, "skipping complex variable");
            return Ok(None);
        }

        let data_tag = self.tag(body, name_tag.next)?;
        let stored = self.decode(data_tag.ty, &body[data_tag.start..data_tag.start + data_tag.len])?;
        let data = class.coerce(stored);

        let array = NumericArray::from_column_major(dims, data).ok_or_else(|| {
            self.malformed(format!("variable '{}' has data that does not fill its dimensions", name))
        })?;
        Ok(Some(MatVariable { name, array }))
    }
}

fn align8(n: usize) -> usize {
    n.div_ceil(8) * 8
}

/// Read every numeric variable from a MAT file
pub fn read_mat(path: &Path) -> Result<MatFile, MatError> {
    let bytes = std::fs::read(path).map_err(|source| MatError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let malformed = |reason: &str| MatError::Malformed {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };
    if bytes.len() < HEADER_LEN {
        return Err(malformed("file is shorter than the 128-byte header"));
    }
    let endian = match &bytes[126..128] {
        b"IM" => Endian::Little,
        b"MI" => Endian::Big,
        _ => return Err(malformed("missing endian indicator; not a Level 5 MAT file")),
    };

    let cursor = Cursor {
        buf: &bytes,
        endian,
        path,
    };
    let mut variables = Vec::new();
    cursor.elements(&cursor.buf[HEADER_LEN..], &mut variables)?;
    Ok(MatFile { variables })
}

/// Read a single named variable
pub fn read_variable(path: &Path, name: &str) -> Result<NumericArray, MatError> {
    let file = read_mat(path)?;
    file.variables
        .into_iter()
        .find(|v| v.name == name)
        .map(|v| v.array)
        .ok_or_else(|| MatError::MissingVariable {
            path: path.to_path_buf(),
            name: name.to_string(),
        })
}

fn valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && name.len() <= 63
}

fn header_bytes() -> Vec<u8> {
    let created = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    let text = format!(
        "MATLAB 5.0 MAT-file, Platform: {}, Created on: {}",
        std::env::consts::OS,
        created
    );
    let mut header = vec![b' '; HEADER_LEN];
    let n = text.len().min(HEADER_TEXT_LEN);
    header[..n].copy_from_slice(&text.as_bytes()[..n]);
    // Subsystem data offset: none
    header[116..124].fill(0);
    header[124..126].copy_from_slice(&VERSION.to_le_bytes());
    header[126..128].copy_from_slice(b"IM");
    header
}

fn push_element(out: &mut Vec<u8>, ty: u32, payload: &[u8]) {
    out.extend_from_slice(&ty.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out.resize(out.len() + align8(payload.len()) - payload.len(), 0);
}

fn data_payload(data: &NumericData) -> (u32, Vec<u8>) {
    fn bytes<T: Copy, const N: usize>(v: &[T], f: impl Fn(T) -> [u8; N]) -> Vec<u8> {
        v.iter().flat_map(|&x| f(x)).collect()
    }
    match data {
        NumericData::Int8(v) => (MI_INT8, v.iter().map(|&x| x as u8).collect()),
        NumericData::Uint8(v) => (MI_UINT8, v.clone()),
        NumericData::Int16(v) => (MI_INT16, bytes(v, i16::to_le_bytes)),
        NumericData::Uint16(v) => (MI_UINT16, bytes(v, u16::to_le_bytes)),
        NumericData::Int32(v) => (MI_INT32, bytes(v, i32::to_le_bytes)),
        NumericData::Uint32(v) => (MI_UINT32, bytes(v, u32::to_le_bytes)),
        NumericData::Single(v) => (MI_SINGLE, bytes(v, f32::to_le_bytes)),
        NumericData::Double(v) => (MI_DOUBLE, bytes(v, f64::to_le_bytes)),
    }
}

fn matrix_element(var: &MatVariable) -> Result<Vec<u8>, MatError> {
    if !valid_name(&var.name) {
        return Err(MatError::InvalidName {
            name: var.name.clone(),
        });
    }

    // MATLAB arrays always carry at least two dimensions
    let dims: Vec<usize> = match var.array.shape() {
        [] => vec![1, 1],
        [n] => vec![*n, 1],
        shape => shape.to_vec(),
    };
    let data = var.array.to_column_major();
    let class = MatClass::of(&data);

    let mut body = Vec::new();
    let mut flags = Vec::with_capacity(8);
    flags.extend_from_slice(&class.code().to_le_bytes());
    flags.extend_from_slice(&0u32.to_le_bytes());
    push_element(&mut body, MI_UINT32, &flags);

    let dims_bytes: Vec<u8> = dims.iter().flat_map(|&d| (d as i32).to_le_bytes()).collect();
    push_element(&mut body, MI_INT32, &dims_bytes);
    push_element(&mut body, MI_INT8, var.name.as_bytes());

    let (ty, payload) = data_payload(&data);
    push_element(&mut body, ty, &payload);

    let mut element = Vec::with_capacity(body.len() + 8);
    element.extend_from_slice(&MI_MATRIX.to_le_bytes());
    element.extend_from_slice(&(body.len() as u32).to_le_bytes());
    element.extend_from_slice(&body);
    Ok(element)
}

/// Write variables, in order, to a new MAT file (replacing any existing file)
pub fn write_mat(path: &Path, variables: &[MatVariable]) -> Result<(), MatError> {
    let mut bytes = header_bytes();
    for var in variables {
        bytes.extend_from_slice(&matrix_element(var)?);
    }
    std::fs::write(path, bytes).map_err(|source| MatError::Write {
        path: PathBuf::from(path),
        source,
    })
}
