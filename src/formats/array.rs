/// Typed element storage shared by the MRC and MAT codecs
#[derive(Debug, Clone, PartialEq)]
pub enum NumericData {
    Int8(Vec<i8>),
    Uint8(Vec<u8>),
    Int16(Vec<i16>),
    Uint16(Vec<u16>),
    Int32(Vec<i32>),
    Uint32(Vec<u32>),
    Single(Vec<f32>),
    Double(Vec<f64>),
}

macro_rules! each_variant {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            NumericData::Int8($v) => $body,
            NumericData::Uint8($v) => $body,
            NumericData::Int16($v) => $body,
            NumericData::Uint16($v) => $body,
            NumericData::Int32($v) => $body,
            NumericData::Uint32($v) => $body,
            NumericData::Single($v) => $body,
            NumericData::Double($v) => $body,
        }
    };
}

macro_rules! map_variant {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            NumericData::Int8($v) => NumericData::Int8($body),
            NumericData::Uint8($v) => NumericData::Uint8($body),
            NumericData::Int16($v) => NumericData::Int16($body),
            NumericData::Uint16($v) => NumericData::Uint16($body),
            NumericData::Int32($v) => NumericData::Int32($body),
            NumericData::Uint32($v) => NumericData::Uint32($body),
            NumericData::Single($v) => NumericData::Single($body),
            NumericData::Double($v) => NumericData::Double($body),
        }
    };
}

impl NumericData {
    pub fn len(&self) -> usize {
        each_variant!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every element widened to f64 (lossless for all variants)
    pub fn to_f64_vec(&self) -> Vec<f64> {
        each_variant!(self, v => v.iter().map(|&x| x as f64).collect())
    }

    /// Every element as f32; doubles and 32-bit integers may round
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match self {
            NumericData::Single(v) => v.clone(),
            other => each_variant!(other, v => v.iter().map(|&x| x as f32).collect()),
        }
    }

    /// Pick elements by index, keeping the element type
    pub fn gather(&self, indices: &[usize]) -> NumericData {
        map_variant!(self, v => indices.iter().map(|&i| v[i]).collect())
    }
}

/// An N-d array in row-major (C) order: `shape[0]` is the slowest axis
#[derive(Debug, Clone, PartialEq)]
pub struct NumericArray {
    shape: Vec<usize>,
    data: NumericData,
}

impl NumericArray {
    /// Returns None when the shape does not match the element count
    pub fn new(shape: Vec<usize>, data: NumericData) -> Option<Self> {
        if element_count(&shape)? != data.len() {
            return None;
        }
        Some(Self { shape, data })
    }

    /// An `n x 1` double column vector
    pub fn column(values: Vec<f64>) -> Self {
        Self {
            shape: vec![values.len(), 1],
            data: NumericData::Double(values),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &NumericData {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Same shape, elements coerced to single precision
    pub fn to_single(&self) -> NumericArray {
        Self {
            shape: self.shape.clone(),
            data: NumericData::Single(self.data.to_f32_vec()),
        }
    }

    /// Elements reordered so the first axis varies fastest (MATLAB layout)
    pub fn to_column_major(&self) -> NumericData {
        self.data.gather(&column_major_order(&self.shape))
    }

    /// Build a row-major array from column-major elements of the given dims
    pub fn from_column_major(shape: Vec<usize>, data: NumericData) -> Option<Self> {
        if element_count(&shape)? != data.len() {
            return None;
        }
        let order = row_major_order(&shape);
        let data = data.gather(&order);
        Some(Self { shape, data })
    }
}

/// Number of elements in `shape`, or None if it does not fit in a usize
pub fn element_count(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

/// For each column-major position, the row-major offset holding that element
fn column_major_order(shape: &[usize]) -> Vec<usize> {
    let total: usize = shape.iter().product();
    if total == 0 {
        return Vec::new();
    }
    let strides = row_major_strides(shape);
    let mut index = vec![0usize; shape.len()];
    let mut out = Vec::with_capacity(total);
    for _ in 0..total {
        out.push(index.iter().zip(&strides).map(|(i, s)| i * s).sum());
        // First axis fastest
        for (axis, i) in index.iter_mut().enumerate() {
            *i += 1;
            if *i < shape[axis] {
                break;
            }
            *i = 0;
        }
    }
    out
}

/// For each row-major position, the column-major offset holding that element
fn row_major_order(shape: &[usize]) -> Vec<usize> {
    let total: usize = shape.iter().product();
    if total == 0 {
        return Vec::new();
    }
    let mut strides = vec![1usize; shape.len()];
    for axis in 1..shape.len() {
        strides[axis] = strides[axis - 1] * shape[axis - 1];
    }
    let mut index = vec![0usize; shape.len()];
    let mut out = Vec::with_capacity(total);
    for _ in 0..total {
        out.push(index.iter().zip(&strides).map(|(i, s)| i * s).sum());
        // Last axis fastest
        for axis in (0..shape.len()).rev() {
            index[axis] += 1;
            if index[axis] < shape[axis] {
                break;
            }
            index[axis] = 0;
        }
    }
    out
}

fn row_major_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; shape.len()];
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }
    strides
}
