pub mod array;
pub mod error;
pub mod matfile;
pub mod mrc;
pub mod record;

pub use array::{NumericArray, NumericData};
pub use error::{MatError, MrcError};
pub use matfile::{MatFile, MatVariable, read_mat, read_variable, write_mat};
pub use mrc::{read_mrc, write_mrc};
pub use record::{GeometryColumns, parse_record, parse_record_str};
