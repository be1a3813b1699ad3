use std::path::PathBuf;

use ndarray::ShapeError;

use crate::array::H5DataType;

#[derive(Debug, thiserror::Error)]
pub enum H5ShardError {
    #[error("Key ({key}) not found in hdf5 file: {}", .path.display())]
    KeyNotFound { key: String, path: PathBuf },
    #[error("Index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Internal HDF5 error: {0}")]
    Storage(#[from] hdf5::Error),
    #[error("Filesystem error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),
    #[error("Expected an array of {expected}, found {found}")]
    DataTypeMismatch {
        expected: H5DataType,
        found: H5DataType,
    },
    #[error("Unable to convert sample to a typed array: {0}")]
    Conversion(#[from] ShapeError),
    #[error("No identifier for sample {index} ({provided} identifiers provided)")]
    MissingIdentifier { index: usize, provided: usize },
    #[error("Invalid key: {0:?}")]
    InvalidKey(String),
}

pub type H5Result<T> = Result<T, H5ShardError>;
