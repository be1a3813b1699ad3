//! HDF5-backed sample storage for training loops.
//!
//! [`convert_arrays_to_sharded_h5`] writes one HDF5 file per sample and an
//! aggregate file holding external links to all of them. [`H5Dataset`] reads
//! such an aggregate file (or any HDF5 file) back as a randomly indexable
//! collection of arrays.

pub mod array;
pub mod dataset;
pub mod error;
pub mod keys;
pub mod protocol;
pub mod writer;

pub use array::{H5Array, H5DataType, IntoH5Array};
pub use dataset::{DatasetOptions, H5Dataset};
pub use error::{H5Result, H5ShardError};
pub use protocol::{DatasetIterator, IndexedDataset};
pub use writer::{convert_arrays_to_sharded_h5, WriteSummary, WriterOptions};
