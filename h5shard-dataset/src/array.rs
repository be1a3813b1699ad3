use std::fmt;

use hdf5::{
    types::{FloatSize, IntSize, TypeDescriptor},
    H5Type,
};
use ndarray::{Array, ArrayD, Dimension, IxDyn};

use crate::error::{H5Result, H5ShardError};

/// Element type of an [`H5Array`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum H5DataType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl fmt::Display for H5DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            H5DataType::Bool => "bool",
            H5DataType::I8 => "i8",
            H5DataType::I16 => "i16",
            H5DataType::I32 => "i32",
            H5DataType::I64 => "i64",
            H5DataType::U8 => "u8",
            H5DataType::U16 => "u16",
            H5DataType::U32 => "u32",
            H5DataType::U64 => "u64",
            H5DataType::F32 => "f32",
            H5DataType::F64 => "f64",
        };
        f.write_str(name)
    }
}

/// A dynamically shaped array of any element type that can be stored in a
/// shard and decoded back with the same shape, type and element order.
#[derive(Debug, Clone, PartialEq)]
pub enum H5Array {
    Bool(ArrayD<bool>),
    I8(ArrayD<i8>),
    I16(ArrayD<i16>),
    I32(ArrayD<i32>),
    I64(ArrayD<i64>),
    U8(ArrayD<u8>),
    U16(ArrayD<u16>),
    U32(ArrayD<u32>),
    U64(ArrayD<u64>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
}

macro_rules! with_array {
    ($value:expr, $array:ident => $body:expr) => {
        match $value {
            H5Array::Bool($array) => $body,
            H5Array::I8($array) => $body,
            H5Array::I16($array) => $body,
            H5Array::I32($array) => $body,
            H5Array::I64($array) => $body,
            H5Array::U8($array) => $body,
            H5Array::U16($array) => $body,
            H5Array::U32($array) => $body,
            H5Array::U64($array) => $body,
            H5Array::F32($array) => $body,
            H5Array::F64($array) => $body,
        }
    };
}

macro_rules! read_h5_array {
    ($dataset:ident, $t:ty, $variant:ident) => {{
        let array = if $dataset.size() == 0 {
            ArrayD::<$t>::from_shape_vec(IxDyn(&$dataset.shape()), Vec::new())?
        } else {
            $dataset.read_dyn::<$t>()?
        };
        Ok(H5Array::$variant(array))
    }};
}

impl H5Array {
    /// Read the whole of `dataset` into memory.
    ///
    /// External links are followed by HDF5 itself when the dataset is opened,
    /// so this works the same for embedded and linked entries.
    pub fn read(dataset: &hdf5::Dataset) -> H5Result<Self> {
        match dataset.dtype()?.to_descriptor()? {
            TypeDescriptor::Boolean => read_h5_array!(dataset, bool, Bool),
            TypeDescriptor::Integer(IntSize::U1) => read_h5_array!(dataset, i8, I8),
            TypeDescriptor::Integer(IntSize::U2) => read_h5_array!(dataset, i16, I16),
            TypeDescriptor::Integer(IntSize::U4) => read_h5_array!(dataset, i32, I32),
            TypeDescriptor::Integer(IntSize::U8) => read_h5_array!(dataset, i64, I64),
            TypeDescriptor::Unsigned(IntSize::U1) => read_h5_array!(dataset, u8, U8),
            TypeDescriptor::Unsigned(IntSize::U2) => read_h5_array!(dataset, u16, U16),
            TypeDescriptor::Unsigned(IntSize::U4) => read_h5_array!(dataset, u32, U32),
            TypeDescriptor::Unsigned(IntSize::U8) => read_h5_array!(dataset, u64, U64),
            TypeDescriptor::Float(FloatSize::U4) => read_h5_array!(dataset, f32, F32),
            TypeDescriptor::Float(FloatSize::U8) => read_h5_array!(dataset, f64, F64),
            descriptor => Err(H5ShardError::UnsupportedDataType(format!(
                "{:?}",
                descriptor
            ))),
        }
    }

    /// Create a dataset called `name` in `group` holding this array.
    pub fn write(&self, group: &hdf5::Group, name: &str) -> H5Result<hdf5::Dataset> {
        with_array!(self, array => write_array(group, name, array))
    }

    pub fn dtype(&self) -> H5DataType {
        match self {
            H5Array::Bool(_) => H5DataType::Bool,
            H5Array::I8(_) => H5DataType::I8,
            H5Array::I16(_) => H5DataType::I16,
            H5Array::I32(_) => H5DataType::I32,
            H5Array::I64(_) => H5DataType::I64,
            H5Array::U8(_) => H5DataType::U8,
            H5Array::U16(_) => H5DataType::U16,
            H5Array::U32(_) => H5DataType::U32,
            H5Array::U64(_) => H5DataType::U64,
            H5Array::F32(_) => H5DataType::F32,
            H5Array::F64(_) => H5DataType::F64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        with_array!(self, array => array.shape())
    }

    pub fn len(&self) -> usize {
        with_array!(self, array => array.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn write_array<T: H5Type>(
    group: &hdf5::Group,
    name: &str,
    array: &ArrayD<T>,
) -> H5Result<hdf5::Dataset> {
    // Zero-size arrays only need the dataspace, there is nothing to write.
    if array.is_empty() {
        return Ok(group
            .new_dataset::<T>()
            .shape(array.shape().to_vec())
            .create(name)?);
    }

    let array = array.as_standard_layout();
    Ok(group
        .new_dataset_builder()
        .with_data(array.view())
        .create(name)?)
}

/// Conversion of a sample into an [`H5Array`] before it is written to a shard.
pub trait IntoH5Array {
    fn into_h5_array(self) -> H5Result<H5Array>;
}

impl IntoH5Array for H5Array {
    fn into_h5_array(self) -> H5Result<H5Array> {
        Ok(self)
    }
}

macro_rules! impl_h5_element {
    ($t:ty, $variant:ident) => {
        impl From<ArrayD<$t>> for H5Array {
            fn from(array: ArrayD<$t>) -> Self {
                H5Array::$variant(array)
            }
        }

        impl TryFrom<H5Array> for ArrayD<$t> {
            type Error = H5ShardError;

            fn try_from(value: H5Array) -> Result<Self, Self::Error> {
                match value {
                    H5Array::$variant(array) => Ok(array),
                    other => Err(H5ShardError::DataTypeMismatch {
                        expected: H5DataType::$variant,
                        found: other.dtype(),
                    }),
                }
            }
        }

        impl<D: Dimension> IntoH5Array for Array<$t, D> {
            fn into_h5_array(self) -> H5Result<H5Array> {
                Ok(H5Array::$variant(self.into_dyn()))
            }
        }

        /// A flat buffer in row-major order together with its shape.
        impl IntoH5Array for (Vec<usize>, Vec<$t>) {
            fn into_h5_array(self) -> H5Result<H5Array> {
                let (shape, values) = self;
                let array = ArrayD::from_shape_vec(IxDyn(&shape), values)?;
                Ok(H5Array::$variant(array))
            }
        }
    };
}

impl_h5_element!(bool, Bool);
impl_h5_element!(i8, I8);
impl_h5_element!(i16, I16);
impl_h5_element!(i32, I32);
impl_h5_element!(i64, I64);
impl_h5_element!(u8, U8);
impl_h5_element!(u16, U16);
impl_h5_element!(u32, U32);
impl_h5_element!(u64, U64);
impl_h5_element!(f32, F32);
impl_h5_element!(f64, F64);
