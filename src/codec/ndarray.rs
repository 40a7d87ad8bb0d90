//! Numeric arrays that travel through either backend.
//!
//! An [`NdArray`] is a dtype, a shape and the little-endian element bytes.
//! On the wire it is a four-field struct, which MsgPack writes as a map:
//!
//! | field   | value                                   |
//! |---------|-----------------------------------------|
//! | `nd`    | `true`                                  |
//! | `type`  | numpy-style descriptor, e.g. `<f4`      |
//! | `shape` | array of dimensions                     |
//! | `data`  | `bin` blob of `numel * itemsize` bytes  |
//!
//! # Example
//!
//! ```
//! use tensorpack_serialize::codec::{DType, NdArray};
//!
//! let image = NdArray::from_vec(vec![2, 3], &[0.0f32, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
//! assert_eq!(image.dtype(), DType::F32);
//! assert_eq!(image.shape(), &[2, 3]);
//! assert_eq!(image.to_vec::<f32>().unwrap()[4], 4.0);
//! ```

use std::fmt;
use std::sync::Once;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use super::Version;
use crate::error::{Result, SerializeError};

/// Element type of an [`NdArray`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
}

impl DType {
    /// Size of one element in bytes.
    pub fn itemsize(self) -> usize {
        match self {
            DType::Bool | DType::U8 | DType::I8 => 1,
            DType::U16 | DType::I16 => 2,
            DType::U32 | DType::I32 | DType::F32 => 4,
            DType::U64 | DType::I64 | DType::F64 => 8,
        }
    }

    /// Numpy-style type descriptor (`|u1`, `<f4`, ...).
    pub fn descr(self) -> &'static str {
        match self {
            DType::Bool => "|b1",
            DType::U8 => "|u1",
            DType::I8 => "|i1",
            DType::U16 => "<u2",
            DType::I16 => "<i2",
            DType::U32 => "<u4",
            DType::I32 => "<i4",
            DType::U64 => "<u8",
            DType::I64 => "<i8",
            DType::F32 => "<f4",
            DType::F64 => "<f8",
        }
    }

    /// Parse a descriptor produced by [`DType::descr`].
    pub fn from_descr(descr: &str) -> Option<Self> {
        let dtype = match descr {
            "|b1" => DType::Bool,
            "|u1" => DType::U8,
            "|i1" => DType::I8,
            "<u2" => DType::U16,
            "<i2" => DType::I16,
            "<u4" => DType::U32,
            "<i4" => DType::I32,
            "<u8" => DType::U64,
            "<i8" => DType::I64,
            "<f4" => DType::F32,
            "<f8" => DType::F64,
            _ => return None,
        };
        Some(dtype)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.descr())
    }
}

/// A Rust scalar that can be stored in an [`NdArray`].
pub trait Element: Copy {
    /// Matching array dtype.
    const DTYPE: DType;

    /// Append the little-endian bytes of `self`.
    fn write_le(self, out: &mut Vec<u8>);

    /// Read one element from exactly `DTYPE.itemsize()` bytes.
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_element {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const DTYPE: DType = DType::$dtype;

                #[inline]
                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_element! {
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    u64 => U64,
    i64 => I64,
    f32 => F32,
    f64 => F64,
}

impl Element for bool {
    const DTYPE: DType = DType::Bool;

    #[inline]
    fn write_le(self, out: &mut Vec<u8>) {
        out.push(self as u8);
    }

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}

/// Dense n-dimensional numeric array.
///
/// Equality compares dtype, shape and raw element bytes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "ArrayRepr")]
pub struct NdArray {
    dtype: DType,
    shape: Vec<usize>,
    data: Vec<u8>,
}

impl NdArray {
    /// Build an array from raw little-endian element bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError::InvalidArray`] if `data` does not hold
    /// exactly `product(shape)` elements of `dtype`.
    pub fn from_raw(dtype: DType, shape: Vec<usize>, data: Vec<u8>) -> Result<Self> {
        let expected = numel(&shape)
            .and_then(|n| n.checked_mul(dtype.itemsize()))
            .ok_or_else(|| SerializeError::InvalidArray(format!("shape {:?} overflows", shape)))?;
        if data.len() != expected {
            return Err(SerializeError::InvalidArray(format!(
                "shape {:?} of {} needs {} bytes, got {}",
                shape,
                dtype,
                expected,
                data.len()
            )));
        }
        Ok(Self { dtype, shape, data })
    }

    /// Build an array from typed values in row-major order.
    pub fn from_vec<T: Element>(shape: Vec<usize>, values: &[T]) -> Result<Self> {
        let mut data = Vec::with_capacity(values.len() * T::DTYPE.itemsize());
        for value in values {
            value.write_le(&mut data);
        }
        Self::from_raw(T::DTYPE, shape, data)
    }

    /// Zero-filled array.
    pub fn zeros(dtype: DType, shape: Vec<usize>) -> Result<Self> {
        let len = numel(&shape)
            .and_then(|n| n.checked_mul(dtype.itemsize()))
            .ok_or_else(|| SerializeError::InvalidArray(format!("shape {:?} overflows", shape)))?;
        Self::from_raw(dtype, shape, vec![0; len])
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len() / self.dtype.itemsize()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw little-endian element bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Copy the elements out as `T`; `None` if `T` does not match the dtype.
    pub fn to_vec<T: Element>(&self) -> Option<Vec<T>> {
        if T::DTYPE != self.dtype {
            return None;
        }
        Some(
            self.data
                .chunks_exact(self.dtype.itemsize())
                .map(T::read_le)
                .collect(),
        )
    }
}

fn numel(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, dim| acc.checked_mul(*dim))
}

impl Serialize for NdArray {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("NdArray", 4)?;
        s.serialize_field("nd", &true)?;
        s.serialize_field("type", self.dtype.descr())?;
        s.serialize_field("shape", &self.shape)?;
        s.serialize_field("data", serde_bytes::Bytes::new(&self.data))?;
        s.end()
    }
}

#[derive(Deserialize)]
struct ArrayRepr {
    nd: bool,
    #[serde(rename = "type")]
    dtype: String,
    shape: Vec<usize>,
    data: serde_bytes::ByteBuf,
}

impl TryFrom<ArrayRepr> for NdArray {
    type Error = SerializeError;

    fn try_from(repr: ArrayRepr) -> Result<Self> {
        if !repr.nd {
            return Err(SerializeError::InvalidArray("missing `nd` marker".to_string()));
        }
        let dtype = DType::from_descr(&repr.dtype).ok_or_else(|| {
            SerializeError::InvalidArray(format!("unknown dtype {:?}", repr.dtype))
        })?;
        NdArray::from_raw(dtype, repr.shape, repr.data.into_vec())
    }
}

/// Describes the numeric array extension of the MsgPack backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayExtension {
    pub name: &'static str,
    pub version: Version,
}

impl ArrayExtension {
    pub const CURRENT: ArrayExtension = ArrayExtension {
        name: "ndarray",
        version: Version::new(0, 1, 0),
    };

    /// Whether [`register_array_extension`] has run in this process.
    pub fn is_registered() -> bool {
        REGISTER.is_completed()
    }
}

static REGISTER: Once = Once::new();

/// Register the numeric array extension. Runs once per process; later
/// calls only return the extension descriptor.
pub fn register_array_extension() -> ArrayExtension {
    let ext = ArrayExtension::CURRENT;
    REGISTER.call_once(|| {
        tracing::debug!("Registered {} extension v{}", ext.name, ext.version);
    });
    ext
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descr_round_trip() {
        let all = [
            DType::Bool,
            DType::U8,
            DType::I8,
            DType::U16,
            DType::I16,
            DType::U32,
            DType::I32,
            DType::U64,
            DType::I64,
            DType::F32,
            DType::F64,
        ];
        for dtype in all {
            assert_eq!(DType::from_descr(dtype.descr()), Some(dtype));
        }
        assert_eq!(DType::from_descr(">f4"), None);
        assert_eq!(DType::from_descr("O"), None);
    }

    #[test]
    fn test_from_vec_and_back() {
        let values = [1.5f64, -2.0, 3.25, 0.0];
        let arr = NdArray::from_vec(vec![2, 2], &values).unwrap();
        assert_eq!(arr.dtype(), DType::F64);
        assert_eq!(arr.ndim(), 2);
        assert_eq!(arr.len(), 4);
        assert_eq!(arr.as_bytes().len(), 32);
        assert_eq!(arr.to_vec::<f64>().unwrap(), values);
        assert!(arr.to_vec::<f32>().is_none());
    }

    #[test]
    fn test_bool_elements() {
        let arr = NdArray::from_vec(vec![3], &[true, false, true]).unwrap();
        assert_eq!(arr.as_bytes(), &[1, 0, 1]);
        assert_eq!(arr.to_vec::<bool>().unwrap(), vec![true, false, true]);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let result = NdArray::from_vec(vec![2, 3], &[1i32, 2, 3]);
        assert!(matches!(result, Err(SerializeError::InvalidArray(_))));

        let result = NdArray::from_raw(DType::U16, vec![2], vec![0; 3]);
        assert!(matches!(result, Err(SerializeError::InvalidArray(_))));
    }

    #[test]
    fn test_scalar_and_empty_shapes() {
        let scalar = NdArray::from_vec(vec![], &[7u8]).unwrap();
        assert_eq!(scalar.ndim(), 0);
        assert_eq!(scalar.len(), 1);

        let empty = NdArray::zeros(DType::F32, vec![0, 5]).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.shape(), &[0, 5]);
    }

    #[test]
    fn test_overflowing_shape_rejected() {
        let result = NdArray::zeros(DType::F64, vec![usize::MAX, 2]);
        assert!(matches!(result, Err(SerializeError::InvalidArray(_))));
    }

    #[test]
    fn test_registration_is_idempotent() {
        let first = register_array_extension();
        let second = register_array_extension();
        assert_eq!(first, second);
        assert!(ArrayExtension::is_registered());
    }

    #[cfg(feature = "msgpack")]
    #[test]
    fn test_msgpack_wire_layout() {
        use crate::codec::MsgPackCodec;

        let arr = NdArray::from_vec(vec![2], &[1u8, 2]).unwrap();
        let encoded = MsgPackCodec::encode(&arr).unwrap();

        // fixmap with 4 entries, first key "nd" -> true
        assert_eq!(&encoded[..5], &[0x84, 0xa2, b'n', b'd', 0xc3]);

        #[derive(serde::Deserialize)]
        struct Plain {
            nd: bool,
            #[serde(rename = "type")]
            dtype: String,
            shape: Vec<u64>,
            #[serde(with = "serde_bytes")]
            data: Vec<u8>,
        }
        let plain: Plain = rmp_serde::from_slice(&encoded).unwrap();
        assert!(plain.nd);
        assert_eq!(plain.dtype, "|u1");
        assert_eq!(plain.shape, vec![2]);
        assert_eq!(plain.data, vec![1, 2]);

        let decoded: NdArray = MsgPackCodec::decode(&encoded).unwrap();
        assert_eq!(decoded, arr);
    }

    #[cfg(feature = "msgpack")]
    #[test]
    fn test_unknown_dtype_rejected_on_decode() {
        use crate::codec::MsgPackCodec;

        #[derive(serde::Serialize)]
        struct Fake<'a> {
            nd: bool,
            #[serde(rename = "type")]
            dtype: &'a str,
            shape: Vec<u64>,
            #[serde(with = "serde_bytes")]
            data: Vec<u8>,
        }
        let encoded = MsgPackCodec::encode(&Fake {
            nd: true,
            dtype: "O",
            shape: vec![1],
            data: vec![0],
        })
        .unwrap();
        let result: Result<NdArray> = MsgPackCodec::decode(&encoded);
        assert!(result.is_err());
    }
}
