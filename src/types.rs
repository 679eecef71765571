//! Element types stored in bands

use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed-width numeric types a band can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DataType {
    /// Unsigned 8-bit integer
    U8 = 1,
    /// Unsigned 16-bit integer
    U16 = 2,
    /// Unsigned 32-bit integer
    U32 = 3,
    /// Unsigned 64-bit integer
    U64 = 4,
    /// Signed 8-bit integer
    I8 = 5,
    /// Signed 16-bit integer
    I16 = 6,
    /// Signed 32-bit integer
    I32 = 7,
    /// Signed 64-bit integer
    I64 = 8,
    /// 32-bit floating point
    F32 = 9,
    /// 64-bit floating point
    F64 = 10,
}

impl DataType {
    /// Size in bytes of this data type
    pub fn size_in_bytes(&self) -> usize {
        match self {
            DataType::U8 | DataType::I8 => 1,
            DataType::U16 | DataType::I16 => 2,
            DataType::U32 | DataType::I32 | DataType::F32 => 4,
            DataType::U64 | DataType::I64 | DataType::F64 => 8,
        }
    }

    /// Check if this is a floating point type
    pub fn is_float(&self) -> bool {
        matches!(self, DataType::F32 | DataType::F64)
    }

    /// Check if this is an integer type
    pub fn is_integer(&self) -> bool {
        !self.is_float()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A primitive value that can live in a band.
///
/// `Pod` gives the byte view handed to compressors and `Zero` supplies the
/// value that never-written cells read as.
pub trait Element:
    bytemuck::Pod + Zero + PartialEq + fmt::Debug + Send + Sync + 'static
{
    /// Tag describing this element type
    const DATA_TYPE: DataType;
}

macro_rules! impl_element {
    ($($ty:ty => $tag:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const DATA_TYPE: DataType = DataType::$tag;
            }
        )*
    };
}

impl_element! {
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_sizes() {
        assert_eq!(DataType::U8.size_in_bytes(), 1);
        assert_eq!(DataType::U16.size_in_bytes(), 2);
        assert_eq!(DataType::F32.size_in_bytes(), 4);
        assert_eq!(DataType::F64.size_in_bytes(), 8);
    }

    #[test]
    fn test_element_tags_match_width() {
        fn width<T: Element>() -> usize {
            std::mem::size_of::<T>()
        }

        assert_eq!(width::<i16>(), i16::DATA_TYPE.size_in_bytes());
        assert_eq!(width::<u64>(), u64::DATA_TYPE.size_in_bytes());
        assert_eq!(width::<f32>(), f32::DATA_TYPE.size_in_bytes());
        assert!(f64::DATA_TYPE.is_float());
        assert!(i8::DATA_TYPE.is_integer());
    }

    #[test]
    fn test_display() {
        assert_eq!(DataType::F64.to_string(), "F64");
    }
}
