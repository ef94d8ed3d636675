use std::any::type_name;

use crate::codec::ValueCodec;
use crate::conversion::Direction;
use crate::error::MappingError;
use crate::schema::DataType;
use crate::value::{Scalar, TypedValue, UdtValue};

/// A value that can be stored in a column or in a user type field.
///
/// Implementations perform the structural part of the mapping. Callers go
/// through [`ValueCodec::write`] and [`ValueCodec::read`], which consult custom
/// conversions first, so `to_value`/`from_value` are only reached when no
/// converter is registered for the exact type.
///
/// Types that are only ever stored through custom conversions can implement
/// just `data_type()`; the defaults report the missing converter.
pub trait Persistable: Sized + 'static {
    /// Declared storage type.
    fn data_type() -> DataType;

    /// Converts this value into its storage representation.
    fn to_value(&self, _codec: &ValueCodec) -> Result<TypedValue, MappingError> {
        Err(MappingError::MissingConverter {
            type_name: type_name::<Self>(),
            direction: Direction::Writing,
        })
    }

    /// Rebuilds a value from its storage representation.
    fn from_value(_value: TypedValue, _codec: &ValueCodec) -> Result<Self, MappingError> {
        Err(MappingError::MissingConverter {
            type_name: type_name::<Self>(),
            direction: Direction::Reading,
        })
    }
}

impl Persistable for String {
    fn data_type() -> DataType {
        DataType::Text
    }

    fn to_value(&self, _codec: &ValueCodec) -> Result<TypedValue, MappingError> {
        Ok(TypedValue::Scalar(Scalar::Text(self.clone())))
    }

    fn from_value(value: TypedValue, _codec: &ValueCodec) -> Result<Self, MappingError> {
        match value {
            TypedValue::Scalar(Scalar::Text(s)) => Ok(s),
            other => Err(MappingError::mismatch(Self::data_type(), other.kind())),
        }
    }
}

// Each scalar writes as its own variant and reads from any variant that
// widens into it losslessly.
macro_rules! impl_persistable_scalar {
    ($t:ty, $variant:ident, [$($accepted:ident),+]) => {
        impl Persistable for $t {
            fn data_type() -> DataType {
                DataType::$variant
            }

            fn to_value(&self, _codec: &ValueCodec) -> Result<TypedValue, MappingError> {
                Ok(TypedValue::Scalar(Scalar::$variant(*self)))
            }

            fn from_value(value: TypedValue, _codec: &ValueCodec) -> Result<Self, MappingError> {
                match value {
                    $(TypedValue::Scalar(Scalar::$accepted(v)) => Ok(v.into()),)+
                    other => Err(MappingError::mismatch(Self::data_type(), other.kind())),
                }
            }
        }
    };
}

impl_persistable_scalar!(bool, Boolean, [Boolean]);
impl_persistable_scalar!(i8, TinyInt, [TinyInt]);
impl_persistable_scalar!(i16, SmallInt, [TinyInt, SmallInt]);
impl_persistable_scalar!(i32, Int, [TinyInt, SmallInt, Int]);
impl_persistable_scalar!(i64, BigInt, [TinyInt, SmallInt, Int, BigInt]);
impl_persistable_scalar!(f32, Float, [Float]);
impl_persistable_scalar!(f64, Double, [Float, Double]);

/// A wrapper for byte sequences to distinguish from `Vec<T>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blob(pub Vec<u8>);

impl Blob {
    pub fn new(data: Vec<u8>) -> Self {
        Blob(data)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Blob {
    fn from(v: Vec<u8>) -> Self {
        Blob(v)
    }
}

impl From<&[u8]> for Blob {
    fn from(v: &[u8]) -> Self {
        Blob(v.to_vec())
    }
}

impl Persistable for Blob {
    fn data_type() -> DataType {
        DataType::Blob
    }

    fn to_value(&self, _codec: &ValueCodec) -> Result<TypedValue, MappingError> {
        Ok(TypedValue::Scalar(Scalar::Blob(self.0.clone())))
    }

    fn from_value(value: TypedValue, _codec: &ValueCodec) -> Result<Self, MappingError> {
        match value {
            TypedValue::Scalar(Scalar::Blob(bytes)) => Ok(Blob(bytes)),
            other => Err(MappingError::mismatch(Self::data_type(), other.kind())),
        }
    }
}

/// A raw user type value passes through untouched.
impl Persistable for UdtValue {
    fn data_type() -> DataType {
        DataType::AnyUserType
    }

    fn to_value(&self, _codec: &ValueCodec) -> Result<TypedValue, MappingError> {
        Ok(TypedValue::Udt(self.clone()))
    }

    fn from_value(value: TypedValue, _codec: &ValueCodec) -> Result<Self, MappingError> {
        value.into_udt()
    }
}

impl<T: Persistable> Persistable for Vec<T> {
    fn data_type() -> DataType {
        DataType::list(T::data_type())
    }

    fn to_value(&self, codec: &ValueCodec) -> Result<TypedValue, MappingError> {
        self.iter()
            .map(|element| codec.write(element))
            .collect::<Result<Vec<_>, _>>()
            .map(TypedValue::Sequence)
    }

    fn from_value(value: TypedValue, codec: &ValueCodec) -> Result<Self, MappingError> {
        match value {
            TypedValue::Sequence(elements) => elements
                .into_iter()
                .map(|element| codec.read(element))
                .collect(),
            other => Err(MappingError::mismatch(Self::data_type(), other.kind())),
        }
    }
}

/// `None` is the domain-side null.
impl<T: Persistable> Persistable for Option<T> {
    fn data_type() -> DataType {
        T::data_type()
    }

    fn to_value(&self, codec: &ValueCodec) -> Result<TypedValue, MappingError> {
        match self {
            Some(inner) => codec.write(inner),
            None => Ok(TypedValue::Null),
        }
    }

    fn from_value(value: TypedValue, codec: &ValueCodec) -> Result<Self, MappingError> {
        match value {
            TypedValue::Null => Ok(None),
            value => codec.read(value).map(Some),
        }
    }
}

impl<T: Persistable> Persistable for Box<T> {
    fn data_type() -> DataType {
        T::data_type()
    }

    fn to_value(&self, codec: &ValueCodec) -> Result<TypedValue, MappingError> {
        codec.write(self.as_ref())
    }

    fn from_value(value: TypedValue, codec: &ValueCodec) -> Result<Self, MappingError> {
        codec.read(value).map(Box::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ValueCodec;

    #[test]
    fn declared_types() {
        assert_eq!(String::data_type(), DataType::Text);
        assert_eq!(<Option<i64>>::data_type(), DataType::BigInt);
        assert_eq!(<Vec<String>>::data_type(), DataType::list(DataType::Text));
        assert_eq!(<Vec<Option<f64>>>::data_type(), DataType::list(DataType::Double));
        assert_eq!(UdtValue::data_type(), DataType::AnyUserType);
    }

    #[test]
    fn integers_widen_on_read() {
        let codec = ValueCodec::standalone();
        let read: i64 = codec.read(TypedValue::Scalar(Scalar::Int(7))).unwrap();
        assert_eq!(read, 7);

        let read: f64 = codec.read(TypedValue::Scalar(Scalar::Float(1.5))).unwrap();
        assert_eq!(read, 1.5);
    }

    #[test]
    fn integers_do_not_narrow() {
        let codec = ValueCodec::standalone();
        let err = codec
            .read::<i32>(TypedValue::Scalar(Scalar::BigInt(7)))
            .unwrap_err();
        assert_eq!(err, MappingError::mismatch("int", "bigint"));
    }

    #[test]
    fn option_maps_null() {
        let codec = ValueCodec::standalone();
        assert_eq!(codec.write(&None::<String>).unwrap(), TypedValue::Null);

        let read: Option<String> = codec.read(TypedValue::Null).unwrap();
        assert_eq!(read, None);
    }

    #[test]
    fn sequence_preserves_order() {
        let codec = ValueCodec::standalone();
        let lines = vec!["Heckenpfad".to_string(), "14".to_string()];

        let value = codec.write(&lines).unwrap();
        assert_eq!(value.to_string(), "['Heckenpfad','14']");

        let read: Vec<String> = codec.read(value).unwrap();
        assert_eq!(read, lines);
    }

    #[test]
    fn sequence_rejects_scalar() {
        let codec = ValueCodec::standalone();
        let err = codec.read::<Vec<String>>(TypedValue::text("14")).unwrap_err();
        assert_eq!(err, MappingError::mismatch("list<text>", "text"));
    }

    #[test]
    fn blob_roundtrip() {
        let codec = ValueCodec::standalone();
        let blob = Blob::new(vec![1, 2, 3]);
        let value = codec.write(&blob).unwrap();
        assert_eq!(value.to_string(), "0x010203");
        assert_eq!(codec.read::<Blob>(value).unwrap(), blob);
    }

    #[test]
    fn converter_only_type_without_converter() {
        #[derive(Debug)]
        struct Opaque;

        impl Persistable for Opaque {
            fn data_type() -> DataType {
                DataType::Text
            }
        }

        let codec = ValueCodec::standalone();
        assert!(matches!(
            codec.write(&Opaque),
            Err(MappingError::MissingConverter {
                direction: Direction::Writing,
                ..
            })
        ));
    }
}
