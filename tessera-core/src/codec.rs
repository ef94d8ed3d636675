use std::any::type_name;
use std::sync::Arc;

use tracing::trace;

use crate::config::{EmptyUserType, MappingConfig};
use crate::conversion::{CustomConversions, Direction};
use crate::error::MappingError;
use crate::metadata::{EntityMetadataRegistry, Mapped};
use crate::persistable::Persistable;
use crate::resolver::SimpleUserTypeResolver;
use crate::schema::DataType;
use crate::value::TypedValue;

/// The recursive value codec.
///
/// Dispatch order for every value, on both paths:
/// 1. a custom converter registered for the exact declared type,
/// 2. the type's structural mapping ([`Persistable`]), which recurses into
///    user types through [`ValueCodec::write_structure`] /
///    [`ValueCodec::read_structure`] and into sequences element by element.
///
/// Recursion depth follows the object graph; cyclic graphs are not detected.
/// Cheap to clone: all shared state sits behind `Arc`s.
#[derive(Debug, Clone)]
pub struct ValueCodec {
    metadata: Arc<EntityMetadataRegistry>,
    conversions: Arc<CustomConversions>,
    config: MappingConfig,
}

impl ValueCodec {
    pub fn new(metadata: Arc<EntityMetadataRegistry>, conversions: Arc<CustomConversions>) -> Self {
        ValueCodec {
            metadata,
            conversions,
            config: MappingConfig::default(),
        }
    }

    /// A codec with no user types and no custom conversions.
    pub fn standalone() -> Self {
        let resolver = Arc::new(SimpleUserTypeResolver::new());
        Self::new(
            Arc::new(EntityMetadataRegistry::new(resolver)),
            Arc::new(CustomConversions::new()),
        )
    }

    pub fn with_config(mut self, config: MappingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn metadata(&self) -> &EntityMetadataRegistry {
        &self.metadata
    }

    pub fn conversions(&self) -> &CustomConversions {
        &self.conversions
    }

    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    /// Converts a domain value declared as `T` into a storage value.
    pub fn write<T: Persistable>(&self, value: &T) -> Result<TypedValue, MappingError> {
        if self.conversions.has_converter_for::<T>(Direction::Writing) {
            trace!(domain = type_name::<T>(), "applying writing converter");
            return self.conversions.convert_to_storage(value);
        }
        value.to_value(self)
    }

    /// Converts a storage value into a domain value declared as `T`.
    pub fn read<T: Persistable>(&self, value: TypedValue) -> Result<T, MappingError> {
        if self.conversions.has_converter_for::<T>(Direction::Reading) {
            trace!(domain = type_name::<T>(), "applying reading converter");
            return self.conversions.convert_from_storage(value);
        }
        T::from_value(value, self)
    }

    /// Writes a user type field by field.
    ///
    /// Properties are visited in lexicographic order. Null results and empty
    /// sequences are left out of the value, since the store does not tell an
    /// empty collection from a missing one. A value with no field set at all
    /// follows [`MappingConfig::empty_user_type`].
    pub fn write_structure<E: Mapped>(&self, entity: &E) -> Result<TypedValue, MappingError> {
        let descriptor = self.metadata.describe::<E>()?;
        let schema = descriptor.user_type_schema().ok_or_else(|| {
            MappingError::mismatch(DataType::AnyUserType, format!("table {}", descriptor.name()))
        })?;

        let mut udt = schema.new_value();
        for property in descriptor.properties() {
            if schema.field_type(property.name()).is_none() {
                if self.config.strict {
                    return Err(MappingError::UnknownField {
                        user_type: schema.name().to_string(),
                        field: property.name().to_string(),
                    });
                }
                trace!(
                    user_type = schema.name(),
                    property = property.name(),
                    "skipping property without schema field"
                );
                continue;
            }
            let value = property.get(entity, self)?;
            if is_absent(&value) {
                continue;
            }
            udt.set(property.name(), value)?;
        }

        if udt.is_empty() && self.config.empty_user_type == EmptyUserType::Null {
            return Ok(TypedValue::Null);
        }
        Ok(TypedValue::Udt(udt))
    }

    /// Reads a user type value into a fresh `E`.
    ///
    /// Only fields present in the value are assigned; everything else keeps
    /// its `Default` state.
    pub fn read_structure<E: Mapped>(&self, value: TypedValue) -> Result<E, MappingError> {
        let descriptor = self.metadata.describe::<E>()?;
        let udt = match value {
            TypedValue::Udt(udt) => udt,
            other => {
                return Err(MappingError::mismatch(
                    DataType::user_type(descriptor.name()),
                    other.kind(),
                ));
            }
        };

        let mut entity = E::default();
        for (field, value) in udt.into_fields() {
            match descriptor.property(&field) {
                Some(_) if value.is_null() => {}
                Some(property) => property.set(&mut entity, value, self)?,
                None if self.config.strict => {
                    return Err(MappingError::UnknownField {
                        user_type: descriptor.name().to_string(),
                        field,
                    });
                }
                None => trace!(
                    user_type = descriptor.name(),
                    field = field.as_str(),
                    "ignoring field without property"
                ),
            }
        }
        Ok(entity)
    }
}

fn is_absent(value: &TypedValue) -> bool {
    match value {
        TypedValue::Null => true,
        TypedValue::Sequence(elements) => elements.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{EntityDescriptor, PropertyDescriptor};
    use crate::resolver::SimpleUserTypeResolver;
    use crate::schema::UserTypeSchema;
    use crate::value::Scalar;

    #[derive(Debug, Default, PartialEq)]
    struct Manufacturer {
        name: Option<String>,
        founded: Option<i32>,
    }

    impl Mapped for Manufacturer {
        fn introspect() -> Result<EntityDescriptor<Self>, MappingError> {
            EntityDescriptor::user_type("manufacturer")
                .property(PropertyDescriptor::new(
                    "name",
                    DataType::Text,
                    |m: &Self, codec| codec.write(&m.name),
                    |m: &mut Self, value, codec| {
                        m.name = codec.read(value)?;
                        Ok(())
                    },
                ))
                .property(PropertyDescriptor::new(
                    "founded",
                    DataType::Int,
                    |m: &Self, codec| codec.write(&m.founded),
                    |m: &mut Self, value, codec| {
                        m.founded = codec.read(value)?;
                        Ok(())
                    },
                ))
                .build()
        }
    }

    impl Persistable for Manufacturer {
        fn data_type() -> DataType {
            DataType::user_type("manufacturer")
        }

        fn to_value(&self, codec: &ValueCodec) -> Result<TypedValue, MappingError> {
            codec.write_structure(self)
        }

        fn from_value(value: TypedValue, codec: &ValueCodec) -> Result<Self, MappingError> {
            codec.read_structure(value)
        }
    }

    fn codec(config: MappingConfig) -> ValueCodec {
        let resolver = SimpleUserTypeResolver::new()
            .with(UserTypeSchema::new("manufacturer", [("name", DataType::Text)]));
        ValueCodec::new(
            Arc::new(EntityMetadataRegistry::new(Arc::new(resolver))),
            Arc::new(CustomConversions::new()),
        )
        .with_config(config)
    }

    fn good_one() -> Manufacturer {
        Manufacturer {
            name: Some("a good one".to_string()),
            founded: None,
        }
    }

    #[test]
    fn write_omits_null_fields() {
        let value = codec(MappingConfig::default()).write(&good_one()).unwrap();
        assert_eq!(value.to_string(), "{name:'a good one'}");
    }

    #[test]
    fn write_ignores_property_missing_from_schema() {
        let manufacturer = Manufacturer {
            name: Some("a good one".to_string()),
            founded: Some(1886),
        };
        let value = codec(MappingConfig::default()).write(&manufacturer).unwrap();
        assert_eq!(value.to_string(), "{name:'a good one'}");
    }

    #[test]
    fn strict_write_rejects_property_missing_from_schema() {
        let manufacturer = Manufacturer {
            name: None,
            founded: Some(1886),
        };
        let err = codec(MappingConfig::new().strict(true))
            .write(&manufacturer)
            .unwrap_err();
        assert_eq!(
            err,
            MappingError::UnknownField {
                user_type: "manufacturer".to_string(),
                field: "founded".to_string(),
            }
        );
    }

    #[test]
    fn strict_write_rejects_unset_property_missing_from_schema() {
        let err = codec(MappingConfig::new().strict(true))
            .write(&good_one())
            .unwrap_err();
        assert_eq!(
            err,
            MappingError::UnknownField {
                user_type: "manufacturer".to_string(),
                field: "founded".to_string(),
            }
        );
    }

    #[test]
    fn empty_user_type_policy() {
        let empty = Manufacturer::default();

        let present = codec(MappingConfig::default()).write(&empty).unwrap();
        assert_eq!(present.to_string(), "{}");

        let null = codec(MappingConfig::new().empty_user_type(EmptyUserType::Null))
            .write(&empty)
            .unwrap();
        assert_eq!(null, TypedValue::Null);
    }

    #[test]
    fn read_structure_roundtrip() {
        let codec = codec(MappingConfig::default());
        let value = codec.write(&good_one()).unwrap();
        let read: Manufacturer = codec.read(value).unwrap();
        assert_eq!(read, good_one());
    }

    #[test]
    fn read_leaves_absent_fields_unset() {
        let codec = codec(MappingConfig::default());
        let schema = codec.metadata().user_type("manufacturer").unwrap();
        let read: Manufacturer = codec.read(TypedValue::Udt(schema.new_value())).unwrap();
        assert_eq!(read, Manufacturer::default());
    }

    #[test]
    fn read_rejects_wrong_kind() {
        let err = codec(MappingConfig::default())
            .read::<Manufacturer>(TypedValue::Scalar(Scalar::Int(1)))
            .unwrap_err();
        assert_eq!(err, MappingError::mismatch("frozen<manufacturer>", "int"));
    }

    #[test]
    fn strict_read_rejects_unmapped_field() {
        let resolver = SimpleUserTypeResolver::new().with(UserTypeSchema::new(
            "manufacturer",
            [("name", DataType::Text), ("country", DataType::Text)],
        ));
        let registry = Arc::new(EntityMetadataRegistry::new(Arc::new(resolver)));
        let schema = registry.user_type("manufacturer").unwrap();
        let value = schema
            .new_value()
            .with("country", TypedValue::text("DE"))
            .unwrap();

        let lenient = ValueCodec::new(Arc::clone(&registry), Arc::new(CustomConversions::new()));
        let read: Manufacturer = lenient.read(TypedValue::Udt(value.clone())).unwrap();
        assert_eq!(read, Manufacturer::default());

        let strict = lenient.with_config(MappingConfig::new().strict(true));
        let err = strict.read::<Manufacturer>(TypedValue::Udt(value)).unwrap_err();
        assert_eq!(
            err,
            MappingError::UnknownField {
                user_type: "manufacturer".to_string(),
                field: "country".to_string(),
            }
        );
    }

    #[test]
    fn converter_takes_priority_over_structure() {
        let resolver = SimpleUserTypeResolver::new()
            .with(UserTypeSchema::new("manufacturer", [("name", DataType::Text)]));
        let conversions = CustomConversions::builder()
            .writing(|m: &Manufacturer| Ok(TypedValue::text(m.name.clone().unwrap_or_default())))
            .reading(|value: TypedValue| {
                Ok(Manufacturer {
                    name: value.as_text().map(str::to_string),
                    founded: None,
                })
            })
            .build();
        let codec = ValueCodec::new(
            Arc::new(EntityMetadataRegistry::new(Arc::new(resolver))),
            Arc::new(conversions),
        );

        let value = codec.write(&good_one()).unwrap();
        assert_eq!(value, TypedValue::text("a good one"));
        assert_eq!(codec.read::<Manufacturer>(value).unwrap(), good_one());
        // Structural mapping was never consulted
        assert!(codec.metadata().is_empty());
    }
}
