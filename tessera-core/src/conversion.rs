use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;

use tracing::warn;

use crate::error::MappingError;
use crate::value::TypedValue;

/// Direction of a custom conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Domain value to storage value.
    Writing,
    /// Storage value to domain value.
    Reading,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Writing => f.write_str("writing"),
            Direction::Reading => f.write_str("reading"),
        }
    }
}

type WriteFn = Box<dyn Fn(&dyn Any) -> Result<TypedValue, MappingError> + Send + Sync>;
type ReadFn = Box<dyn Fn(TypedValue) -> Result<Box<dyn Any>, MappingError> + Send + Sync>;

enum ConvertFn {
    Writing(WriteFn),
    Reading(ReadFn),
}

/// A single user supplied, one-directional converter.
pub struct ConversionEntry {
    domain: TypeId,
    domain_name: &'static str,
    direction: Direction,
    convert: ConvertFn,
}

impl ConversionEntry {
    pub fn domain_type(&self) -> TypeId {
        self.domain
    }

    pub fn domain_name(&self) -> &'static str {
        self.domain_name
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl fmt::Debug for ConversionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionEntry")
            .field("domain", &self.domain_name)
            .field("direction", &self.direction)
            .finish()
    }
}

/// Registry of custom conversions keyed by (domain type, direction).
///
/// Built once through [`CustomConversions::builder`] and read-only afterwards,
/// so lookups need no locking. Matching is by exact type: a converter for `T`
/// is never applied to `Option<T>`, `Vec<T>` or any other type. The codec
/// consults this registry before any structural mapping.
#[derive(Debug, Default)]
pub struct CustomConversions {
    entries: HashMap<(TypeId, Direction), ConversionEntry>,
}

impl CustomConversions {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> CustomConversionsBuilder {
        CustomConversionsBuilder::default()
    }

    /// Checks for a converter registered for exactly `domain`.
    pub fn has_converter_for_type(&self, domain: TypeId, direction: Direction) -> bool {
        self.entries.contains_key(&(domain, direction))
    }

    /// Typed variant of [`CustomConversions::has_converter_for_type`].
    pub fn has_converter_for<D: 'static>(&self, direction: Direction) -> bool {
        self.has_converter_for_type(TypeId::of::<D>(), direction)
    }

    /// Converts a domain value with its registered writing converter.
    pub fn convert_to_storage<D: 'static>(&self, value: &D) -> Result<TypedValue, MappingError> {
        match self.entry::<D>(Direction::Writing)? {
            ConversionEntry {
                convert: ConvertFn::Writing(convert),
                ..
            } => convert(value),
            entry => Err(Self::missing(entry.domain_name, Direction::Writing)),
        }
    }

    /// Converts a stored value with the registered reading converter for `D`.
    pub fn convert_from_storage<D: 'static>(&self, value: TypedValue) -> Result<D, MappingError> {
        match self.entry::<D>(Direction::Reading)? {
            ConversionEntry {
                convert: ConvertFn::Reading(convert),
                domain_name,
                ..
            } => convert(value)?
                .downcast::<D>()
                .map(|boxed| *boxed)
                .map_err(|_| MappingError::mismatch(type_name::<D>(), domain_name)),
            entry => Err(Self::missing(entry.domain_name, Direction::Reading)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry<D: 'static>(&self, direction: Direction) -> Result<&ConversionEntry, MappingError> {
        self.entries
            .get(&(TypeId::of::<D>(), direction))
            .ok_or_else(|| Self::missing(type_name::<D>(), direction))
    }

    fn missing(type_name: &'static str, direction: Direction) -> MappingError {
        MappingError::MissingConverter {
            type_name,
            direction,
        }
    }
}

/// Collects converters at configuration time.
#[derive(Default)]
pub struct CustomConversionsBuilder {
    entries: HashMap<(TypeId, Direction), ConversionEntry>,
}

impl CustomConversionsBuilder {
    /// Registers a converter from domain type `D` to a storage value.
    pub fn writing<D, S, F>(mut self, convert: F) -> Self
    where
        D: 'static,
        S: Into<TypedValue>,
        F: Fn(&D) -> Result<S, MappingError> + Send + Sync + 'static,
    {
        let erased: WriteFn = Box::new(move |value: &dyn Any| match value.downcast_ref::<D>() {
            Some(value) => convert(value).map(Into::into),
            None => Err(MappingError::mismatch(type_name::<D>(), "foreign value")),
        });
        self.insert::<D>(Direction::Writing, ConvertFn::Writing(erased));
        self
    }

    /// Registers a converter from a storage value to domain type `D`.
    pub fn reading<D, F>(mut self, convert: F) -> Self
    where
        D: 'static,
        F: Fn(TypedValue) -> Result<D, MappingError> + Send + Sync + 'static,
    {
        let erased: ReadFn =
            Box::new(move |value| convert(value).map(|domain| Box::new(domain) as Box<dyn Any>));
        self.insert::<D>(Direction::Reading, ConvertFn::Reading(erased));
        self
    }

    pub fn build(self) -> CustomConversions {
        CustomConversions {
            entries: self.entries,
        }
    }

    fn insert<D: 'static>(&mut self, direction: Direction, convert: ConvertFn) {
        let entry = ConversionEntry {
            domain: TypeId::of::<D>(),
            domain_name: type_name::<D>(),
            direction,
            convert,
        };
        if self
            .entries
            .insert((entry.domain, direction), entry)
            .is_some()
        {
            warn!(
                domain = type_name::<D>(),
                %direction,
                "replacing previously registered converter"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Scalar;

    #[derive(Debug, PartialEq)]
    struct Celsius(f64);

    fn conversions() -> CustomConversions {
        CustomConversions::builder()
            .writing(|c: &Celsius| Ok(Scalar::Double(c.0)))
            .reading(|value: TypedValue| match value {
                TypedValue::Scalar(Scalar::Double(d)) => Ok(Celsius(d)),
                other => Err(MappingError::mismatch("double", other.kind())),
            })
            .build()
    }

    #[test]
    fn lookup_is_per_direction() {
        let only_writing = CustomConversions::builder()
            .writing(|c: &Celsius| Ok(Scalar::Double(c.0)))
            .build();

        assert!(only_writing.has_converter_for::<Celsius>(Direction::Writing));
        assert!(!only_writing.has_converter_for::<Celsius>(Direction::Reading));
    }

    #[test]
    fn lookup_is_exact() {
        let conversions = conversions();
        assert!(conversions.has_converter_for::<Celsius>(Direction::Writing));
        assert!(!conversions.has_converter_for::<Option<Celsius>>(Direction::Writing));
        assert!(!conversions.has_converter_for::<Vec<Celsius>>(Direction::Reading));
    }

    #[test]
    fn convert_both_ways() {
        let conversions = conversions();

        let stored = conversions.convert_to_storage(&Celsius(21.5)).unwrap();
        assert_eq!(stored, TypedValue::Scalar(Scalar::Double(21.5)));

        let read: Celsius = conversions.convert_from_storage(stored).unwrap();
        assert_eq!(read, Celsius(21.5));
    }

    #[test]
    fn missing_converter_is_reported() {
        let conversions = CustomConversions::new();
        let err = conversions.convert_to_storage(&Celsius(0.0)).unwrap_err();
        assert!(matches!(
            err,
            MappingError::MissingConverter {
                direction: Direction::Writing,
                ..
            }
        ));
    }

    #[test]
    fn converter_errors_propagate() {
        let err = conversions()
            .convert_from_storage::<Celsius>(TypedValue::text("warm"))
            .unwrap_err();
        assert_eq!(err, MappingError::mismatch("double", "text"));
    }

    #[test]
    fn later_registration_wins() {
        let conversions = CustomConversions::builder()
            .writing(|_: &Celsius| Ok(Scalar::Int(1)))
            .writing(|_: &Celsius| Ok(Scalar::Int(2)))
            .build();

        assert_eq!(conversions.len(), 1);
        assert_eq!(
            conversions.convert_to_storage(&Celsius(0.0)).unwrap(),
            TypedValue::Scalar(Scalar::Int(2))
        );
    }
}
