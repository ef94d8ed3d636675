use std::fmt;
use std::sync::Arc;

use crate::error::MappingError;
use crate::schema::{DataType, UserTypeSchema};

/// A primitive storable value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Boolean(bool),
    TinyInt(i8),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Float(f32),
    Double(f64),
    Blob(Vec<u8>),
}

impl Scalar {
    /// Returns the storage type of this scalar.
    pub fn data_type(&self) -> DataType {
        match self {
            Scalar::Text(_) => DataType::Text,
            Scalar::Boolean(_) => DataType::Boolean,
            Scalar::TinyInt(_) => DataType::TinyInt,
            Scalar::SmallInt(_) => DataType::SmallInt,
            Scalar::Int(_) => DataType::Int,
            Scalar::BigInt(_) => DataType::BigInt,
            Scalar::Float(_) => DataType::Float,
            Scalar::Double(_) => DataType::Double,
            Scalar::Blob(_) => DataType::Blob,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Scalar::Boolean(b) => write!(f, "{b}"),
            Scalar::TinyInt(n) => write!(f, "{n}"),
            Scalar::SmallInt(n) => write!(f, "{n}"),
            Scalar::Int(n) => write!(f, "{n}"),
            Scalar::BigInt(n) => write!(f, "{n}"),
            Scalar::Float(n) if !n.is_finite() => {
                write_non_finite(f, n.is_nan(), n.is_sign_negative())
            }
            Scalar::Double(n) if !n.is_finite() => {
                write_non_finite(f, n.is_nan(), n.is_sign_negative())
            }
            // Debug keeps the fractional part of whole numbers (`1.0`, not `1`)
            Scalar::Float(n) => write!(f, "{n:?}"),
            Scalar::Double(n) => write!(f, "{n:?}"),
            Scalar::Blob(bytes) => {
                f.write_str("0x")?;
                for byte in bytes {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

fn write_non_finite(f: &mut fmt::Formatter<'_>, nan: bool, negative: bool) -> fmt::Result {
    match (nan, negative) {
        (true, _) => f.write_str("NaN"),
        (false, true) => f.write_str("-Infinity"),
        (false, false) => f.write_str("Infinity"),
    }
}

/// The wire-level value tree exchanged with the storage boundary.
///
/// Rendering via `Display` reproduces the stored literal form: user types as
/// `{field:value,...}`, sequences as `[value,...]`, text single-quoted and
/// absence as `null`.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Null,
    Scalar(Scalar),
    Udt(UdtValue),
    Sequence(Vec<TypedValue>),
}

impl TypedValue {
    /// Creates a text scalar.
    pub fn text(value: impl Into<String>) -> Self {
        TypedValue::Scalar(Scalar::Text(value.into()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, TypedValue::Null)
    }

    /// Describes the runtime kind of this value for error messages.
    pub fn kind(&self) -> String {
        match self {
            TypedValue::Null => "null".to_string(),
            TypedValue::Scalar(scalar) => scalar.data_type().to_string(),
            TypedValue::Udt(udt) => format!("frozen<{}>", udt.schema().name()),
            TypedValue::Sequence(_) => "list".to_string(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TypedValue::Scalar(Scalar::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_udt(&self) -> Option<&UdtValue> {
        match self {
            TypedValue::Udt(udt) => Some(udt),
            _ => None,
        }
    }

    /// Unwraps a user type value, failing on any other kind.
    pub fn into_udt(self) -> Result<UdtValue, MappingError> {
        match self {
            TypedValue::Udt(udt) => Ok(udt),
            other => Err(MappingError::mismatch(DataType::AnyUserType, other.kind())),
        }
    }

    /// Unwraps a sequence, failing on any other kind.
    pub fn into_sequence(self) -> Result<Vec<TypedValue>, MappingError> {
        match self {
            TypedValue::Sequence(elements) => Ok(elements),
            other => Err(MappingError::mismatch("list", other.kind())),
        }
    }
}

impl From<Scalar> for TypedValue {
    fn from(scalar: Scalar) -> Self {
        TypedValue::Scalar(scalar)
    }
}

impl From<UdtValue> for TypedValue {
    fn from(udt: UdtValue) -> Self {
        TypedValue::Udt(udt)
    }
}

impl From<Vec<TypedValue>> for TypedValue {
    fn from(elements: Vec<TypedValue>) -> Self {
        TypedValue::Sequence(elements)
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Null => f.write_str("null"),
            TypedValue::Scalar(scalar) => write!(f, "{scalar}"),
            TypedValue::Udt(udt) => write!(f, "{udt}"),
            TypedValue::Sequence(elements) => {
                f.write_str("[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{element}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// A value of a user defined type, bound to its schema.
///
/// Holds one slot per schema field, so the set of fields is always a subset of
/// the declared ones. Unset fields are absent and are not rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct UdtValue {
    schema: Arc<UserTypeSchema>,
    values: Vec<Option<TypedValue>>,
}

impl UdtValue {
    pub(crate) fn new(schema: Arc<UserTypeSchema>) -> Self {
        let values = vec![None; schema.len()];
        UdtValue { schema, values }
    }

    pub fn schema(&self) -> &Arc<UserTypeSchema> {
        &self.schema
    }

    /// Sets a field, failing if the schema does not declare it.
    pub fn set(&mut self, field: &str, value: impl Into<TypedValue>) -> Result<(), MappingError> {
        let index = self
            .schema
            .field_index(field)
            .ok_or_else(|| MappingError::UnknownField {
                user_type: self.schema.name().to_string(),
                field: field.to_string(),
            })?;
        self.values[index] = Some(value.into());
        Ok(())
    }

    /// Builder-style variant of [`UdtValue::set`].
    pub fn with(mut self, field: &str, value: impl Into<TypedValue>) -> Result<Self, MappingError> {
        self.set(field, value)?;
        Ok(self)
    }

    /// Returns a field's value if it is set.
    pub fn get(&self, field: &str) -> Option<&TypedValue> {
        let index = self.schema.field_index(field)?;
        self.values[index].as_ref()
    }

    /// Returns a text field's value.
    pub fn get_text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(TypedValue::as_text)
    }

    /// Iterates set fields in schema declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &TypedValue)> {
        self.schema
            .fields()
            .zip(&self.values)
            .filter_map(|((name, _), value)| value.as_ref().map(|v| (name, v)))
    }

    /// Consumes the value, yielding set fields in declaration order.
    pub fn into_fields(self) -> Vec<(String, TypedValue)> {
        self.schema
            .fields()
            .zip(self.values)
            .filter_map(|((name, _), value)| value.map(|v| (name.to_string(), v)))
            .collect()
    }

    /// Returns true when no field is set.
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }
}

impl fmt::Display for UdtValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.fields().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{name}:{value}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address_schema() -> Arc<UserTypeSchema> {
        Arc::new(UserTypeSchema::new(
            "address",
            [
                ("zip", DataType::Text),
                ("city", DataType::Text),
                ("streetlines", DataType::list(DataType::Text)),
            ],
        ))
    }

    #[test]
    fn udt_renders_in_declaration_order() {
        let mut value = address_schema().new_value();
        value
            .set(
                "streetlines",
                vec![TypedValue::text("Heckenpfad"), TypedValue::text("14")],
            )
            .unwrap();
        value.set("city", TypedValue::text("Weinheim")).unwrap();
        value.set("zip", TypedValue::text("69469")).unwrap();

        assert_eq!(
            value.to_string(),
            "{zip:'69469',city:'Weinheim',streetlines:['Heckenpfad','14']}"
        );
    }

    #[test]
    fn unset_fields_are_not_rendered() {
        let value = address_schema()
            .new_value()
            .with("city", TypedValue::text("Bonn"))
            .unwrap();

        assert_eq!(value.to_string(), "{city:'Bonn'}");
        assert!(value.get("zip").is_none());
        assert_eq!(value.get_text("city"), Some("Bonn"));
    }

    #[test]
    fn set_rejects_undeclared_field() {
        let mut value = address_schema().new_value();
        let err = value.set("country", TypedValue::text("DE")).unwrap_err();
        assert_eq!(
            err,
            MappingError::UnknownField {
                user_type: "address".to_string(),
                field: "country".to_string(),
            }
        );
        assert!(value.is_empty());
    }

    #[test]
    fn nested_udt_rendering() {
        let manufacturer = Arc::new(UserTypeSchema::new("manufacturer", [("name", DataType::Text)]));
        let engine = Arc::new(UserTypeSchema::new(
            "engine",
            [("manufacturer", DataType::user_type("manufacturer"))],
        ));

        let inner = manufacturer
            .new_value()
            .with("name", TypedValue::text("a good one"))
            .unwrap();
        let outer = engine.new_value().with("manufacturer", inner).unwrap();

        assert_eq!(outer.to_string(), "{manufacturer:{name:'a good one'}}");
    }

    #[test]
    fn scalar_rendering() {
        assert_eq!(TypedValue::Null.to_string(), "null");
        assert_eq!(TypedValue::text("it's").to_string(), "'it''s'");
        assert_eq!(TypedValue::from(Scalar::Int(42)).to_string(), "42");
        assert_eq!(TypedValue::from(Scalar::Boolean(true)).to_string(), "true");
        assert_eq!(
            TypedValue::from(Scalar::Blob(vec![0xca, 0xfe])).to_string(),
            "0xcafe"
        );
        assert_eq!(TypedValue::Sequence(vec![]).to_string(), "[]");
    }

    #[test]
    fn float_rendering() {
        assert_eq!(Scalar::Double(1.0).to_string(), "1.0");
        assert_eq!(Scalar::Double(49.5).to_string(), "49.5");
        assert_eq!(Scalar::Float(1.5).to_string(), "1.5");
        assert_eq!(Scalar::Double(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(Scalar::Float(f32::NEG_INFINITY).to_string(), "-Infinity");
        assert_eq!(Scalar::Double(f64::NAN).to_string(), "NaN");
    }

    #[test]
    fn into_udt_reports_kind() {
        let err = TypedValue::text("EUR").into_udt().unwrap_err();
        assert_eq!(err, MappingError::mismatch("udt", "text"));
    }
}
