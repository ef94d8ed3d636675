use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::MappingError;
use crate::value::UdtValue;

/// Storage type system.
///
/// Describes the declared type of a column or of a user type field. Displays
/// and parses using CQL type syntax (`text`, `list<text>`, `frozen<address>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    // Scalars
    /// UTF-8 text string.
    Text,
    /// Boolean value.
    Boolean,
    /// 8-bit signed integer.
    TinyInt,
    /// 16-bit signed integer.
    SmallInt,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    BigInt,
    /// 32-bit IEEE float.
    Float,
    /// 64-bit IEEE float.
    Double,
    /// Opaque byte sequence.
    Blob,

    // Compound types
    /// Homogeneous ordered list.
    List(Box<DataType>),
    /// Named user defined type, resolved through a `UserTypeResolver`.
    UserType(String),
    /// A user type value whose schema travels with the value itself.
    AnyUserType,
}

impl DataType {
    /// Creates a list type.
    pub fn list(element: DataType) -> Self {
        DataType::List(Box::new(element))
    }

    /// Creates a reference to a named user type.
    pub fn user_type(name: impl Into<String>) -> Self {
        DataType::UserType(name.into())
    }

    /// Returns true for user type valued declarations.
    pub fn is_user_type(&self) -> bool {
        matches!(self, DataType::UserType(_) | DataType::AnyUserType)
    }

    /// Returns true for a list whose element type is a user type.
    pub fn is_sequence_of_user_type(&self) -> bool {
        match self {
            DataType::List(element) => element.is_user_type(),
            _ => false,
        }
    }

    /// Returns the element type of a list.
    pub fn element(&self) -> Option<&DataType> {
        match self {
            DataType::List(element) => Some(element),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Text => f.write_str("text"),
            DataType::Boolean => f.write_str("boolean"),
            DataType::TinyInt => f.write_str("tinyint"),
            DataType::SmallInt => f.write_str("smallint"),
            DataType::Int => f.write_str("int"),
            DataType::BigInt => f.write_str("bigint"),
            DataType::Float => f.write_str("float"),
            DataType::Double => f.write_str("double"),
            DataType::Blob => f.write_str("blob"),
            DataType::List(element) => write!(f, "list<{element}>"),
            DataType::UserType(name) => write!(f, "frozen<{name}>"),
            DataType::AnyUserType => f.write_str("udt"),
        }
    }
}

impl FromStr for DataType {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let invalid = || MappingError::InvalidDataType(s.to_string());

        if let Some((outer, rest)) = text.split_once('<') {
            let inner = rest.strip_suffix('>').ok_or_else(invalid)?;
            return match outer.trim().to_ascii_lowercase().as_str() {
                "list" => Ok(DataType::list(inner.parse()?)),
                // Frozen only affects storage layout, not the mapped shape
                "frozen" => inner.parse(),
                _ => Err(invalid()),
            };
        }

        if text.is_empty() || !text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(invalid());
        }

        Ok(match text.to_ascii_lowercase().as_str() {
            "text" | "varchar" | "ascii" => DataType::Text,
            "boolean" => DataType::Boolean,
            "tinyint" => DataType::TinyInt,
            "smallint" => DataType::SmallInt,
            "int" => DataType::Int,
            "bigint" | "counter" => DataType::BigInt,
            "float" => DataType::Float,
            "double" => DataType::Double,
            "blob" => DataType::Blob,
            other => DataType::UserType(other.to_string()),
        })
    }
}

/// Schema of a user defined type: its name and ordered, typed fields.
///
/// Schemas are provided by a `UserTypeResolver` and are immutable once
/// resolved. Field order is the declaration order and drives rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTypeSchema {
    name: String,
    fields: IndexMap<String, DataType>,
}

impl UserTypeSchema {
    /// Creates a schema from field definitions, in declaration order.
    pub fn new<N: Into<String>>(
        name: impl Into<String>,
        fields: impl IntoIterator<Item = (N, DataType)>,
    ) -> Self {
        UserTypeSchema {
            name: name.into(),
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Parses field definitions such as `zip text, city text, streetlines list<text>`.
    pub fn parse(name: impl Into<String>, definition: &str) -> Result<Self, MappingError> {
        let mut fields = IndexMap::new();
        for column in split_top_level(definition) {
            let column = column.trim();
            if column.is_empty() {
                continue;
            }
            let (field, ty) = column
                .split_once(char::is_whitespace)
                .ok_or_else(|| MappingError::InvalidDataType(column.to_string()))?;
            fields.insert(field.to_ascii_lowercase(), ty.parse()?);
        }
        Ok(UserTypeSchema {
            name: name.into(),
            fields,
        })
    }

    /// Returns the persisted name of this user type.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared type of a field.
    pub fn field_type(&self, field: &str) -> Option<&DataType> {
        self.fields.get(field)
    }

    /// Returns the declaration index of a field.
    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.fields.get_index_of(field)
    }

    /// Iterates field names and types in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &DataType)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Creates an empty value of this type with no field set.
    pub fn new_value(self: &Arc<Self>) -> UdtValue {
        UdtValue::new(Arc::clone(self))
    }
}

/// Splits on commas that are not nested inside angle brackets.
fn split_top_level(definition: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in definition.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&definition[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&definition[start..]);
    parts
}
