use std::collections::HashMap;

use tracing::instrument;

use crate::codec::ValueCodec;
use crate::error::MappingError;
use crate::metadata::Mapped;
use crate::value::TypedValue;

/// A fetched row: column name to stored value, as delivered by a driver.
///
/// No column order is assumed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: HashMap<String, TypedValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column insertion.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<TypedValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<TypedValue>) {
        self.columns.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&TypedValue> {
        self.columns.get(column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<C: Into<String>> FromIterator<(C, TypedValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (C, TypedValue)>>(iter: I) -> Self {
        Row {
            columns: iter.into_iter().map(|(c, v)| (c.into(), v)).collect(),
        }
    }
}

/// Builds domain objects from fetched rows.
#[derive(Debug, Clone)]
pub struct RowMaterializer {
    codec: ValueCodec,
}

impl RowMaterializer {
    pub fn new(codec: ValueCodec) -> Self {
        RowMaterializer { codec }
    }

    /// Populates a fresh `E` from the columns present in `row`.
    ///
    /// Missing and null columns leave their property unset; columns without a
    /// matching property are ignored.
    #[instrument(level = "debug", skip(self, row), fields(entity = std::any::type_name::<E>()))]
    pub fn materialize<E: Mapped>(&self, row: &Row) -> Result<E, MappingError> {
        let descriptor = self.codec.metadata().describe::<E>()?;

        let mut entity = E::default();
        for property in descriptor.properties() {
            match row.get(property.name()) {
                Some(value) if !value.is_null() => {
                    property.set(&mut entity, value.clone(), &self.codec)?;
                }
                _ => {}
            }
        }
        Ok(entity)
    }

    /// Like [`RowMaterializer::materialize`], but fails with `MissingIdentity`
    /// unless every identity column is present and non-null.
    pub fn materialize_with_identity<E: Mapped>(&self, row: &Row) -> Result<E, MappingError> {
        let descriptor = self.codec.metadata().describe::<E>()?;
        descriptor.require_identity()?;

        if let Some(missing) = descriptor
            .identity_properties()
            .find(|p| row.get(p.name()).is_none_or(TypedValue::is_null))
        {
            return Err(MappingError::MissingIdentity {
                entity: descriptor.name().to_string(),
                column: missing.name().to_string(),
            });
        }
        self.materialize(row)
    }
}
