use thiserror::Error;

use crate::conversion::Direction;

/// Error type for mapping operations.
///
/// Every failure is deterministic given the same inputs, so nothing is retried
/// internally and no partial result is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("unknown user type: {0}")]
    UnknownUserType(String),

    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("entity {0} has no identity property")]
    NoIdentityProperty(String),

    #[error("identity column {column} of {entity} is missing from the row")]
    MissingIdentity { entity: String, column: String },

    #[error("field {field} is not declared by user type {user_type}")]
    UnknownField { user_type: String, field: String },

    #[error("property {property} is declared more than once on {entity}")]
    DuplicateProperty { entity: String, property: String },

    #[error("no {direction} converter registered for {type_name}")]
    MissingConverter {
        type_name: &'static str,
        direction: Direction,
    },

    #[error("conversion failed: {0}")]
    Conversion(String),

    #[error("invalid data type: {0}")]
    InvalidDataType(String),
}

impl MappingError {
    pub(crate) fn mismatch(expected: impl ToString, actual: impl ToString) -> Self {
        MappingError::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Creates a conversion error from any displayable message.
    pub fn conversion(message: impl ToString) -> Self {
        MappingError::Conversion(message.to_string())
    }
}
