use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::error::MappingError;
use crate::schema::UserTypeSchema;

/// Resolves user type schemas by name.
///
/// Supplied by the surrounding system and treated as authoritative. Lookups
/// are expected to be cheap; the metadata registry caches results anyway.
pub trait UserTypeResolver: Send + Sync {
    /// Returns the schema registered under `name`, if any.
    fn resolve(&self, name: &str) -> Option<UserTypeSchema>;
}

/// An in-memory resolver backed by a HashMap.
///
/// Useful for testing and for deployments where user types are known up front.
#[derive(Debug, Default)]
pub struct SimpleUserTypeResolver {
    types: RwLock<HashMap<String, UserTypeSchema>>,
}

impl SimpleUserTypeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a schema, replacing any previous one with the same name.
    pub fn register(&self, schema: UserTypeSchema) {
        self.types
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(schema.name().to_string(), schema);
    }

    /// Parses and registers a schema from its field definitions.
    pub fn define(&self, name: &str, definition: &str) -> Result<(), MappingError> {
        self.register(UserTypeSchema::parse(name, definition)?);
        Ok(())
    }

    /// Builder-style variant of [`SimpleUserTypeResolver::register`].
    pub fn with(self, schema: UserTypeSchema) -> Self {
        self.register(schema);
        self
    }
}

impl UserTypeResolver for SimpleUserTypeResolver {
    fn resolve(&self, name: &str) -> Option<UserTypeSchema> {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}
