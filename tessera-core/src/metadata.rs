use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::codec::ValueCodec;
use crate::error::MappingError;
use crate::resolver::UserTypeResolver;
use crate::schema::{DataType, UserTypeSchema};
use crate::value::TypedValue;

/// Reads a property off an entity as a storage value.
pub type Getter<E> = fn(&E, &ValueCodec) -> Result<TypedValue, MappingError>;

/// Writes a non-null storage value into an entity's property.
pub type Setter<E> = fn(&mut E, TypedValue, &ValueCodec) -> Result<(), MappingError>;

/// A type whose persistent shape is described by an [`EntityDescriptor`].
///
/// Usually derived with `#[derive(Mapped)]`. `Default` provides the unset
/// state that reading starts from.
pub trait Mapped: Default + Send + Sync + 'static {
    /// Describes the persistent structure of this type.
    ///
    /// Called at most once per registry; the result is cached.
    fn introspect() -> Result<EntityDescriptor<Self>, MappingError>;
}

/// Whether an entity is stored as a table row or as a user type value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Table,
    UserType,
}

/// Describes one persistent property of `E`.
pub struct PropertyDescriptor<E> {
    name: String,
    data_type: DataType,
    identity: bool,
    get: Getter<E>,
    set: Setter<E>,
}

impl<E> PropertyDescriptor<E> {
    pub fn new(name: impl Into<String>, data_type: DataType, get: Getter<E>, set: Setter<E>) -> Self {
        PropertyDescriptor {
            name: name.into(),
            data_type,
            identity: false,
            get,
            set,
        }
    }

    /// Marks this property as part of the primary key.
    pub fn identity(mut self) -> Self {
        self.identity = true;
        self
    }

    /// Persisted column or field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn is_identity(&self) -> bool {
        self.identity
    }

    pub fn is_user_type(&self) -> bool {
        self.data_type.is_user_type()
    }

    pub fn is_sequence_of_user_type(&self) -> bool {
        self.data_type.is_sequence_of_user_type()
    }

    /// Reads this property from `entity`.
    pub fn get(&self, entity: &E, codec: &ValueCodec) -> Result<TypedValue, MappingError> {
        (self.get)(entity, codec)
    }

    /// Writes `value` into this property of `entity`.
    pub fn set(&self, entity: &mut E, value: TypedValue, codec: &ValueCodec) -> Result<(), MappingError> {
        (self.set)(entity, value, codec)
    }
}

impl<E> fmt::Debug for PropertyDescriptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("data_type", &self.data_type)
            .field("identity", &self.identity)
            .finish()
    }
}

/// Structural description of a mapped type.
///
/// Properties are kept sorted by persisted name; this order determines column
/// order in every emitted statement and field write order for user types.
pub struct EntityDescriptor<E> {
    name: String,
    kind: EntityKind,
    properties: Vec<PropertyDescriptor<E>>,
    user_type: Option<Arc<UserTypeSchema>>,
}

impl<E> EntityDescriptor<E> {
    /// Starts describing a table entity.
    pub fn table(name: impl Into<String>) -> EntityDescriptorBuilder<E> {
        EntityDescriptorBuilder::new(name.into(), EntityKind::Table)
    }

    /// Starts describing a user type.
    pub fn user_type(name: impl Into<String>) -> EntityDescriptorBuilder<E> {
        EntityDescriptorBuilder::new(name.into(), EntityKind::UserType)
    }

    /// Persisted table or user type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn is_user_type(&self) -> bool {
        self.kind == EntityKind::UserType
    }

    /// All properties in lexicographic order of their persisted names.
    pub fn properties(&self) -> &[PropertyDescriptor<E>] {
        &self.properties
    }

    /// Looks up a property by persisted name.
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor<E>> {
        self.properties
            .binary_search_by(|p| p.name.as_str().cmp(name))
            .ok()
            .map(|index| &self.properties[index])
    }

    /// Identity properties in lexicographic order.
    pub fn identity_properties(&self) -> impl Iterator<Item = &PropertyDescriptor<E>> {
        self.properties.iter().filter(|p| p.identity)
    }

    pub fn has_identity(&self) -> bool {
        self.properties.iter().any(|p| p.identity)
    }

    /// Fails unless at least one identity property is declared.
    pub fn require_identity(&self) -> Result<(), MappingError> {
        if self.has_identity() {
            Ok(())
        } else {
            Err(MappingError::NoIdentityProperty(self.name.clone()))
        }
    }

    /// The resolved schema, present for user types once described by a registry.
    pub fn user_type_schema(&self) -> Option<&Arc<UserTypeSchema>> {
        self.user_type.as_ref()
    }

    fn with_user_type(mut self, schema: Arc<UserTypeSchema>) -> Self {
        self.user_type = Some(schema);
        self
    }
}

impl<E> fmt::Debug for EntityDescriptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("properties", &self.properties)
            .field("user_type", &self.user_type)
            .finish()
    }
}

/// Collects properties for an [`EntityDescriptor`].
pub struct EntityDescriptorBuilder<E> {
    name: String,
    kind: EntityKind,
    properties: Vec<PropertyDescriptor<E>>,
}

impl<E> EntityDescriptorBuilder<E> {
    fn new(name: String, kind: EntityKind) -> Self {
        EntityDescriptorBuilder {
            name,
            kind,
            properties: Vec::new(),
        }
    }

    pub fn property(mut self, property: PropertyDescriptor<E>) -> Self {
        self.properties.push(property);
        self
    }

    /// Sorts properties by persisted name and rejects duplicates.
    pub fn build(mut self) -> Result<EntityDescriptor<E>, MappingError> {
        self.properties.sort_by(|a, b| a.name.cmp(&b.name));

        if let Some(pair) = self.properties.windows(2).find(|w| w[0].name == w[1].name) {
            return Err(MappingError::DuplicateProperty {
                entity: self.name,
                property: pair[0].name.clone(),
            });
        }

        Ok(EntityDescriptor {
            name: self.name,
            kind: self.kind,
            properties: self.properties,
            user_type: None,
        })
    }
}

/// Resolves mapped types to their descriptors, memoized per type.
///
/// Descriptors and user type schemas are built on first reference and cached
/// for the lifetime of the registry. Concurrent first calls may build the same
/// descriptor twice; only the first published one is ever handed out.
pub struct EntityMetadataRegistry {
    resolver: Arc<dyn UserTypeResolver>,
    entities: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
    user_types: RwLock<HashMap<String, Arc<UserTypeSchema>>>,
}

impl EntityMetadataRegistry {
    pub fn new(resolver: Arc<dyn UserTypeResolver>) -> Self {
        EntityMetadataRegistry {
            resolver,
            entities: RwLock::new(HashMap::new()),
            user_types: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the descriptor of `E`, building it on first use.
    ///
    /// For user types the schema is resolved and attached; a schema the
    /// resolver does not know fails with `UnknownUserType`.
    pub fn describe<E: Mapped>(&self) -> Result<Arc<EntityDescriptor<E>>, MappingError> {
        let type_id = TypeId::of::<E>();

        let cached = self
            .entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
            .cloned();
        if let Some(any) = cached {
            return Self::downcast(any);
        }

        let mut descriptor = E::introspect()?;
        if descriptor.is_user_type() {
            let schema = self.user_type(descriptor.name())?;
            descriptor = descriptor.with_user_type(schema);
        }
        debug!(
            entity = descriptor.name(),
            domain = type_name::<E>(),
            properties = descriptor.properties().len(),
            "built entity descriptor"
        );

        let published = Arc::clone(
            self.entities
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(type_id)
                .or_insert_with(|| Arc::new(descriptor) as Arc<dyn Any + Send + Sync>),
        );
        Self::downcast(published)
    }

    /// Resolves a user type schema by name, caching the result.
    pub fn user_type(&self, name: &str) -> Result<Arc<UserTypeSchema>, MappingError> {
        let cached = self
            .user_types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();
        if let Some(schema) = cached {
            return Ok(schema);
        }

        let schema = self
            .resolver
            .resolve(name)
            .ok_or_else(|| MappingError::UnknownUserType(name.to_string()))?;
        debug!(user_type = name, fields = schema.len(), "resolved user type");

        Ok(Arc::clone(
            self.user_types
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(schema)),
        ))
    }

    /// Number of cached entity descriptors.
    pub fn len(&self) -> usize {
        self.entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn downcast<E: Mapped>(
        any: Arc<dyn Any + Send + Sync>,
    ) -> Result<Arc<EntityDescriptor<E>>, MappingError> {
        any.downcast::<EntityDescriptor<E>>()
            .map_err(|_| MappingError::mismatch(type_name::<E>(), "foreign descriptor"))
    }
}

impl fmt::Debug for EntityMetadataRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityMetadataRegistry")
            .field("entities", &self.len())
            .finish_non_exhaustive()
    }
}
