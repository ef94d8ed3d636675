use std::sync::Arc;

use crate::codec::ValueCodec;
use crate::config::MappingConfig;
use crate::conversion::CustomConversions;
use crate::error::MappingError;
use crate::metadata::{EntityDescriptor, EntityMetadataRegistry, Mapped};
use crate::resolver::UserTypeResolver;
use crate::row::{Row, RowMaterializer};
use crate::schema::UserTypeSchema;
use crate::statement::{Statement, StatementAssembler, StatementKind};

/// Entry point bundling metadata, conversions, statement assembly and row
/// materialization over one shared codec.
#[derive(Debug, Clone)]
pub struct MappingConverter {
    codec: ValueCodec,
    assembler: StatementAssembler,
    materializer: RowMaterializer,
}

impl MappingConverter {
    pub fn new(resolver: Arc<dyn UserTypeResolver>, conversions: CustomConversions) -> Self {
        let metadata = Arc::new(EntityMetadataRegistry::new(resolver));
        Self::from_codec(ValueCodec::new(metadata, Arc::new(conversions)))
    }

    pub fn from_codec(codec: ValueCodec) -> Self {
        MappingConverter {
            assembler: StatementAssembler::new(codec.clone()),
            materializer: RowMaterializer::new(codec.clone()),
            codec,
        }
    }

    pub fn with_config(self, config: MappingConfig) -> Self {
        Self::from_codec(self.codec.with_config(config))
    }

    pub fn codec(&self) -> &ValueCodec {
        &self.codec
    }

    pub fn metadata(&self) -> &EntityMetadataRegistry {
        self.codec.metadata()
    }

    /// Returns the cached descriptor of `E`.
    pub fn descriptor<E: Mapped>(&self) -> Result<Arc<EntityDescriptor<E>>, MappingError> {
        self.metadata().describe::<E>()
    }

    /// Resolves a user type schema, e.g. to build a raw `UdtValue`.
    pub fn user_type(&self, name: &str) -> Result<Arc<UserTypeSchema>, MappingError> {
        self.metadata().user_type(name)
    }

    /// Assembles a statement of the given kind for `entity`.
    pub fn write<E: Mapped>(&self, entity: &E, kind: StatementKind) -> Result<Statement, MappingError> {
        self.assembler.assemble(entity, kind)
    }

    /// Materializes a fetched row as `E`.
    pub fn read<E: Mapped>(&self, row: &Row) -> Result<E, MappingError> {
        self.materializer.materialize(row)
    }
}
