//! Tessera maps domain objects to and from a column store's typed values,
//! with first-class support for user defined types (UDTs).
//!
//! Core concepts:
//! - **TypedValue**: the storable value tree (null, scalar, UDT value, sequence)
//! - **Mapped**: a type with a persistent shape, described by an `EntityDescriptor`
//! - **Persistable**: a type that can be stored in a column or UDT field
//! - **CustomConversions**: user converters that take priority over structural mapping
//! - **ValueCodec**: the recursive write/read core
//! - **StatementAssembler** / **RowMaterializer**: entity to statement clauses, row to entity
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tessera_core::{
//!     CustomConversions, Mapped, MappingConverter, SimpleUserTypeResolver, StatementKind,
//! };
//!
//! #[derive(Debug, Default, Mapped)]
//! #[mapping(user_type)]
//! struct Manufacturer {
//!     name: Option<String>,
//! }
//!
//! #[derive(Debug, Default, Mapped)]
//! struct Car {
//!     #[mapping(id)]
//!     id: Option<String>,
//!     manufacturer: Option<Manufacturer>,
//! }
//!
//! let resolver = SimpleUserTypeResolver::new();
//! resolver.define("manufacturer", "name text").unwrap();
//! let converter = MappingConverter::new(Arc::new(resolver), CustomConversions::new());
//!
//! let car = Car {
//!     id: Some("1".to_string()),
//!     manufacturer: Some(Manufacturer { name: Some("a good one".to_string()) }),
//! };
//! let insert = converter.write(&car, StatementKind::Insert).unwrap();
//! assert_eq!(
//!     insert.to_string(),
//!     "INSERT INTO car (id,manufacturer) VALUES ('1',{name:'a good one'});"
//! );
//! ```

// Lets derive output name `::tessera_core` from inside this crate too.
extern crate self as tessera_core;

mod codec;
mod config;
mod conversion;
mod converter;
mod error;
mod metadata;
mod persistable;
mod resolver;
mod row;
mod schema;
mod statement;
mod value;

pub use codec::ValueCodec;
pub use config::{EmptyUserType, MappingConfig};
pub use conversion::{ConversionEntry, CustomConversions, CustomConversionsBuilder, Direction};
pub use converter::MappingConverter;
pub use error::MappingError;
pub use metadata::{
    EntityDescriptor, EntityDescriptorBuilder, EntityKind, EntityMetadataRegistry, Getter, Mapped,
    PropertyDescriptor, Setter,
};
pub use persistable::{Blob, Persistable};
pub use resolver::{SimpleUserTypeResolver, UserTypeResolver};
pub use row::{Row, RowMaterializer};
pub use schema::{DataType, UserTypeSchema};
pub use statement::{Clause, Statement, StatementAssembler, StatementKind};
pub use value::{Scalar, TypedValue, UdtValue};

#[cfg(feature = "derive")]
pub use tessera_derive::Mapped;
