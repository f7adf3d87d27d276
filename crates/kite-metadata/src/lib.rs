//! Descriptor metadata for Kite modules.
//!
//! A compiled module carries a string table, a parent-linked
//! qualified-name table and proto records for its classes and packages.
//! This crate encodes and decodes those modules, writes descriptors into
//! them, and turns them back into descriptors lazily:
//!
//! - [`NameResolver`] maps table indices to names and class ids
//! - [`TypeDeserializer`] rebuilds types within nested type-parameter scopes
//! - [`MemberDeserializer`] rebuilds functions, properties and constructors
//! - [`DescriptorFinder`] memoizes class and package lookups over a
//!   [`ClassDataSource`]

pub mod class_deserializer;
pub mod codec;
pub mod context;
pub mod error;
pub mod finder;
pub mod flags;
pub mod member_deserializer;
pub mod name_resolver;
pub mod proto;
pub mod serializer;
pub mod stdlib;
pub mod type_deserializer;

pub use codec::{decode_module, encode_module};
pub use context::{DeserializationContext, FlexibleCapabilitiesProvider, PLATFORM_CAPABILITIES_ID};
pub use error::{MetadataError, MetadataResult};
pub use finder::{
    ClassData, ClassDataSource, DescriptorFinder, ModuleClassDataSource, ModuleData, PackageData,
    PackageFragment,
};
pub use flags::{AccessorFlags, CallableFlags, CallableKind, ClassFlags};
pub use member_deserializer::{CallableDescriptor, MemberDeserializer};
pub use name_resolver::NameResolver;
pub use proto::ModuleProto;
pub use serializer::{DescriptorSerializer, StringTable};
pub use stdlib::{DEFAULT_IMPORTS, box_class_id, stdlib_finder, stdlib_module};
pub use type_deserializer::{TypeConstructor, TypeDeserializer};

#[cfg(test)]
#[path = "../tests/test_support.rs"]
pub(crate) mod test_support;
