//! Names, descriptors and types for the kite compiler core.
//!
//! - `names`: `Name`, `FqName`, `ClassId`
//! - `descriptors`: immutable declaration descriptors
//! - `types`: `KType` and type projections
//! - `subtyping`, `substitution`: type relations
//! - `constraints`: constraint system used for type-argument inference
//! - `scope`: member scopes of classes and packages

pub mod builtins;
pub mod constraints;
pub mod descriptors;
pub mod names;
pub mod scope;
pub mod substitution;
pub mod subtyping;
pub mod types;

pub use builtins::BuiltIns;
pub use constraints::{ConstraintPosition, ConstraintSystem, ConstraintSystemStatus};
pub use descriptors::{
    ClassContents, ClassDescriptor, ClassKind, ConstantValue, ConstructorDescriptor,
    ContainingDeclaration, DeclarationDescriptor, DescriptorId, EagerClassContents,
    FunctionDescriptor, LocalVariableDescriptor, Modality, PropertyAccessorDescriptor,
    PropertyDescriptor, TypeParameterDescriptor, ValueParameterDescriptor, Variance, Visibility,
};
pub use names::{ClassId, FqName, Name, special_names, standard_class_ids};
pub use scope::MemberScope;
pub use substitution::TypeSubstitutor;
pub use subtyping::{common_supertype, equal_types, is_subtype_of};
pub use types::{FlexibleTypeCapabilities, KType, TypeProjection};

#[cfg(test)]
#[path = "../tests/fixtures.rs"]
pub(crate) mod fixtures;
