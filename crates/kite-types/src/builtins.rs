//! Handles to the standard library classes the compiler needs directly.

use crate::descriptors::ClassDescriptor;
use crate::names::{ClassId, standard_class_ids};
use crate::types::KType;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct BuiltIns {
    pub any: Arc<ClassDescriptor>,
    pub nothing: Arc<ClassDescriptor>,
    pub unit: Arc<ClassDescriptor>,
    pub int: Arc<ClassDescriptor>,
    pub boolean: Arc<ClassDescriptor>,
    pub string: Arc<ClassDescriptor>,
    pub throwable: Arc<ClassDescriptor>,
}

impl BuiltIns {
    /// Resolve every builtin through `find_class`. Returns the id of the
    /// first class that is missing.
    pub fn load(
        find_class: impl Fn(&ClassId) -> Option<Arc<ClassDescriptor>>,
    ) -> Result<BuiltIns, ClassId> {
        let get = |id: ClassId| find_class(&id).ok_or(id);
        Ok(BuiltIns {
            any: get(standard_class_ids::any())?,
            nothing: get(standard_class_ids::nothing())?,
            unit: get(standard_class_ids::unit())?,
            int: get(standard_class_ids::int())?,
            boolean: get(standard_class_ids::boolean())?,
            string: get(standard_class_ids::string())?,
            throwable: get(standard_class_ids::throwable())?,
        })
    }

    pub fn any_type(&self) -> KType {
        KType::simple_class(&self.any)
    }

    pub fn nullable_any_type(&self) -> KType {
        KType::class(&self.any, Vec::new(), true)
    }

    pub fn nothing_type(&self) -> KType {
        KType::simple_class(&self.nothing)
    }

    /// The type of the `null` literal.
    pub fn nullable_nothing_type(&self) -> KType {
        KType::class(&self.nothing, Vec::new(), true)
    }

    pub fn unit_type(&self) -> KType {
        KType::simple_class(&self.unit)
    }

    pub fn int_type(&self) -> KType {
        KType::simple_class(&self.int)
    }

    pub fn boolean_type(&self) -> KType {
        KType::simple_class(&self.boolean)
    }

    pub fn string_type(&self) -> KType {
        KType::simple_class(&self.string)
    }

    pub fn throwable_type(&self) -> KType {
        KType::simple_class(&self.throwable)
    }
}
