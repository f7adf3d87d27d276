//! Proto records of a serialized metadata module.
//!
//! A module is a flat string table, a parent-linked qualified-name table,
//! and class and package records whose names and types are integer
//! references into those tables.

use crate::error::{MetadataError, MetadataResult};
use crate::flags::{AccessorFlags, CallableFlags, CallableKind, ClassFlags};
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum QualifiedNameKind {
    Class,
    Package,
    Local,
}

/// One segment of a qualified name. `parent` must refer to an earlier entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct QualifiedNameProto {
    pub short_name: u32,
    pub parent: Option<u32>,
    pub kind: QualifiedNameKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ProjectionProto {
    Invariant,
    In,
    Out,
    Star,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TypeConstructorProto {
    /// Index into the qualified-name table.
    Class(u32),
    /// Id of a type parameter declared in an enclosing scope.
    TypeParameter(u32),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TypeArgumentProto {
    pub projection: ProjectionProto,
    /// Absent only for star projections.
    pub ty: Option<TypeProto>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TypeProto {
    pub constructor: TypeConstructorProto,
    pub arguments: Vec<TypeArgumentProto>,
    pub nullable: bool,
    /// String-table id of the flexible-type capabilities; present on flexible types.
    pub flexible_type_capabilities_id: Option<u32>,
    pub flexible_upper_bound: Option<Box<TypeProto>>,
}

impl TypeProto {
    pub fn class(fq_name: u32, arguments: Vec<TypeArgumentProto>, nullable: bool) -> Self {
        TypeProto {
            constructor: TypeConstructorProto::Class(fq_name),
            arguments,
            nullable,
            flexible_type_capabilities_id: None,
            flexible_upper_bound: None,
        }
    }

    pub fn type_parameter(id: u32, nullable: bool) -> Self {
        TypeProto {
            constructor: TypeConstructorProto::TypeParameter(id),
            arguments: Vec::new(),
            nullable,
            flexible_type_capabilities_id: None,
            flexible_upper_bound: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum VarianceProto {
    Invariant,
    In,
    Out,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TypeParameterProto {
    pub id: u32,
    pub name: u32,
    pub variance: VarianceProto,
    pub reified: bool,
    pub upper_bounds: Vec<TypeProto>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValueParameterProto {
    pub name: u32,
    pub ty: TypeProto,
    pub declares_default: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ConstantProto {
    Int(i32),
    Boolean(bool),
    /// String-table index.
    String(u32),
    Null,
}

/// A function, property or constructor.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CallableProto {
    pub flags: CallableFlags,
    pub name: u32,
    pub type_parameters: Vec<TypeParameterProto>,
    pub receiver_type: Option<TypeProto>,
    pub value_parameters: Vec<ValueParameterProto>,
    /// Function return type or property type. Absent for constructors.
    pub return_type: Option<TypeProto>,
    pub getter_flags: AccessorFlags,
    pub setter_flags: AccessorFlags,
    /// Explicit setter parameter; synthesized when the setter is default.
    pub setter_parameter: Option<ValueParameterProto>,
    pub constant: Option<ConstantProto>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassProto {
    pub flags: ClassFlags,
    pub fq_name: u32,
    pub type_parameters: Vec<TypeParameterProto>,
    pub supertypes: Vec<TypeProto>,
    pub constructors: Vec<CallableProto>,
    pub members: Vec<CallableProto>,
    pub nested_class_names: Vec<u32>,
}

/// Top-level declarations of one package, compiled into a facade class.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PackageProto {
    pub fq_name: u32,
    /// Qualified-name index of the facade class.
    pub facade: u32,
    pub members: Vec<CallableProto>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModuleProto {
    pub name: String,
    pub strings: Vec<String>,
    pub qualified_names: Vec<QualifiedNameProto>,
    pub classes: Vec<Arc<ClassProto>>,
    pub packages: Vec<Arc<PackageProto>>,
}

impl ModuleProto {
    /// Check every table reference and record shape.
    ///
    /// A validated module can be deserialized lazily without further
    /// corruption checks.
    pub fn validate(&self) -> MetadataResult<()> {
        let validator = Validator { module: self };
        for (index, name) in self.qualified_names.iter().enumerate() {
            validator.string(name.short_name)?;
            if let Some(parent) = name.parent {
                if parent as usize >= index {
                    return Err(MetadataError::QualifiedNameOrder {
                        index: index as u32,
                        parent,
                    });
                }
            }
        }
        for class in &self.classes {
            validator.class_name(class.fq_name)?;
            validator.type_parameters(&class.type_parameters)?;
            for supertype in &class.supertypes {
                validator.ty(supertype)?;
            }
            for constructor in &class.constructors {
                validator.callable(constructor, Placement::Constructor)?;
            }
            for member in &class.members {
                validator.callable(member, Placement::ClassMember)?;
            }
            for nested in &class.nested_class_names {
                validator.string(*nested)?;
            }
        }
        for package in &self.packages {
            validator.qualified_name(package.fq_name)?;
            validator.class_name(package.facade)?;
            for member in &package.members {
                validator.callable(member, Placement::PackageMember)?;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Placement {
    Constructor,
    ClassMember,
    PackageMember,
}

impl Placement {
    fn describe(self) -> &'static str {
        match self {
            Placement::Constructor => "a class constructor",
            Placement::ClassMember => "a class member",
            Placement::PackageMember => "a package member",
        }
    }
}

struct Validator<'a> {
    module: &'a ModuleProto,
}

impl Validator<'_> {
    fn string(&self, index: u32) -> MetadataResult<()> {
        check_index("string", index, self.module.strings.len())
    }

    fn qualified_name(&self, index: u32) -> MetadataResult<()> {
        check_index("qualified name", index, self.module.qualified_names.len())
    }

    fn class_name(&self, index: u32) -> MetadataResult<()> {
        self.qualified_name(index)?;
        match self.module.qualified_names[index as usize].kind {
            QualifiedNameKind::Class => Ok(()),
            _ => Err(MetadataError::NotAClassName { index }),
        }
    }

    fn ty(&self, ty: &TypeProto) -> MetadataResult<()> {
        if let TypeConstructorProto::Class(index) = ty.constructor {
            self.class_name(index)?;
        }
        for argument in &ty.arguments {
            match (&argument.ty, argument.projection) {
                (Some(ty), _) => self.ty(ty)?,
                (None, ProjectionProto::Star) => {}
                (None, _) => {
                    return Err(MetadataError::MissingField {
                        record: "TypeArgument",
                        field: "ty",
                    });
                }
            }
        }
        if let Some(id) = ty.flexible_type_capabilities_id {
            self.string(id)?;
            match &ty.flexible_upper_bound {
                Some(upper) => self.ty(upper)?,
                None => {
                    return Err(MetadataError::MissingField {
                        record: "Type",
                        field: "flexible_upper_bound",
                    });
                }
            }
        }
        Ok(())
    }

    fn type_parameters(&self, parameters: &[TypeParameterProto]) -> MetadataResult<()> {
        for parameter in parameters {
            self.string(parameter.name)?;
            for bound in &parameter.upper_bounds {
                self.ty(bound)?;
            }
        }
        Ok(())
    }

    fn value_parameter(&self, parameter: &ValueParameterProto) -> MetadataResult<()> {
        self.string(parameter.name)?;
        self.ty(&parameter.ty)
    }

    fn callable(&self, callable: &CallableProto, placement: Placement) -> MetadataResult<()> {
        self.string(callable.name)?;
        let name = || self.module.strings[callable.name as usize].clone();
        let Some(kind) = callable.flags.kind() else {
            return Err(MetadataError::UnknownCallableKind {
                kind: callable.flags.kind_code(),
                name: name(),
            });
        };
        let is_constructor = kind == CallableKind::Constructor;
        if is_constructor != matches!(placement, Placement::Constructor) {
            return Err(MetadataError::MisplacedCallable {
                name: name(),
                place: placement.describe(),
            });
        }
        self.type_parameters(&callable.type_parameters)?;
        if let Some(receiver) = &callable.receiver_type {
            self.ty(receiver)?;
        }
        for parameter in &callable.value_parameters {
            self.value_parameter(parameter)?;
        }
        if let Some(parameter) = &callable.setter_parameter {
            self.value_parameter(parameter)?;
        }
        match &callable.return_type {
            Some(ty) => self.ty(ty)?,
            None if !is_constructor => {
                return Err(MetadataError::MissingField {
                    record: "Callable",
                    field: "return_type",
                });
            }
            None => {}
        }
        if let Some(ConstantProto::String(index)) = &callable.constant {
            self.string(*index)?;
        }
        Ok(())
    }
}

fn check_index(table: &'static str, index: u32, size: usize) -> MetadataResult<()> {
    if (index as usize) < size {
        Ok(())
    } else {
        Err(MetadataError::IndexOutOfRange { table, index, size })
    }
}

#[cfg(test)]
#[path = "../tests/proto_tests.rs"]
mod proto_tests;
