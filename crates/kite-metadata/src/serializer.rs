//! Writing descriptors back into proto records.
//!
//! Strings and qualified names are de-duplicated through [`Interner`]s.
//! Each class is serialized against a child table whose ids continue the
//! module table's ids; once the class is done the child's entries are
//! appended to the module table in order, so the ids recorded in the
//! class proto stay valid.

use crate::flags::{AccessorFlags, CallableFlags, CallableKind, ClassFlags};
use crate::proto::*;
use indexmap::IndexMap;
use kite_common::Interner;
use kite_types::{
    ClassDescriptor, ClassId, ConstantValue, ConstructorDescriptor, ContainingDeclaration,
    DescriptorId, FqName, FunctionDescriptor, KType, PropertyDescriptor, TypeParameterDescriptor,
    TypeProjection, ValueParameterDescriptor, Variance,
};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// String and qualified-name tables under construction.
pub struct StringTable {
    strings: Arc<Interner<String>>,
    qualified_names: Arc<Interner<QualifiedNameProto>>,
}

impl Default for StringTable {
    fn default() -> Self {
        StringTable::new()
    }
}

impl StringTable {
    pub fn new() -> Self {
        StringTable {
            strings: Arc::new(Interner::new()),
            qualified_names: Arc::new(Interner::new()),
        }
    }

    /// A table that extends this one. This table must not be used until
    /// the child is [absorbed](StringTable::absorb).
    pub fn child(&self) -> StringTable {
        StringTable {
            strings: Arc::new(Interner::with_parent(Arc::clone(&self.strings))),
            qualified_names: Arc::new(Interner::with_parent(Arc::clone(&self.qualified_names))),
        }
    }

    /// Append a child's entries to this table, keeping the child's ids.
    pub fn absorb(&self, child: StringTable) {
        for string in child.strings.all_interned_objects() {
            let expected = self.strings.next_index();
            let id = self.strings.intern(string);
            debug_assert_eq!(id, expected, "absorbed string changed id");
        }
        for name in child.qualified_names.all_interned_objects() {
            let expected = self.qualified_names.next_index();
            let id = self.qualified_names.intern(name);
            debug_assert_eq!(id, expected, "absorbed qualified name changed id");
        }
    }

    pub fn intern_string(&self, value: &str) -> u32 {
        self.strings.intern(value.to_string())
    }

    /// Intern a package name as a chain of package entries. The root
    /// package has no entry.
    pub fn intern_package(&self, package: &FqName) -> Option<u32> {
        let mut parent = None;
        for segment in package.path_segments() {
            let short_name = self.intern_string(segment.as_str());
            parent = Some(self.qualified_names.intern(QualifiedNameProto {
                short_name,
                parent,
                kind: QualifiedNameKind::Package,
            }));
        }
        parent
    }

    /// Intern a class id: package entries, then one class entry per
    /// nesting level.
    pub fn intern_class_id(&self, class_id: &ClassId) -> u32 {
        let mut parent = self.intern_package(class_id.package_fq_name());
        let mut last = None;
        for segment in class_id.relative_class_name().path_segments() {
            let short_name = self.intern_string(segment.as_str());
            let id = self.qualified_names.intern(QualifiedNameProto {
                short_name,
                parent,
                kind: QualifiedNameKind::Class,
            });
            parent = Some(id);
            last = Some(id);
        }
        match last {
            Some(id) => id,
            None => unreachable!("class ids always have a class name"),
        }
    }

    pub fn into_tables(self) -> (Vec<String>, Vec<QualifiedNameProto>) {
        (
            self.strings.all_interned_objects(),
            self.qualified_names.all_interned_objects(),
        )
    }
}

/// Accumulates classes and package members into one module.
#[derive(Default)]
pub struct DescriptorSerializer {
    table: StringTable,
    type_parameter_ids: FxHashMap<DescriptorId, u32>,
    classes: Vec<Arc<ClassProto>>,
    packages: IndexMap<(FqName, ClassId), Vec<CallableProto>>,
}

impl DescriptorSerializer {
    pub fn new() -> Self {
        DescriptorSerializer::default()
    }

    pub fn add_class(&mut self, class: &ClassDescriptor) {
        let child = self.table.child();
        let proto = {
            let mut writer = ProtoWriter {
                table: &child,
                type_parameter_ids: &mut self.type_parameter_ids,
            };
            writer.class(class)
        };
        self.table.absorb(child);
        debug!(class = %class.class_id, "serialized class");
        self.classes.push(Arc::new(proto));
    }

    pub fn add_package_function(&mut self, function: &FunctionDescriptor) {
        let proto = self.writer().function(function);
        self.package_entry(&function.containing).push(proto);
    }

    pub fn add_package_property(&mut self, property: &PropertyDescriptor) {
        let proto = self.writer().property(property);
        self.package_entry(&property.containing).push(proto);
    }

    fn writer(&mut self) -> ProtoWriter<'_> {
        ProtoWriter {
            table: &self.table,
            type_parameter_ids: &mut self.type_parameter_ids,
        }
    }

    fn package_entry(&mut self, containing: &ContainingDeclaration) -> &mut Vec<CallableProto> {
        let key = match containing {
            ContainingDeclaration::Package { fq_name, facade } => (fq_name.clone(), facade.clone()),
            other => panic!("package member with non-package container {other:?}"),
        };
        self.packages.entry(key).or_default()
    }

    pub fn finish(self, module_name: &str) -> ModuleProto {
        let mut packages = Vec::with_capacity(self.packages.len());
        for ((fq_name, facade), members) in self.packages {
            let facade = self.table.intern_class_id(&facade);
            let fq_name = match self.table.intern_package(&fq_name) {
                Some(index) => index,
                // The root package is stored as an empty-named package entry.
                None => {
                    let short_name = self.table.intern_string("");
                    self.table.qualified_names.intern(QualifiedNameProto {
                        short_name,
                        parent: None,
                        kind: QualifiedNameKind::Package,
                    })
                }
            };
            packages.push(Arc::new(PackageProto {
                fq_name,
                facade,
                members,
            }));
        }
        let (strings, qualified_names) = self.table.into_tables();
        ModuleProto {
            name: module_name.to_string(),
            strings,
            qualified_names,
            classes: self.classes,
            packages,
        }
    }
}

struct ProtoWriter<'a> {
    table: &'a StringTable,
    type_parameter_ids: &'a mut FxHashMap<DescriptorId, u32>,
}

impl ProtoWriter<'_> {
    fn class(&mut self, class: &ClassDescriptor) -> ClassProto {
        let type_parameters = self.type_parameters(&class.type_parameters);
        let scope = class.member_scope();
        let mut members: Vec<CallableProto> = scope
            .all_properties()
            .map(|property| self.property(property))
            .collect();
        members.extend(scope.all_functions().map(|function| self.function(function)));
        ClassProto {
            flags: ClassFlags::build(class.visibility, class.modality, class.kind),
            fq_name: self.table.intern_class_id(&class.class_id),
            type_parameters,
            supertypes: class.supertypes().iter().map(|ty| self.ty(ty)).collect(),
            constructors: class
                .constructors()
                .iter()
                .map(|constructor| self.constructor(constructor))
                .collect(),
            members,
            nested_class_names: Vec::new(),
        }
    }

    fn type_parameters(&mut self, parameters: &[Arc<TypeParameterDescriptor>]) -> Vec<TypeParameterProto> {
        // Register every id first so bounds may refer to later siblings.
        for parameter in parameters {
            let next = self.type_parameter_ids.len() as u32;
            self.type_parameter_ids.entry(parameter.id).or_insert(next);
        }
        parameters
            .iter()
            .map(|parameter| TypeParameterProto {
                id: self.type_parameter_ids[&parameter.id],
                name: self.table.intern_string(parameter.name.as_str()),
                variance: match parameter.variance {
                    Variance::Invariant => VarianceProto::Invariant,
                    Variance::In => VarianceProto::In,
                    Variance::Out => VarianceProto::Out,
                },
                reified: parameter.is_reified,
                upper_bounds: parameter.upper_bounds().iter().map(|bound| self.ty(bound)).collect(),
            })
            .collect()
    }

    fn function(&mut self, function: &FunctionDescriptor) -> CallableProto {
        let mut flags = CallableFlags::build(function.visibility, function.modality, CallableKind::Fun);
        flags.set(CallableFlags::IS_OPERATOR, function.is_operator);
        let type_parameters = self.type_parameters(&function.type_parameters);
        CallableProto {
            flags,
            name: self.table.intern_string(function.name.as_str()),
            type_parameters,
            receiver_type: function.extension_receiver.as_ref().map(|ty| self.ty(ty)),
            value_parameters: self.value_parameters(&function.value_parameters),
            return_type: Some(self.ty(&function.return_type)),
            getter_flags: AccessorFlags::empty(),
            setter_flags: AccessorFlags::empty(),
            setter_parameter: None,
            constant: None,
        }
    }

    fn property(&mut self, property: &PropertyDescriptor) -> CallableProto {
        let kind = if property.is_var { CallableKind::Var } else { CallableKind::Val };
        let mut flags = CallableFlags::build(property.visibility, property.modality, kind);
        flags.set(CallableFlags::HAS_GETTER, property.getter.is_some());
        flags.set(CallableFlags::HAS_SETTER, property.setter.is_some());
        flags.set(CallableFlags::IS_CONST, property.is_const);
        let constant = property.constant().map(|value| self.constant(value));
        flags.set(CallableFlags::HAS_CONSTANT, constant.is_some());

        let type_parameters = self.type_parameters(&property.type_parameters);
        let accessor_flags = |accessor: &Option<kite_types::PropertyAccessorDescriptor>| {
            accessor.as_ref().map_or(AccessorFlags::empty(), |accessor| {
                AccessorFlags::build(accessor.visibility, !accessor.is_default)
            })
        };
        let getter_flags = accessor_flags(&property.getter);
        let setter_flags = accessor_flags(&property.setter);
        let setter_parameter = property
            .setter
            .as_ref()
            .filter(|setter| !setter.is_default)
            .and_then(|setter| setter.value_parameter.as_ref())
            .map(|parameter| self.value_parameter(parameter));

        CallableProto {
            flags,
            name: self.table.intern_string(property.name.as_str()),
            type_parameters,
            receiver_type: property.extension_receiver.as_ref().map(|ty| self.ty(ty)),
            value_parameters: Vec::new(),
            return_type: Some(self.ty(&property.ty)),
            getter_flags,
            setter_flags,
            setter_parameter,
            constant,
        }
    }

    fn constructor(&mut self, constructor: &ConstructorDescriptor) -> CallableProto {
        let mut flags = CallableFlags::build(
            constructor.visibility,
            kite_types::Modality::Final,
            CallableKind::Constructor,
        );
        flags.set(CallableFlags::IS_PRIMARY, constructor.is_primary);
        CallableProto {
            flags,
            name: self.table.intern_string("<init>"),
            type_parameters: Vec::new(),
            receiver_type: None,
            value_parameters: self.value_parameters(&constructor.value_parameters),
            return_type: None,
            getter_flags: AccessorFlags::empty(),
            setter_flags: AccessorFlags::empty(),
            setter_parameter: None,
            constant: None,
        }
    }

    fn value_parameters(&mut self, parameters: &[ValueParameterDescriptor]) -> Vec<ValueParameterProto> {
        parameters.iter().map(|parameter| self.value_parameter(parameter)).collect()
    }

    fn value_parameter(&mut self, parameter: &ValueParameterDescriptor) -> ValueParameterProto {
        ValueParameterProto {
            name: self.table.intern_string(parameter.name.as_str()),
            ty: self.ty(&parameter.ty),
            declares_default: parameter.declares_default_value,
        }
    }

    fn constant(&mut self, value: &ConstantValue) -> ConstantProto {
        match value {
            ConstantValue::Int(value) => ConstantProto::Int(*value),
            ConstantValue::Boolean(value) => ConstantProto::Boolean(*value),
            ConstantValue::String(value) => ConstantProto::String(self.table.intern_string(value)),
            ConstantValue::Null => ConstantProto::Null,
        }
    }

    fn ty(&mut self, ty: &KType) -> TypeProto {
        match ty {
            KType::Class(class) => {
                let arguments = class
                    .arguments
                    .iter()
                    .map(|argument| match argument {
                        TypeProjection::Star => TypeArgumentProto {
                            projection: ProjectionProto::Star,
                            ty: None,
                        },
                        TypeProjection::Type { projection, ty } => TypeArgumentProto {
                            projection: match projection {
                                Variance::Invariant => ProjectionProto::Invariant,
                                Variance::In => ProjectionProto::In,
                                Variance::Out => ProjectionProto::Out,
                            },
                            ty: Some(self.ty(ty)),
                        },
                    })
                    .collect();
                TypeProto::class(
                    self.table.intern_class_id(&class.class.class_id),
                    arguments,
                    class.nullable,
                )
            }
            KType::TypeParameter(parameter) => {
                let next = self.type_parameter_ids.len() as u32;
                let id = *self
                    .type_parameter_ids
                    .entry(parameter.parameter.id)
                    .or_insert(next);
                TypeProto::type_parameter(id, parameter.nullable)
            }
            KType::Flexible(flexible) => {
                let mut lower = self.ty(&flexible.lower);
                lower.flexible_type_capabilities_id =
                    Some(self.table.intern_string(&flexible.capabilities.id));
                lower.flexible_upper_bound = Some(Box::new(self.ty(&flexible.upper)));
                lower
            }
            KType::Error(message) => {
                warn!(%message, "serializing an error type as Any?");
                TypeProto::class(
                    self.table.intern_class_id(&kite_types::standard_class_ids::any()),
                    Vec::new(),
                    true,
                )
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/serializer_tests.rs"]
mod serializer_tests;
