//! A small hand-built class hierarchy for type-system tests.

use crate::builtins::BuiltIns;
use crate::descriptors::*;
use crate::names::{ClassId, FqName, Name};
use crate::scope::MemberScope;
use crate::types::{KType, TypeProjection};
use kite_common::LazyValue;
use std::sync::Arc;

pub(crate) struct Fixture {
    pub builtins: BuiltIns,
    pub comparable: Arc<ClassDescriptor>,
    /// `Box<out T>`
    pub boxed: Arc<ClassDescriptor>,
    /// `Cell<T>`, invariant
    pub cell: Arc<ClassDescriptor>,
    pub exception: Arc<ClassDescriptor>,
}

pub(crate) fn class_id(name: &str) -> ClassId {
    ClassId::new(FqName::parse("kite"), FqName::parse(name))
}

pub(crate) fn type_parameter(name: &str, variance: Variance, bounds: Vec<KType>) -> Arc<TypeParameterDescriptor> {
    Arc::new(TypeParameterDescriptor::new(
        Name::identifier(name),
        0,
        variance,
        false,
        ContainingDeclaration::Class(class_id("Fixture")),
        LazyValue::ready(bounds),
    ))
}

pub(crate) fn shell(name: &str, type_parameters: Vec<Arc<TypeParameterDescriptor>>) -> Arc<ClassDescriptor> {
    Arc::new(ClassDescriptor::new(
        class_id(name),
        ClassKind::Class,
        Visibility::Public,
        Modality::Open,
        type_parameters,
    ))
}

pub(crate) fn finish(class: &Arc<ClassDescriptor>, supertypes: Vec<KType>) {
    class.initialize(Box::new(EagerClassContents {
        supertypes,
        scope: MemberScope::new(),
        constructors: Vec::new(),
    }));
}

pub(crate) fn arg(ty: KType) -> TypeProjection {
    TypeProjection::invariant(ty)
}

impl Fixture {
    pub(crate) fn new() -> Self {
        let any = shell("Any", Vec::new());
        let nothing = shell("Nothing", Vec::new());
        let unit = shell("Unit", Vec::new());
        let int = shell("Int", Vec::new());
        let boolean = shell("Boolean", Vec::new());
        let string = shell("String", Vec::new());
        let throwable = shell("Throwable", Vec::new());
        let exception = shell("Exception", Vec::new());
        let comparable = shell("Comparable", vec![type_parameter("T", Variance::In, Vec::new())]);
        let boxed = shell("Box", vec![type_parameter("T", Variance::Out, Vec::new())]);
        let cell = shell("Cell", vec![type_parameter("T", Variance::Invariant, Vec::new())]);

        let any_type = KType::simple_class(&any);
        finish(&any, Vec::new());
        finish(&nothing, Vec::new());
        finish(&unit, vec![any_type.clone()]);
        finish(&boolean, vec![any_type.clone()]);
        finish(&throwable, vec![any_type.clone()]);
        finish(&exception, vec![KType::simple_class(&throwable)]);
        finish(&comparable, vec![any_type.clone()]);
        finish(&boxed, vec![any_type.clone()]);
        finish(&cell, vec![any_type.clone()]);
        finish(
            &int,
            vec![KType::class(&comparable, vec![arg(KType::simple_class(&int))], false), any_type.clone()],
        );
        finish(
            &string,
            vec![KType::class(&comparable, vec![arg(KType::simple_class(&string))], false), any_type],
        );

        Fixture {
            builtins: BuiltIns {
                any,
                nothing,
                unit,
                int,
                boolean,
                string,
                throwable,
            },
            comparable,
            boxed,
            cell,
            exception,
        }
    }

    pub(crate) fn int(&self) -> KType {
        self.builtins.int_type()
    }

    pub(crate) fn string(&self) -> KType {
        self.builtins.string_type()
    }

    pub(crate) fn comparable_of(&self, ty: KType) -> KType {
        KType::class(&self.comparable, vec![arg(ty)], false)
    }

    pub(crate) fn box_of(&self, ty: KType) -> KType {
        KType::class(&self.boxed, vec![arg(ty)], false)
    }

    pub(crate) fn cell_of(&self, ty: KType) -> KType {
        KType::class(&self.cell, vec![arg(ty)], false)
    }
}
