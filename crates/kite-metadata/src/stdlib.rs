//! The standard library module.
//!
//! Declarations are written as compact signatures (`"Comparable<T>"`,
//! `"String?"`, `"String!"`) and turned into proto records through the
//! same [`StringTable`] the serializer uses. Implementations live in the
//! VM as natives keyed by owner class and member name.

use crate::context::PLATFORM_CAPABILITIES_ID;
use crate::finder::{DescriptorFinder, ModuleClassDataSource};
use crate::flags::{AccessorFlags, CallableFlags, CallableKind, ClassFlags};
use crate::proto::*;
use crate::serializer::StringTable;
use kite_types::{ClassId, ClassKind, FqName, Modality, Visibility, standard_class_ids};
use rustc_hash::FxHashMap;
use std::sync::Arc;

pub const STDLIB_MODULE_NAME: &str = "kite-stdlib";

/// Packages imported into every script.
pub const DEFAULT_IMPORTS: &[&str] = &["kite", "kite.io", "kite.collections"];

/// Facade classes holding the top-level members of each stdlib package.
pub mod facades {
    use kite_types::ClassId;

    pub fn kite() -> ClassId {
        ClassId::from_string("kite/StandardKt")
    }
    pub fn io() -> ClassId {
        ClassId::from_string("kite/io/ConsoleKt")
    }
    pub fn collections() -> ClassId {
        ClassId::from_string("kite/collections/CollectionsKt")
    }
}

pub fn box_class_id() -> ClassId {
    ClassId::from_string("kite/collections/Box")
}

/// Build the standard library module.
pub fn stdlib_module() -> ModuleProto {
    let mut b = StdlibBuilder::new();
    let t = || vec![("T", VarianceProto::Invariant, vec![])];

    b.class(standard_class_ids::any(), ClassKind::Class, Modality::Open, vec![], &[], vec![
        constructor(&[]),
        fun("toString", &[], "String").open(),
        fun("hashCode", &[], "Int").open(),
    ]);
    b.class(standard_class_ids::nothing(), ClassKind::Class, Modality::Final, vec![], &[], vec![]);
    b.class(standard_class_ids::unit(), ClassKind::Object, Modality::Final, vec![], &["Any"], vec![]);
    b.class(
        standard_class_ids::comparable(),
        ClassKind::Interface,
        Modality::Abstract,
        vec![("T", VarianceProto::In, vec![])],
        &["Any"],
        vec![fun("compareTo", &[("other", "T")], "Int").operator().abstract_member()],
    );
    b.class(standard_class_ids::int(), ClassKind::Class, Modality::Final, vec![], &["Any", "Comparable<Int>"], vec![
        fun("plus", &[("other", "Int")], "Int").operator(),
        fun("minus", &[("other", "Int")], "Int").operator(),
        fun("times", &[("other", "Int")], "Int").operator(),
        fun("div", &[("other", "Int")], "Int").operator(),
        fun("rem", &[("other", "Int")], "Int").operator(),
        fun("compareTo", &[("other", "Int")], "Int").operator(),
        fun("unaryMinus", &[], "Int").operator(),
    ]);
    b.class(standard_class_ids::boolean(), ClassKind::Class, Modality::Final, vec![], &["Any"], vec![
        fun("not", &[], "Boolean").operator(),
    ]);
    b.class(standard_class_ids::string(), ClassKind::Class, Modality::Final, vec![], &["Any", "Comparable<String>"], vec![
        fun("plus", &[("other", "Any?")], "String").operator(),
        fun("compareTo", &[("other", "String")], "Int").operator(),
        val("length", "Int"),
    ]);
    b.class(standard_class_ids::throwable(), ClassKind::Class, Modality::Open, vec![], &["Any"], vec![
        constructor(&[("message", "String?")]),
        val("message", "String?"),
    ]);
    for (class_id, supertype) in [
        (standard_class_ids::exception(), "Throwable"),
        (standard_class_ids::arithmetic_exception(), "Exception"),
        (standard_class_ids::illegal_state_exception(), "Exception"),
    ] {
        b.class(class_id, ClassKind::Class, Modality::Open, vec![], &[supertype], vec![constructor(&[("message", "String?")])]);
    }
    b.class(box_class_id(), ClassKind::Class, Modality::Final, t(), &["Any"], vec![
        constructor(&[("value", "T")]),
        var("value", "T"),
    ]);

    b.package("kite", facades::kite(), vec![
        fun("identity", &[("value", "T")], "T").generic("T", &[]),
        fun("maxOf", &[("a", "T"), ("b", "T")], "T").generic("T", &["Comparable<T>"]),
        fun("error", &[("message", "Any")], "Nothing"),
        fun("squared", &[], "Int").extension("Int"),
        val("lastIndex", "Int").extension("String"),
        val("MAX_INT", "Int").constant(ConstantSpec::Int(i32::MAX)),
    ]);
    b.package("kite.io", facades::io(), vec![
        fun("println", &[("message", "Any?")], "Unit"),
        fun("println", &[], "Unit"),
        fun("print", &[("message", "Any?")], "Unit"),
        fun("readLine", &[], "String!"),
    ]);
    b.package("kite.collections", facades::collections(), vec![
        fun("boxOf", &[("value", "T")], "Box<T>").generic("T", &[]),
    ]);

    b.finish()
}

/// A finder over the standard library alone.
pub fn stdlib_finder() -> Arc<DescriptorFinder> {
    let mut source = ModuleClassDataSource::new();
    match source.add_module(stdlib_module()) {
        Ok(()) => {}
        Err(err) => panic!("standard library module is malformed: {err}"),
    }
    DescriptorFinder::new(source)
}

#[derive(Clone, Copy)]
enum ConstantSpec {
    Int(i32),
}

struct MemberSpec {
    kind: CallableKind,
    name: &'static str,
    modality: Modality,
    type_parameters: Vec<(&'static str, VarianceProto, Vec<&'static str>)>,
    receiver: Option<&'static str>,
    parameters: Vec<(&'static str, &'static str)>,
    ty: &'static str,
    operator: bool,
    constant: Option<ConstantSpec>,
}

fn member(kind: CallableKind, name: &'static str, parameters: &[(&'static str, &'static str)], ty: &'static str) -> MemberSpec {
    MemberSpec {
        kind,
        name,
        modality: Modality::Final,
        type_parameters: Vec::new(),
        receiver: None,
        parameters: parameters.to_vec(),
        ty,
        operator: false,
        constant: None,
    }
}

fn fun(name: &'static str, parameters: &[(&'static str, &'static str)], returns: &'static str) -> MemberSpec {
    member(CallableKind::Fun, name, parameters, returns)
}

fn val(name: &'static str, ty: &'static str) -> MemberSpec {
    member(CallableKind::Val, name, &[], ty)
}

fn var(name: &'static str, ty: &'static str) -> MemberSpec {
    member(CallableKind::Var, name, &[], ty)
}

fn constructor(parameters: &[(&'static str, &'static str)]) -> MemberSpec {
    member(CallableKind::Constructor, "<init>", parameters, "")
}

impl MemberSpec {
    fn operator(mut self) -> Self {
        self.operator = true;
        self
    }

    fn open(mut self) -> Self {
        self.modality = Modality::Open;
        self
    }

    fn abstract_member(mut self) -> Self {
        self.modality = Modality::Abstract;
        self
    }

    fn generic(mut self, name: &'static str, bounds: &[&'static str]) -> Self {
        self.type_parameters.push((name, VarianceProto::Invariant, bounds.to_vec()));
        self
    }

    fn extension(mut self, receiver: &'static str) -> Self {
        self.receiver = Some(receiver);
        self
    }

    fn constant(mut self, constant: ConstantSpec) -> Self {
        self.constant = Some(constant);
        self
    }
}

struct StdlibBuilder {
    table: StringTable,
    known_classes: FxHashMap<String, ClassId>,
    type_parameter_scope: Vec<(&'static str, u32)>,
    next_type_parameter_id: u32,
    classes: Vec<Arc<ClassProto>>,
    packages: Vec<Arc<PackageProto>>,
}

impl StdlibBuilder {
    fn new() -> Self {
        let mut known_classes = FxHashMap::default();
        for class_id in [
            standard_class_ids::any(),
            standard_class_ids::nothing(),
            standard_class_ids::unit(),
            standard_class_ids::int(),
            standard_class_ids::boolean(),
            standard_class_ids::string(),
            standard_class_ids::comparable(),
            standard_class_ids::throwable(),
            standard_class_ids::exception(),
            standard_class_ids::arithmetic_exception(),
            standard_class_ids::illegal_state_exception(),
            box_class_id(),
        ] {
            known_classes.insert(class_id.short_class_name().as_str().to_string(), class_id);
        }
        StdlibBuilder {
            table: StringTable::new(),
            known_classes,
            type_parameter_scope: Vec::new(),
            next_type_parameter_id: 0,
            classes: Vec::new(),
            packages: Vec::new(),
        }
    }

    fn class(
        &mut self,
        class_id: ClassId,
        kind: ClassKind,
        modality: Modality,
        type_parameters: Vec<(&'static str, VarianceProto, Vec<&'static str>)>,
        supertypes: &[&str],
        members: Vec<MemberSpec>,
    ) {
        let scope_depth = self.type_parameter_scope.len();
        let type_parameters = self.type_parameters(type_parameters);
        let supertypes = supertypes.iter().map(|ty| self.ty(ty)).collect();
        let (constructors, members): (Vec<_>, Vec<_>) = members
            .into_iter()
            .partition(|member| member.kind == CallableKind::Constructor);
        let constructors = constructors
            .into_iter()
            .map(|constructor| self.callable(constructor))
            .collect();
        let members = members.into_iter().map(|member| self.callable(member)).collect();
        self.type_parameter_scope.truncate(scope_depth);
        self.classes.push(Arc::new(ClassProto {
            flags: ClassFlags::build(Visibility::Public, modality, kind),
            fq_name: self.table.intern_class_id(&class_id),
            type_parameters,
            supertypes,
            constructors,
            members,
            nested_class_names: Vec::new(),
        }));
    }

    fn package(&mut self, package: &str, facade: ClassId, members: Vec<MemberSpec>) {
        let members = members.into_iter().map(|member| self.callable(member)).collect();
        let fq_name = match self.table.intern_package(&FqName::parse(package)) {
            Some(index) => index,
            None => unreachable!("stdlib packages are never the root package"),
        };
        self.packages.push(Arc::new(PackageProto {
            fq_name,
            facade: self.table.intern_class_id(&facade),
            members,
        }));
    }

    fn callable(&mut self, spec: MemberSpec) -> CallableProto {
        let scope_depth = self.type_parameter_scope.len();
        let type_parameters = self.type_parameters(spec.type_parameters);
        let mut flags = CallableFlags::build(Visibility::Public, spec.modality, spec.kind);
        flags.set(CallableFlags::IS_OPERATOR, spec.operator);
        let is_property = matches!(spec.kind, CallableKind::Val | CallableKind::Var);
        flags.set(CallableFlags::HAS_GETTER, is_property);
        flags.set(CallableFlags::HAS_SETTER, spec.kind == CallableKind::Var);
        flags.set(CallableFlags::IS_PRIMARY, spec.kind == CallableKind::Constructor);
        flags.set(CallableFlags::HAS_CONSTANT, spec.constant.is_some());
        flags.set(CallableFlags::IS_CONST, spec.constant.is_some());

        let accessor_flags = if is_property {
            AccessorFlags::build(Visibility::Public, false)
        } else {
            AccessorFlags::empty()
        };
        let proto = CallableProto {
            flags,
            name: self.table.intern_string(spec.name),
            type_parameters,
            receiver_type: spec.receiver.map(|receiver| self.ty(receiver)),
            value_parameters: spec
                .parameters
                .iter()
                .map(|(name, ty)| ValueParameterProto {
                    name: self.table.intern_string(name),
                    ty: self.ty(ty),
                    declares_default: false,
                })
                .collect(),
            return_type: (spec.kind != CallableKind::Constructor).then(|| self.ty(spec.ty)),
            getter_flags: accessor_flags,
            setter_flags: if spec.kind == CallableKind::Var { accessor_flags } else { AccessorFlags::empty() },
            setter_parameter: None,
            constant: spec.constant.map(|ConstantSpec::Int(value)| ConstantProto::Int(value)),
        };
        self.type_parameter_scope.truncate(scope_depth);
        proto
    }

    fn type_parameters(
        &mut self,
        specs: Vec<(&'static str, VarianceProto, Vec<&'static str>)>,
    ) -> Vec<TypeParameterProto> {
        // All names enter scope before any bound is parsed.
        let ids: Vec<u32> = specs
            .iter()
            .map(|&(name, _, _)| {
                let id = self.next_type_parameter_id;
                self.next_type_parameter_id += 1;
                self.type_parameter_scope.push((name, id));
                id
            })
            .collect();
        specs
            .into_iter()
            .zip(ids)
            .map(|((name, variance, bounds), id)| TypeParameterProto {
                id,
                name: self.table.intern_string(name),
                variance,
                reified: false,
                upper_bounds: bounds.iter().map(|bound| self.ty(bound)).collect(),
            })
            .collect()
    }

    /// Parse a signature type: `Name`, `Name<Args>`, `Name?`, `Name!`.
    fn ty(&mut self, text: &str) -> TypeProto {
        let text = text.trim();
        if let Some(lower) = text.strip_suffix('!') {
            let mut flexible = self.ty(lower);
            let mut upper = flexible.clone();
            upper.nullable = true;
            flexible.flexible_type_capabilities_id = Some(self.table.intern_string(PLATFORM_CAPABILITIES_ID));
            flexible.flexible_upper_bound = Some(Box::new(upper));
            return flexible;
        }
        let (text, nullable) = match text.strip_suffix('?') {
            Some(inner) => (inner, true),
            None => (text, false),
        };
        let (name, arguments) = match text.find('<') {
            Some(open) => (&text[..open], split_arguments(&text[open + 1..text.len() - 1])),
            None => (text, Vec::new()),
        };
        if let Some(&(_, id)) = self.type_parameter_scope.iter().rev().find(|(n, _)| *n == name) {
            return TypeProto::type_parameter(id, nullable);
        }
        let class_id = match self.known_classes.get(name) {
            Some(class_id) => class_id.clone(),
            None => unreachable!("unknown class {name} in stdlib signature"),
        };
        let arguments = arguments
            .into_iter()
            .map(|argument| {
                if argument == "*" {
                    TypeArgumentProto { projection: ProjectionProto::Star, ty: None }
                } else {
                    TypeArgumentProto { projection: ProjectionProto::Invariant, ty: Some(self.ty(argument)) }
                }
            })
            .collect();
        TypeProto::class(self.table.intern_class_id(&class_id), arguments, nullable)
    }

    fn finish(self) -> ModuleProto {
        let (strings, qualified_names) = self.table.into_tables();
        ModuleProto {
            name: STDLIB_MODULE_NAME.to_string(),
            strings,
            qualified_names,
            classes: self.classes,
            packages: self.packages,
        }
    }
}

/// Split a comma-separated argument list at nesting depth zero.
fn split_arguments(text: &str) -> Vec<&str> {
    let mut arguments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (index, ch) in text.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth -= 1,
            ',' if depth == 0 => {
                arguments.push(text[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
    }
    arguments.push(text[start..].trim());
    arguments
}

#[cfg(test)]
#[path = "../tests/stdlib_tests.rs"]
mod stdlib_tests;
