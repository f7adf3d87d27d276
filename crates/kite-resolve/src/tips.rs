//! Completion: what names can follow a reference.
//!
//! [`TipsManager`] answers from an analyzed script's binding trace. With an
//! explicit receiver the variants are the receiver type's members plus the
//! extensions in scope that accept it; a package receiver offers its
//! members and subpackages. Without one, the variants are everything the
//! lexical scope declares plus the members of every implicit receiver.
//! Private declarations are never offered.

use crate::members;
use crate::scope::{LexicalScope, ReceiverParameter};
use crate::trace::BindingTrace;
use kite_metadata::DescriptorFinder;
use kite_syntax::{NodeIndex, NodeKind, ParsedScript};
use kite_types::{
    BuiltIns, ConstraintPosition, ConstraintSystem, DeclarationDescriptor, FqName, KType, Name,
    TypeParameterDescriptor, Visibility,
};
use rustc_hash::FxHashSet;
use std::rc::Rc;
use std::sync::Arc;
use tracing::debug;

/// Where completion was requested.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompletionTarget {
    /// A name or `receiver.name` expression; `prefix` is what is typed so far.
    Reference { node: NodeIndex, prefix: String },
    /// The last segment of an import directive.
    Import { package: FqName, prefix: String },
}

impl CompletionTarget {
    pub fn prefix(&self) -> &str {
        match self {
            CompletionTarget::Reference { prefix, .. } | CompletionTarget::Import { prefix, .. } => prefix,
        }
    }
}

/// Find the reference or import segment ending at `offset`.
pub fn completion_target(script: &ParsedScript, offset: u32) -> Option<CompletionTarget> {
    let arena = &script.arena;
    for &import in script.imports() {
        if arena.span(import).end != offset {
            continue;
        }
        if let NodeKind::Import { path, all_under: false } = arena.kind(import) {
            let (prefix, package) = path.split_last()?;
            return Some(CompletionTarget::Import {
                package: FqName::from_segments(package.iter().map(String::as_str)),
                prefix: prefix.clone(),
            });
        }
    }
    let mut found = None;
    for index in 0..arena.len() as u32 {
        let node = NodeIndex(index);
        let (end, prefix) = match arena.kind(node) {
            NodeKind::Name(name) => (arena.span(node).end, name),
            NodeKind::Dot { name, name_span, .. } => (name_span.end, name),
            _ => continue,
        };
        if end == offset {
            found = Some(CompletionTarget::Reference {
                node,
                prefix: prefix.clone(),
            });
        }
    }
    found
}

pub struct TipsManager<'a> {
    trace: &'a BindingTrace,
    script: &'a ParsedScript,
    finder: &'a DescriptorFinder,
    builtins: &'a BuiltIns,
}

impl<'a> TipsManager<'a> {
    pub fn new(
        trace: &'a BindingTrace,
        script: &'a ParsedScript,
        finder: &'a DescriptorFinder,
        builtins: &'a BuiltIns,
    ) -> Self {
        TipsManager {
            trace,
            script,
            finder,
            builtins,
        }
    }

    /// Everything that could stand at `node`, a name or `receiver.name`.
    pub fn reference_variants(&self, node: NodeIndex) -> Vec<DeclarationDescriptor> {
        let Some(scope) = self.trace.resolution_scope(node) else {
            return Vec::new();
        };
        let receiver = match self.script.arena.kind(node) {
            NodeKind::Dot { receiver, .. } => Some(*receiver),
            NodeKind::Call { receiver, .. } if receiver.is_some() => Some(*receiver),
            _ => None,
        };
        let variants = match receiver {
            Some(receiver) => self.receiver_variants(&scope, receiver),
            None => self.scope_variants(&scope),
        };
        debug!(node = node.0, variants = variants.len(), "reference variants");
        distinct(variants)
    }

    /// Packages that can follow `package.` in an import directive. Only
    /// packages are offered, never their members.
    pub fn import_variants(&self, package: &FqName) -> Vec<DeclarationDescriptor> {
        let variants = self
            .finder
            .subpackages(package)
            .into_iter()
            .map(DeclarationDescriptor::Package)
            .collect();
        distinct(variants)
    }

    /// Variants for `target`, filtered by the typed prefix and sorted.
    pub fn complete(&self, target: &CompletionTarget) -> Vec<DeclarationDescriptor> {
        let variants = match target {
            CompletionTarget::Reference { node, .. } => self.reference_variants(*node),
            CompletionTarget::Import { package, .. } => self.import_variants(package),
        };
        let prefix = target.prefix();
        let mut matching: Vec<DeclarationDescriptor> = variants
            .into_iter()
            .filter(|variant| variant.name().as_str().starts_with(prefix))
            .collect();
        matching.sort_by(|a, b| a.name().as_str().cmp(b.name().as_str()));
        matching
    }

    fn receiver_variants(&self, scope: &Rc<LexicalScope>, receiver: NodeIndex) -> Vec<DeclarationDescriptor> {
        if let Some(DeclarationDescriptor::Package(package)) = self.trace.reference(receiver) {
            let mut variants = self.package_members(&package);
            variants.extend(self.finder.subpackages(&package).into_iter().map(DeclarationDescriptor::Package));
            return variants;
        }
        let Some(receiver_type) = self.trace.expression_type(receiver) else {
            return Vec::new();
        };
        if receiver_type.is_error() {
            return Vec::new();
        }
        let mut variants: Vec<DeclarationDescriptor> = members::all_members(&receiver_type, self.builtins)
            .into_iter()
            .filter(|descriptor| !is_private(descriptor))
            .collect();
        variants.extend(
            scope
                .all_descriptors()
                .into_iter()
                .filter(|descriptor| !is_private(descriptor))
                .filter(|descriptor| self.accepts_receiver(descriptor, &receiver_type)),
        );
        variants
    }

    fn scope_variants(&self, scope: &Rc<LexicalScope>) -> Vec<DeclarationDescriptor> {
        let receivers: Vec<ReceiverParameter> = scope.implicit_receivers();
        let mut variants: Vec<DeclarationDescriptor> = scope
            .all_descriptors()
            .into_iter()
            .filter(|descriptor| !is_private(descriptor))
            .filter(|descriptor| !matches!(descriptor, DeclarationDescriptor::Package(package) if package.is_root()))
            .filter(|descriptor| {
                extension_receiver(descriptor).is_none()
                    || receivers.iter().any(|receiver| self.accepts_receiver(descriptor, &receiver.ty))
            })
            .collect();
        for receiver in &receivers {
            variants.extend(
                members::all_members(&receiver.ty, self.builtins)
                    .into_iter()
                    .filter(|descriptor| !is_private(descriptor)),
            );
        }
        variants
    }

    /// Non-extension top-level members of `package`.
    fn package_members(&self, package: &FqName) -> Vec<DeclarationDescriptor> {
        let Some(fragment) = self.finder.find_package_members(package) else {
            return Vec::new();
        };
        fragment
            .scope
            .all_descriptors()
            .into_iter()
            .filter(|descriptor| !is_private(descriptor) && extension_receiver(descriptor).is_none())
            .collect()
    }

    /// Whether `descriptor` is an extension callable on `receiver`: the
    /// constraint `receiver <: declared receiver` must be solvable for its
    /// type parameters.
    fn accepts_receiver(&self, descriptor: &DeclarationDescriptor, receiver: &KType) -> bool {
        let Some((declared, type_parameters)) = extension_receiver(descriptor) else {
            return false;
        };
        let mut system = ConstraintSystem::new(self.builtins);
        system.register_type_variables(type_parameters);
        system.add_subtype_constraint(receiver, declared, ConstraintPosition::ReceiverPosition);
        let (status, _) = system.solve();
        !status.has_contradiction && !status.has_violated_bounds
    }
}

fn extension_receiver(descriptor: &DeclarationDescriptor) -> Option<(&KType, &[Arc<TypeParameterDescriptor>])> {
    match descriptor {
        DeclarationDescriptor::Function(function) => function
            .extension_receiver
            .as_ref()
            .map(|receiver| (receiver, function.type_parameters.as_slice())),
        DeclarationDescriptor::Property(property) => property
            .extension_receiver
            .as_ref()
            .map(|receiver| (receiver, property.type_parameters.as_slice())),
        _ => None,
    }
}

fn is_private(descriptor: &DeclarationDescriptor) -> bool {
    let visibility = match descriptor {
        DeclarationDescriptor::Function(function) => function.visibility,
        DeclarationDescriptor::Property(property) => property.visibility,
        DeclarationDescriptor::Constructor(constructor) => constructor.visibility,
        DeclarationDescriptor::Class(class) => class.visibility,
        _ => return false,
    };
    visibility == Visibility::Private
}

/// Drop later variants that an earlier one shadows: same name and kind,
/// and for functions the same arity.
fn distinct(variants: Vec<DeclarationDescriptor>) -> Vec<DeclarationDescriptor> {
    let mut seen: FxHashSet<(Name, u8, usize)> = FxHashSet::default();
    variants
        .into_iter()
        .filter(|descriptor| {
            let key = match descriptor {
                DeclarationDescriptor::Package(_) => (0, 0),
                DeclarationDescriptor::Class(_) => (1, 0),
                DeclarationDescriptor::Function(function) => (2, function.value_parameters.len()),
                DeclarationDescriptor::Property(_) | DeclarationDescriptor::Variable(_) => (3, 0),
                DeclarationDescriptor::Constructor(constructor) => (4, constructor.value_parameters.len()),
                DeclarationDescriptor::TypeParameter(_) => (5, 0),
            };
            seen.insert((descriptor.name(), key.0, key.1))
        })
        .collect()
}

#[cfg(test)]
#[path = "../tests/tips_tests.rs"]
mod tips_tests;
