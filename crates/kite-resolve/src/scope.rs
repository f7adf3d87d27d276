//! Lexical scopes.
//!
//! Scopes form a parent-linked chain from the innermost block out to the
//! root, which knows the top-level package names. Lookup walks the chain
//! innermost first; the first scope that declares a name wins. A receiver
//! scope contributes the members of an implicit receiver, which is how a
//! REPL line sees the declarations of earlier lines.

use crate::members::{self, Member};
use indexmap::IndexMap;
use kite_metadata::DescriptorFinder;
use kite_types::{
    BuiltIns, ClassDescriptor, ConstructorDescriptor, DeclarationDescriptor, FqName,
    FunctionDescriptor, KType, LocalVariableDescriptor, MemberScope, Name, PropertyDescriptor,
    TypeParameterDescriptor, equal_types,
};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// An implicit receiver: the value `this` would denote.
#[derive(Clone, Debug)]
pub struct ReceiverParameter {
    pub class: Arc<ClassDescriptor>,
    pub ty: KType,
}

#[derive(Clone)]
pub enum ScopeKind {
    /// Top-level package names.
    Root { finder: Arc<DescriptorFinder> },
    /// Declarations brought in by import directives.
    Importing,
    /// Top-level declarations of the script being analyzed.
    Script,
    /// Members of an implicit receiver.
    Receiver(ReceiverParameter),
    /// A function body. `return` targets the nearest one.
    Function { name: Name, return_type: Option<KType> },
    Block,
}

impl fmt::Debug for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKind::Root { .. } => f.write_str("Root"),
            ScopeKind::Importing => f.write_str("Importing"),
            ScopeKind::Script => f.write_str("Script"),
            ScopeKind::Receiver(receiver) => write!(f, "Receiver({})", receiver.ty),
            ScopeKind::Function { name, .. } => write!(f, "Function({name})"),
            ScopeKind::Block => f.write_str("Block"),
        }
    }
}

#[derive(Default)]
struct ScopeMembers {
    variables: IndexMap<Name, Arc<LocalVariableDescriptor>>,
    properties: IndexMap<Name, Vec<Arc<PropertyDescriptor>>>,
    functions: IndexMap<Name, Vec<Arc<FunctionDescriptor>>>,
    classes: IndexMap<Name, Arc<ClassDescriptor>>,
    type_parameters: IndexMap<Name, Arc<TypeParameterDescriptor>>,
}

/// Functions and constructors declared at one scope level.
#[derive(Clone, Debug, Default)]
pub struct CandidateLevel {
    pub functions: Vec<Member<FunctionDescriptor>>,
    pub constructors: Vec<(Arc<ConstructorDescriptor>, Arc<ClassDescriptor>)>,
    /// Set when the functions are members of an implicit receiver.
    pub receiver: Option<ReceiverParameter>,
}

impl CandidateLevel {
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.constructors.is_empty()
    }
}

/// What a simple name denotes as a value.
#[derive(Clone, Debug)]
pub enum VariableLookup {
    Local(Arc<LocalVariableDescriptor>),
    Property {
        property: Member<PropertyDescriptor>,
        receiver: Option<ReceiverParameter>,
    },
}

/// Error returned when a name is already declared in the same scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redeclaration(pub Name);

pub struct LexicalScope {
    parent: Option<Rc<LexicalScope>>,
    kind: ScopeKind,
    debug_name: String,
    members: RefCell<ScopeMembers>,
}

impl LexicalScope {
    pub fn root(finder: Arc<DescriptorFinder>) -> Rc<Self> {
        Rc::new(LexicalScope {
            parent: None,
            kind: ScopeKind::Root { finder },
            debug_name: "<root>".to_string(),
            members: RefCell::default(),
        })
    }

    pub fn new(parent: &Rc<LexicalScope>, kind: ScopeKind, debug_name: impl Into<String>) -> Rc<Self> {
        Rc::new(LexicalScope {
            parent: Some(Rc::clone(parent)),
            kind,
            debug_name: debug_name.into(),
            members: RefCell::default(),
        })
    }

    /// An importing scope holding everything declared in `scope`.
    pub fn importing(parent: &Rc<LexicalScope>, scope: &MemberScope, debug_name: impl Into<String>) -> Rc<Self> {
        let importing = LexicalScope::new(parent, ScopeKind::Importing, debug_name);
        importing.import_all(scope);
        importing
    }

    pub fn receiver(parent: &Rc<LexicalScope>, receiver: ReceiverParameter) -> Rc<Self> {
        let name = format!("receiver {}", receiver.ty);
        LexicalScope::new(parent, ScopeKind::Receiver(receiver), name)
    }

    pub fn parent(&self) -> Option<&Rc<LexicalScope>> {
        self.parent.as_ref()
    }

    pub fn kind(&self) -> &ScopeKind {
        &self.kind
    }

    pub fn debug_name(&self) -> &str {
        &self.debug_name
    }

    /// This scope followed by its ancestors.
    pub fn chain(self: &Rc<Self>) -> impl Iterator<Item = &LexicalScope> {
        std::iter::successors(Some(self.as_ref()), |scope| scope.parent.as_deref())
    }

    fn finder(&self) -> Option<&Arc<DescriptorFinder>> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let ScopeKind::Root { finder } = &current.kind {
                return Some(finder);
            }
            scope = current.parent.as_deref();
        }
        None
    }

    // -------------------------------------------------------------------
    // Declaring
    // -------------------------------------------------------------------

    pub fn add_variable(&self, variable: Arc<LocalVariableDescriptor>) -> Result<(), Redeclaration> {
        let mut members = self.members.borrow_mut();
        if members.variables.contains_key(&variable.name) || members.properties.contains_key(&variable.name) {
            return Err(Redeclaration(variable.name.clone()));
        }
        members.variables.insert(variable.name.clone(), variable);
        Ok(())
    }

    pub fn add_property(&self, property: Arc<PropertyDescriptor>) -> Result<(), Redeclaration> {
        let mut members = self.members.borrow_mut();
        let conflicts = members.variables.contains_key(&property.name)
            || members.properties.get(&property.name).is_some_and(|existing| {
                existing
                    .iter()
                    .any(|other| same_receiver(&other.extension_receiver, &property.extension_receiver))
            });
        if conflicts {
            return Err(Redeclaration(property.name.clone()));
        }
        members.properties.entry(property.name.clone()).or_default().push(property);
        Ok(())
    }

    /// Declare a function. Overloads are allowed; a second function with
    /// the same receiver and parameter types is a redeclaration.
    pub fn add_function(&self, function: Arc<FunctionDescriptor>) -> Result<(), Redeclaration> {
        let mut members = self.members.borrow_mut();
        let overloads = members.functions.entry(function.name.clone()).or_default();
        if overloads.iter().any(|other| same_signature(other, &function)) {
            return Err(Redeclaration(function.name.clone()));
        }
        overloads.push(function);
        Ok(())
    }

    pub fn add_class(&self, class: Arc<ClassDescriptor>) {
        self.members.borrow_mut().classes.insert(class.name(), class);
    }

    pub fn add_type_parameter(&self, parameter: Arc<TypeParameterDescriptor>) -> Result<(), Redeclaration> {
        let mut members = self.members.borrow_mut();
        if members.type_parameters.contains_key(&parameter.name) {
            return Err(Redeclaration(parameter.name.clone()));
        }
        members.type_parameters.insert(parameter.name.clone(), parameter);
        Ok(())
    }

    /// Copy every member of `scope` in, without redeclaration checks.
    pub fn import_all(&self, scope: &MemberScope) {
        let mut members = self.members.borrow_mut();
        for function in scope.all_functions() {
            members.functions.entry(function.name.clone()).or_default().push(Arc::clone(function));
        }
        for property in scope.all_properties() {
            members.properties.entry(property.name.clone()).or_default().push(Arc::clone(property));
        }
        for descriptor in scope.all_descriptors() {
            if let DeclarationDescriptor::Class(class) = descriptor {
                members.classes.insert(class.name(), class);
            }
        }
    }

    /// Import one named member: classes, functions and properties named `name`.
    /// Returns whether anything was found.
    pub fn import_named(&self, scope: &MemberScope, name: &Name) -> bool {
        let mut members = self.members.borrow_mut();
        let mut found = false;
        if let Some(class) = scope.classifier(name) {
            members.classes.insert(name.clone(), Arc::clone(class));
            found = true;
        }
        for function in scope.functions(name) {
            members.functions.entry(name.clone()).or_default().push(Arc::clone(function));
            found = true;
        }
        for property in scope.properties(name) {
            members.properties.entry(name.clone()).or_default().push(Arc::clone(property));
            found = true;
        }
        found
    }

    // -------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------

    /// Resolve a simple name used as a value: a local, a non-extension
    /// property of a scope, or a member property of an implicit receiver.
    pub fn find_variable(self: &Rc<Self>, name: &Name, builtins: &BuiltIns) -> Option<VariableLookup> {
        for scope in self.chain() {
            let own = scope.members.borrow();
            if let Some(variable) = own.variables.get(name) {
                return Some(VariableLookup::Local(Arc::clone(variable)));
            }
            if let Some(property) = own
                .properties
                .get(name)
                .and_then(|properties| properties.iter().find(|property| !property.is_extension()))
            {
                return Some(VariableLookup::Property {
                    property: Member {
                        descriptor: Arc::clone(property),
                        substitutor: Default::default(),
                    },
                    receiver: None,
                });
            }
            drop(own);
            if let ScopeKind::Receiver(receiver) = &scope.kind {
                if let Some(property) = members::member_properties(&receiver.ty, name, builtins).into_iter().next() {
                    return Some(VariableLookup::Property {
                        property,
                        receiver: Some(receiver.clone()),
                    });
                }
            }
        }
        None
    }

    pub fn find_class(self: &Rc<Self>, name: &Name) -> Option<Arc<ClassDescriptor>> {
        self.chain()
            .find_map(|scope| scope.members.borrow().classes.get(name).cloned())
    }

    pub fn find_type_parameter(self: &Rc<Self>, name: &Name) -> Option<Arc<TypeParameterDescriptor>> {
        self.chain()
            .find_map(|scope| scope.members.borrow().type_parameters.get(name).cloned())
    }

    /// A top-level package called `name`.
    pub fn find_package(self: &Rc<Self>, name: &Name) -> Option<FqName> {
        let finder = self.finder()?;
        let package = FqName::root().child(name);
        finder.has_package(&package).then_some(package)
    }

    /// Non-extension functions and constructors named `name`, grouped by
    /// scope level, innermost first.
    pub fn function_levels(self: &Rc<Self>, name: &Name, builtins: &BuiltIns) -> Vec<CandidateLevel> {
        let mut levels = Vec::new();
        for scope in self.chain() {
            let own = scope.members.borrow();
            let mut level = CandidateLevel::default();
            if let Some(functions) = own.functions.get(name) {
                level.functions = functions
                    .iter()
                    .filter(|function| !function.is_extension())
                    .map(|function| Member {
                        descriptor: Arc::clone(function),
                        substitutor: Default::default(),
                    })
                    .collect();
            }
            if let Some(class) = own.classes.get(name) {
                level.constructors = class
                    .constructors()
                    .iter()
                    .map(|constructor| (Arc::clone(constructor), Arc::clone(class)))
                    .collect();
            }
            drop(own);
            if !level.is_empty() {
                levels.push(level);
            }
            if let ScopeKind::Receiver(receiver) = &scope.kind {
                let functions = members::member_functions(&receiver.ty, name, builtins);
                if !functions.is_empty() {
                    levels.push(CandidateLevel {
                        functions,
                        constructors: Vec::new(),
                        receiver: Some(receiver.clone()),
                    });
                }
            }
        }
        levels
    }

    /// Extension functions named `name`, grouped by scope level.
    pub fn extension_function_levels(self: &Rc<Self>, name: &Name) -> Vec<Vec<Arc<FunctionDescriptor>>> {
        self.chain()
            .filter_map(|scope| {
                let members = scope.members.borrow();
                let level: Vec<_> = members
                    .functions
                    .get(name)?
                    .iter()
                    .filter(|function| function.is_extension())
                    .cloned()
                    .collect();
                (!level.is_empty()).then_some(level)
            })
            .collect()
    }

    /// Extension properties named `name`, grouped by scope level.
    pub fn extension_property_levels(self: &Rc<Self>, name: &Name) -> Vec<Vec<Arc<PropertyDescriptor>>> {
        self.chain()
            .filter_map(|scope| {
                let members = scope.members.borrow();
                let level: Vec<_> = members
                    .properties
                    .get(name)?
                    .iter()
                    .filter(|property| property.is_extension())
                    .cloned()
                    .collect();
                (!level.is_empty()).then_some(level)
            })
            .collect()
    }

    /// Implicit receivers, innermost first.
    pub fn implicit_receivers(self: &Rc<Self>) -> Vec<ReceiverParameter> {
        self.chain()
            .filter_map(|scope| match &scope.kind {
                ScopeKind::Receiver(receiver) => Some(receiver.clone()),
                _ => None,
            })
            .collect()
    }

    /// The innermost function scope's name and declared return type.
    pub fn enclosing_function(self: &Rc<Self>) -> Option<(Name, Option<KType>)> {
        self.chain().find_map(|scope| match &scope.kind {
            ScopeKind::Function { name, return_type } => Some((name.clone(), return_type.clone())),
            _ => None,
        })
    }

    /// Descriptors declared directly by this scope. The root scope
    /// contributes the top-level packages.
    pub fn own_descriptors(&self) -> Vec<DeclarationDescriptor> {
        if let ScopeKind::Root { finder } = &self.kind {
            return finder
                .subpackages(&FqName::root())
                .into_iter()
                .map(DeclarationDescriptor::Package)
                .collect();
        }
        let members = self.members.borrow();
        let mut descriptors: Vec<DeclarationDescriptor> = members
            .variables
            .values()
            .map(|variable| DeclarationDescriptor::Variable(Arc::clone(variable)))
            .collect();
        descriptors.extend(
            members
                .properties
                .values()
                .flatten()
                .map(|property| DeclarationDescriptor::Property(Arc::clone(property))),
        );
        descriptors.extend(
            members
                .functions
                .values()
                .flatten()
                .map(|function| DeclarationDescriptor::Function(Arc::clone(function))),
        );
        descriptors.extend(
            members
                .classes
                .values()
                .map(|class| DeclarationDescriptor::Class(Arc::clone(class))),
        );
        descriptors.extend(
            members
                .type_parameters
                .values()
                .map(|parameter| DeclarationDescriptor::TypeParameter(Arc::clone(parameter))),
        );
        descriptors
    }

    /// Descriptors declared anywhere along the chain, innermost first.
    pub fn all_descriptors(self: &Rc<Self>) -> Vec<DeclarationDescriptor> {
        self.chain().flat_map(LexicalScope::own_descriptors).collect()
    }
}

fn same_receiver(a: &Option<KType>, b: &Option<KType>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => equal_types(a, b),
        _ => false,
    }
}

fn same_signature(a: &FunctionDescriptor, b: &FunctionDescriptor) -> bool {
    same_receiver(&a.extension_receiver, &b.extension_receiver)
        && a.value_parameters.len() == b.value_parameters.len()
        && a.type_parameters.len() == b.type_parameters.len()
        && a.value_parameters.iter().zip(&b.value_parameters).all(|(x, y)| {
            // Parameters typed by the functions' own type parameters match by position.
            match (x.ty.type_parameter_descriptor(), y.ty.type_parameter_descriptor()) {
                (Some(p), Some(q)) => p.index == q.index,
                _ => equal_types(&x.ty, &y.ty),
            }
        })
}

impl fmt::Debug for LexicalScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = std::iter::successors(Some(self), |scope| scope.parent.as_deref())
            .map(|scope| scope.debug_name.as_str())
            .collect();
        write!(f, "LexicalScope({})", names.join(" <- "))
    }
}

#[cfg(test)]
#[path = "../tests/scope_tests.rs"]
mod scope_tests;
