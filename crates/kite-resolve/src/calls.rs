//! Calls, candidates and resolved calls.

use crate::scope::ReceiverParameter;
use kite_common::Span;
use kite_syntax::NodeIndex;
use kite_types::{
    ClassDescriptor, ConstructorDescriptor, DeclarationDescriptor, FunctionDescriptor, KType, Name,
    PropertyDescriptor, TypeParameterDescriptor, TypeSubstitutor, ValueParameterDescriptor,
};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// What kind of member a call site looks up. Property access goes
/// through the same resolution as function calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Function,
    Property,
}

#[derive(Clone, Debug)]
pub enum ReceiverValue {
    /// A receiver written before the `.`.
    Expression { node: NodeIndex, span: Span, ty: KType },
    Implicit(ReceiverParameter),
}

impl ReceiverValue {
    pub fn ty(&self) -> &KType {
        match self {
            ReceiverValue::Expression { ty, .. } => ty,
            ReceiverValue::Implicit(receiver) => &receiver.ty,
        }
    }
}

/// An analyzed value argument.
#[derive(Clone, Debug)]
pub struct CallArgument {
    pub node: NodeIndex,
    /// The argument with parentheses stripped.
    pub expression: NodeIndex,
    pub span: Span,
    pub ty: KType,
}

/// A call site ready for resolution: its receiver and arguments are
/// already analyzed.
#[derive(Clone, Debug)]
pub struct Call {
    pub node: NodeIndex,
    pub span: Span,
    pub callee_span: Span,
    pub name: Name,
    pub kind: MemberKind,
    pub explicit_receiver: Option<ReceiverValue>,
    pub type_arguments: Vec<KType>,
    pub value_arguments: Vec<CallArgument>,
}

#[derive(Clone, Debug)]
pub enum Callee {
    Function(Arc<FunctionDescriptor>),
    Property(Arc<PropertyDescriptor>),
    Constructor {
        constructor: Arc<ConstructorDescriptor>,
        class: Arc<ClassDescriptor>,
    },
}

impl Callee {
    pub fn name(&self) -> Name {
        match self {
            Callee::Function(function) => function.name.clone(),
            Callee::Property(property) => property.name.clone(),
            Callee::Constructor { class, .. } => class.name(),
        }
    }

    pub fn descriptor(&self) -> DeclarationDescriptor {
        match self {
            Callee::Function(function) => DeclarationDescriptor::Function(Arc::clone(function)),
            Callee::Property(property) => DeclarationDescriptor::Property(Arc::clone(property)),
            Callee::Constructor { constructor, .. } => {
                DeclarationDescriptor::Constructor(Arc::clone(constructor))
            }
        }
    }

    /// Type parameters inferred at the call: the function's own, or the
    /// class's for a constructor.
    pub fn type_parameters(&self) -> &[Arc<TypeParameterDescriptor>] {
        match self {
            Callee::Function(function) => &function.type_parameters,
            Callee::Property(property) => &property.type_parameters,
            Callee::Constructor { class, .. } => &class.type_parameters,
        }
    }

    pub fn value_parameters(&self) -> &[ValueParameterDescriptor] {
        match self {
            Callee::Function(function) => &function.value_parameters,
            Callee::Property(_) => &[],
            Callee::Constructor { constructor, .. } => &constructor.value_parameters,
        }
    }

    pub fn extension_receiver(&self) -> Option<&KType> {
        match self {
            Callee::Function(function) => function.extension_receiver.as_ref(),
            Callee::Property(property) => property.extension_receiver.as_ref(),
            Callee::Constructor { .. } => None,
        }
    }

    /// The declared result before substitution.
    pub fn declared_type(&self) -> KType {
        match self {
            Callee::Function(function) => function.return_type.clone(),
            Callee::Property(property) => property.ty.clone(),
            Callee::Constructor { class, .. } => class.default_type(),
        }
    }

    pub fn is_private(&self) -> bool {
        match self {
            Callee::Function(function) => function.visibility == kite_types::Visibility::Private,
            Callee::Property(property) => property.visibility == kite_types::Visibility::Private,
            Callee::Constructor { constructor, .. } => {
                constructor.visibility == kite_types::Visibility::Private
            }
        }
    }

    /// The class whose code declares this callee.
    pub fn owner(&self) -> Option<kite_types::ClassId> {
        match self {
            Callee::Function(function) => function.containing.owner_class().cloned(),
            Callee::Property(property) => property.containing.owner_class().cloned(),
            Callee::Constructor { class, .. } => Some(class.class_id.clone()),
        }
    }
}

impl fmt::Display for Callee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let type_parameters = |f: &mut fmt::Formatter<'_>, parameters: &[Arc<TypeParameterDescriptor>]| {
            if parameters.is_empty() {
                return Ok(());
            }
            let names: Vec<String> = parameters.iter().map(|p| p.name.to_string()).collect();
            write!(f, "<{}> ", names.join(", "))
        };
        let parameters = |parameters: &[ValueParameterDescriptor]| {
            parameters
                .iter()
                .map(|p| format!("{}: {}", p.name, p.ty))
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self {
            Callee::Function(function) => {
                f.write_str("fun ")?;
                type_parameters(f, &function.type_parameters)?;
                if let Some(receiver) = &function.extension_receiver {
                    write!(f, "{receiver}.")?;
                }
                write!(
                    f,
                    "{}({}): {}",
                    function.name,
                    parameters(&function.value_parameters),
                    function.return_type
                )
            }
            Callee::Property(property) => {
                f.write_str(if property.is_var { "var " } else { "val " })?;
                if let Some(receiver) = &property.extension_receiver {
                    write!(f, "{receiver}.")?;
                }
                write!(f, "{}: {}", property.name, property.ty)
            }
            Callee::Constructor { constructor, class } => {
                write!(f, "constructor {}", class.name())?;
                if !class.type_parameters.is_empty() {
                    let names: Vec<String> = class.type_parameters.iter().map(|p| p.name.to_string()).collect();
                    write!(f, "<{}>", names.join(", "))?;
                }
                write!(f, "({})", parameters(&constructor.value_parameters))
            }
        }
    }
}

/// One overload candidate for a call.
#[derive(Clone, Debug)]
pub struct Candidate {
    pub callee: Callee,
    /// Maps the declaring class's type parameters for member callees.
    pub substitutor: TypeSubstitutor,
    pub dispatch_receiver: Option<ReceiverValue>,
    pub extension_receiver: Option<ReceiverValue>,
}

impl Candidate {
    pub fn new(callee: Callee) -> Self {
        Candidate {
            callee,
            substitutor: TypeSubstitutor::empty(),
            dispatch_receiver: None,
            extension_receiver: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionStatus {
    Success,
    /// Applicable, but called on a nullable receiver.
    UnsafeCall,
    WrongArgumentCount,
    ArgumentMismatch,
    ReceiverMismatch,
    InferenceFailed,
    Invisible,
}

impl ResolutionStatus {
    pub fn is_applicable(self) -> bool {
        matches!(self, ResolutionStatus::Success | ResolutionStatus::UnsafeCall)
    }
}

/// A call bound to one callee.
#[derive(Clone, Debug)]
pub struct ResolvedCall {
    pub call_node: NodeIndex,
    pub callee: Callee,
    pub dispatch_receiver: Option<ReceiverValue>,
    pub extension_receiver: Option<ReceiverValue>,
    /// Inferred or explicit type arguments, in type-parameter order.
    pub type_arguments: Vec<KType>,
    /// The argument node for each value parameter, in parameter order.
    /// `None` means the parameter's default value is used.
    pub value_arguments: Vec<Option<NodeIndex>>,
    /// Parameter types after substitution.
    pub parameter_types: Vec<KType>,
    pub result_type: KType,
    pub status: ResolutionStatus,
}

#[derive(Clone, Debug)]
pub enum OverloadResolutionResults {
    Success(Rc<ResolvedCall>),
    Ambiguity(Vec<Rc<ResolvedCall>>),
    /// No candidate applies; holds every candidate that was tried.
    Inapplicable(Vec<Rc<ResolvedCall>>),
    Unresolved,
}

impl OverloadResolutionResults {
    pub fn is_success(&self) -> bool {
        matches!(self, OverloadResolutionResults::Success(_))
    }

    /// The call that analysis continues with: the winner, or the only
    /// candidate when it failed.
    pub fn resolved_call(&self) -> Option<&Rc<ResolvedCall>> {
        match self {
            OverloadResolutionResults::Success(call) => Some(call),
            OverloadResolutionResults::Inapplicable(calls) if calls.len() == 1 => calls.first(),
            _ => None,
        }
    }

    pub fn result_type(&self) -> Option<KType> {
        self.resolved_call().map(|call| call.result_type.clone())
    }
}
