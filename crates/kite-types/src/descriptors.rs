//! Semantic descriptors for declarations.
//!
//! Descriptors are immutable once built and shared through `Arc`. A
//! descriptor refers to its container by id ([`ContainingDeclaration`]),
//! never by owning pointer, so the descriptor graph has no ownership cycles.
//! Fields that are expensive or cyclic to compute (class contents,
//! type-parameter bounds, compile-time constants) are deferred.

use crate::names::{ClassId, FqName, Name};
use crate::scope::MemberScope;
use crate::types::{KType, TypeProjection};
use kite_common::LazyValue;
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

// =============================================================================
// Modifiers
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Visibility {
    Public,
    Internal,
    Private,
    /// Declared inside a function body or block.
    Local,
}

impl Visibility {
    /// Whether a declaration with this visibility may be seen from outside
    /// its container.
    pub fn is_public_api(self) -> bool {
        matches!(self, Visibility::Public | Visibility::Internal)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Modality {
    Final,
    Open,
    Abstract,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ClassKind {
    Class,
    Interface,
    Object,
    /// A compiled REPL line or script file.
    Script,
}

/// Declaration-site or use-site variance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Variance {
    Invariant,
    In,
    Out,
}

impl Variance {
    pub fn label(self) -> &'static str {
        match self {
            Variance::Invariant => "",
            Variance::In => "in",
            Variance::Out => "out",
        }
    }
}

/// Compile-time constant value of a `const val`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ConstantValue {
    Int(i32),
    Boolean(bool),
    String(Arc<str>),
    Null,
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Int(value) => write!(f, "{value}"),
            ConstantValue::Boolean(value) => write!(f, "{value}"),
            ConstantValue::String(value) => write!(f, "\"{value}\""),
            ConstantValue::Null => f.write_str("null"),
        }
    }
}

// =============================================================================
// Identity
// =============================================================================

/// Unique identity of a declaration, assigned at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DescriptorId(pub u32);

static NEXT_DESCRIPTOR_ID: AtomicU32 = AtomicU32::new(1);

impl DescriptorId {
    pub fn fresh() -> Self {
        DescriptorId(NEXT_DESCRIPTOR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Back-reference from a descriptor to the declaration that contains it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ContainingDeclaration {
    /// A top-level declaration, implemented as a static member of `facade`.
    Package { fq_name: FqName, facade: ClassId },
    Class(ClassId),
    Callable(DescriptorId),
}

impl ContainingDeclaration {
    /// The class that holds the compiled code of a member declared here.
    pub fn owner_class(&self) -> Option<&ClassId> {
        match self {
            ContainingDeclaration::Package { facade, .. } => Some(facade),
            ContainingDeclaration::Class(class_id) => Some(class_id),
            ContainingDeclaration::Callable(_) => None,
        }
    }

    pub fn is_package(&self) -> bool {
        matches!(self, ContainingDeclaration::Package { .. })
    }
}

// =============================================================================
// Type parameters and value parameters
// =============================================================================

pub struct TypeParameterDescriptor {
    pub id: DescriptorId,
    pub name: Name,
    pub index: u32,
    pub variance: Variance,
    pub is_reified: bool,
    pub containing: ContainingDeclaration,
    upper_bounds: LazyValue<Vec<KType>>,
}

impl TypeParameterDescriptor {
    pub fn new(
        name: Name,
        index: u32,
        variance: Variance,
        is_reified: bool,
        containing: ContainingDeclaration,
        upper_bounds: LazyValue<Vec<KType>>,
    ) -> Self {
        TypeParameterDescriptor {
            id: DescriptorId::fresh(),
            name,
            index,
            variance,
            is_reified,
            containing,
            upper_bounds,
        }
    }

    /// Declared bounds. Empty means the implicit `Any?`.
    pub fn upper_bounds(&self) -> &[KType] {
        self.upper_bounds.get()
    }

    pub fn bounds_computed(&self) -> bool {
        self.upper_bounds.is_computed()
    }
}

impl fmt::Debug for TypeParameterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeParameter({}#{})", self.name, self.id.0)
    }
}

impl PartialEq for TypeParameterDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeParameterDescriptor {}

#[derive(Clone, Debug, PartialEq)]
pub struct ValueParameterDescriptor {
    pub name: Name,
    pub index: u32,
    pub ty: KType,
    pub declares_default_value: bool,
}

// =============================================================================
// Callables
// =============================================================================

#[derive(Debug)]
pub struct FunctionDescriptor {
    pub id: DescriptorId,
    pub name: Name,
    pub containing: ContainingDeclaration,
    pub visibility: Visibility,
    pub modality: Modality,
    pub type_parameters: Vec<Arc<TypeParameterDescriptor>>,
    pub extension_receiver: Option<KType>,
    pub dispatch_receiver: Option<ClassId>,
    pub value_parameters: Vec<ValueParameterDescriptor>,
    pub return_type: KType,
    pub is_operator: bool,
}

impl FunctionDescriptor {
    pub fn is_extension(&self) -> bool {
        self.extension_receiver.is_some()
    }
}

/// Getter or setter of a property.
#[derive(Debug)]
pub struct PropertyAccessorDescriptor {
    pub is_getter: bool,
    /// Synthesized by the compiler rather than written in source.
    pub is_default: bool,
    pub visibility: Visibility,
    /// The setter's single value parameter.
    pub value_parameter: Option<ValueParameterDescriptor>,
}

pub struct PropertyDescriptor {
    pub id: DescriptorId,
    pub name: Name,
    pub containing: ContainingDeclaration,
    pub visibility: Visibility,
    pub modality: Modality,
    pub is_var: bool,
    pub is_const: bool,
    pub type_parameters: Vec<Arc<TypeParameterDescriptor>>,
    pub extension_receiver: Option<KType>,
    pub dispatch_receiver: Option<ClassId>,
    pub ty: KType,
    pub getter: Option<PropertyAccessorDescriptor>,
    pub setter: Option<PropertyAccessorDescriptor>,
    pub compile_time_constant: Option<LazyValue<Option<ConstantValue>>>,
}

impl PropertyDescriptor {
    pub fn is_extension(&self) -> bool {
        self.extension_receiver.is_some()
    }

    /// The constant value, evaluated on first request.
    pub fn constant(&self) -> Option<&ConstantValue> {
        self.compile_time_constant.as_ref()?.get().as_ref()
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("is_var", &self.is_var)
            .field("ty", &self.ty)
            .field("visibility", &self.visibility)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct ConstructorDescriptor {
    pub id: DescriptorId,
    pub containing_class: ClassId,
    pub visibility: Visibility,
    pub is_primary: bool,
    pub value_parameters: Vec<ValueParameterDescriptor>,
}

/// A local `val`/`var`, function parameter or catch parameter.
#[derive(Debug)]
pub struct LocalVariableDescriptor {
    pub id: DescriptorId,
    pub name: Name,
    pub ty: KType,
    pub is_var: bool,
}

// =============================================================================
// Classes
// =============================================================================

/// Lazily materialized parts of a class.
pub trait ClassContents: Send + Sync {
    fn supertypes(&self) -> &[KType];
    fn member_scope(&self) -> &MemberScope;
    fn constructors(&self) -> &[Arc<ConstructorDescriptor>];
}

/// Class contents that are fully known when the class is built.
pub struct EagerClassContents {
    pub supertypes: Vec<KType>,
    pub scope: MemberScope,
    pub constructors: Vec<Arc<ConstructorDescriptor>>,
}

impl ClassContents for EagerClassContents {
    fn supertypes(&self) -> &[KType] {
        &self.supertypes
    }

    fn member_scope(&self) -> &MemberScope {
        &self.scope
    }

    fn constructors(&self) -> &[Arc<ConstructorDescriptor>] {
        &self.constructors
    }
}

pub struct ClassDescriptor {
    pub class_id: ClassId,
    pub kind: ClassKind,
    pub visibility: Visibility,
    pub modality: Modality,
    pub type_parameters: Vec<Arc<TypeParameterDescriptor>>,
    contents: OnceCell<Box<dyn ClassContents>>,
}

impl ClassDescriptor {
    /// Create a class shell. Its contents are attached with [`ClassDescriptor::initialize`].
    pub fn new(
        class_id: ClassId,
        kind: ClassKind,
        visibility: Visibility,
        modality: Modality,
        type_parameters: Vec<Arc<TypeParameterDescriptor>>,
    ) -> Self {
        ClassDescriptor {
            class_id,
            kind,
            visibility,
            modality,
            type_parameters,
            contents: OnceCell::new(),
        }
    }

    /// Attach the class contents. Must be called exactly once.
    pub fn initialize(&self, contents: Box<dyn ClassContents>) {
        assert!(
            self.contents.set(contents).is_ok(),
            "class {} initialized twice",
            self.class_id
        );
    }

    pub fn name(&self) -> Name {
        self.class_id.short_class_name()
    }

    fn contents(&self) -> &dyn ClassContents {
        match self.contents.get() {
            Some(contents) => contents.as_ref(),
            None => panic!("class {} used before initialize()", self.class_id),
        }
    }

    pub fn supertypes(&self) -> &[KType] {
        self.contents().supertypes()
    }

    pub fn member_scope(&self) -> &MemberScope {
        self.contents().member_scope()
    }

    pub fn constructors(&self) -> &[Arc<ConstructorDescriptor>] {
        self.contents().constructors()
    }

    /// The type `C<T1, ..., Tn>` using the class's own type parameters.
    pub fn default_type(self: &Arc<Self>) -> KType {
        let arguments = self
            .type_parameters
            .iter()
            .map(|parameter| TypeProjection::invariant(KType::type_parameter(parameter, false)))
            .collect();
        KType::class(self, arguments, false)
    }
}

impl fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassDescriptor({})", self.class_id)
    }
}

impl PartialEq for ClassDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.class_id == other.class_id
    }
}

impl Eq for ClassDescriptor {}

// =============================================================================
// Scope members
// =============================================================================

/// Anything a name can resolve to.
#[derive(Clone, Debug)]
pub enum DeclarationDescriptor {
    Package(FqName),
    Class(Arc<ClassDescriptor>),
    Function(Arc<FunctionDescriptor>),
    Property(Arc<PropertyDescriptor>),
    Constructor(Arc<ConstructorDescriptor>),
    Variable(Arc<LocalVariableDescriptor>),
    TypeParameter(Arc<TypeParameterDescriptor>),
}

impl DeclarationDescriptor {
    pub fn name(&self) -> Name {
        match self {
            DeclarationDescriptor::Package(fq_name) => {
                if fq_name.is_root() {
                    Name::identifier("")
                } else {
                    fq_name.short_name()
                }
            }
            DeclarationDescriptor::Class(class) => class.name(),
            DeclarationDescriptor::Function(function) => function.name.clone(),
            DeclarationDescriptor::Property(property) => property.name.clone(),
            DeclarationDescriptor::Constructor(constructor) => {
                constructor.containing_class.short_class_name()
            }
            DeclarationDescriptor::Variable(variable) => variable.name.clone(),
            DeclarationDescriptor::TypeParameter(parameter) => parameter.name.clone(),
        }
    }

    pub fn visibility(&self) -> Visibility {
        match self {
            DeclarationDescriptor::Package(_) => Visibility::Public,
            DeclarationDescriptor::Class(class) => class.visibility,
            DeclarationDescriptor::Function(function) => function.visibility,
            DeclarationDescriptor::Property(property) => property.visibility,
            DeclarationDescriptor::Constructor(constructor) => constructor.visibility,
            DeclarationDescriptor::Variable(_) | DeclarationDescriptor::TypeParameter(_) => {
                Visibility::Local
            }
        }
    }

    /// Declared receiver type of an extension function or property.
    pub fn extension_receiver(&self) -> Option<&KType> {
        match self {
            DeclarationDescriptor::Function(function) => function.extension_receiver.as_ref(),
            DeclarationDescriptor::Property(property) => property.extension_receiver.as_ref(),
            _ => None,
        }
    }

    pub fn is_extension(&self) -> bool {
        self.extension_receiver().is_some()
    }

    pub fn type_parameters(&self) -> &[Arc<TypeParameterDescriptor>] {
        match self {
            DeclarationDescriptor::Function(function) => &function.type_parameters,
            DeclarationDescriptor::Property(property) => &property.type_parameters,
            DeclarationDescriptor::Class(class) => &class.type_parameters,
            _ => &[],
        }
    }

    pub fn is_package(&self) -> bool {
        matches!(self, DeclarationDescriptor::Package(_))
    }

    /// Identity comparison.
    pub fn same_declaration(&self, other: &DeclarationDescriptor) -> bool {
        use DeclarationDescriptor as D;
        match (self, other) {
            (D::Package(a), D::Package(b)) => a == b,
            (D::Class(a), D::Class(b)) => a.class_id == b.class_id,
            (D::Function(a), D::Function(b)) => a.id == b.id,
            (D::Property(a), D::Property(b)) => a.id == b.id,
            (D::Constructor(a), D::Constructor(b)) => a.id == b.id,
            (D::Variable(a), D::Variable(b)) => a.id == b.id,
            (D::TypeParameter(a), D::TypeParameter(b)) => a.id == b.id,
            _ => false,
        }
    }
}
