//! Semantic types.
//!
//! [`KType`] is a cheap-to-clone handle. Class types carry their class
//! descriptor and type arguments; type-parameter types carry the parameter
//! descriptor. Flexible types model values whose nullability is unknown
//! (`T!`): they behave as their lower bound where a value is produced and
//! as their upper bound where one is consumed.

use crate::descriptors::{ClassDescriptor, TypeParameterDescriptor, Variance};
use crate::names::{ClassId, standard_class_ids};
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub enum KType {
    Class(Arc<ClassType>),
    TypeParameter(Arc<TypeParameterType>),
    Flexible(Arc<FlexibleType>),
    /// Placeholder for a type that could not be resolved. Never a subtype
    /// error: checks involving it succeed so one failure reports once.
    Error(Arc<str>),
}

pub struct ClassType {
    pub class: Arc<ClassDescriptor>,
    pub arguments: Vec<TypeProjection>,
    pub nullable: bool,
}

pub struct TypeParameterType {
    pub parameter: Arc<TypeParameterDescriptor>,
    pub nullable: bool,
}

/// Named behaviour attached to a flexible type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlexibleTypeCapabilities {
    pub id: String,
}

pub struct FlexibleType {
    pub lower: KType,
    pub upper: KType,
    pub capabilities: Arc<FlexibleTypeCapabilities>,
}

/// A type argument with its use-site projection.
#[derive(Clone, PartialEq)]
pub enum TypeProjection {
    Type { projection: Variance, ty: KType },
    Star,
}

impl TypeProjection {
    pub fn invariant(ty: KType) -> Self {
        TypeProjection::Type {
            projection: Variance::Invariant,
            ty,
        }
    }

    pub fn ty(&self) -> Option<&KType> {
        match self {
            TypeProjection::Type { ty, .. } => Some(ty),
            TypeProjection::Star => None,
        }
    }
}

impl KType {
    pub fn class(class: &Arc<ClassDescriptor>, arguments: Vec<TypeProjection>, nullable: bool) -> Self {
        KType::Class(Arc::new(ClassType {
            class: Arc::clone(class),
            arguments,
            nullable,
        }))
    }

    pub fn simple_class(class: &Arc<ClassDescriptor>) -> Self {
        KType::class(class, Vec::new(), false)
    }

    pub fn type_parameter(parameter: &Arc<TypeParameterDescriptor>, nullable: bool) -> Self {
        KType::TypeParameter(Arc::new(TypeParameterType {
            parameter: Arc::clone(parameter),
            nullable,
        }))
    }

    pub fn flexible(lower: KType, upper: KType, capabilities: Arc<FlexibleTypeCapabilities>) -> Self {
        KType::Flexible(Arc::new(FlexibleType {
            lower,
            upper,
            capabilities,
        }))
    }

    pub fn error(message: impl Into<Arc<str>>) -> Self {
        KType::Error(message.into())
    }

    pub fn is_error(&self) -> bool {
        match self {
            KType::Error(_) => true,
            KType::Flexible(flexible) => flexible.lower.is_error() || flexible.upper.is_error(),
            _ => false,
        }
    }

    /// Whether the type is written with `?`.
    pub fn is_marked_nullable(&self) -> bool {
        match self {
            KType::Class(class) => class.nullable,
            KType::TypeParameter(parameter) => parameter.nullable,
            KType::Flexible(flexible) => flexible.upper.is_marked_nullable(),
            KType::Error(_) => false,
        }
    }

    /// Whether `null` may be a value of this type, looking through bounds.
    pub fn is_nullable(&self) -> bool {
        match self {
            KType::Class(class) => class.nullable,
            KType::TypeParameter(parameter) => {
                parameter.nullable
                    || parameter.parameter.upper_bounds().is_empty()
                    || parameter
                        .parameter
                        .upper_bounds()
                        .iter()
                        .all(KType::is_nullable)
            }
            KType::Flexible(flexible) => flexible.upper.is_nullable(),
            KType::Error(_) => false,
        }
    }

    /// The same type with `?` set or cleared.
    #[must_use]
    pub fn with_nullability(&self, nullable: bool) -> KType {
        match self {
            KType::Class(class) if class.nullable != nullable => KType::Class(Arc::new(ClassType {
                class: Arc::clone(&class.class),
                arguments: class.arguments.clone(),
                nullable,
            })),
            KType::TypeParameter(parameter) if parameter.nullable != nullable => {
                KType::type_parameter(&parameter.parameter, nullable)
            }
            KType::Flexible(flexible) => KType::flexible(
                flexible.lower.with_nullability(nullable),
                flexible.upper.with_nullability(nullable),
                Arc::clone(&flexible.capabilities),
            ),
            _ => self.clone(),
        }
    }

    #[must_use]
    pub fn make_nullable(&self) -> KType {
        self.with_nullability(true)
    }

    #[must_use]
    pub fn make_not_nullable(&self) -> KType {
        self.with_nullability(false)
    }

    /// Lower bound for flexible types, the type itself otherwise.
    pub fn lower_if_flexible(&self) -> &KType {
        match self {
            KType::Flexible(flexible) => flexible.lower.lower_if_flexible(),
            _ => self,
        }
    }

    /// Upper bound for flexible types, the type itself otherwise.
    pub fn upper_if_flexible(&self) -> &KType {
        match self {
            KType::Flexible(flexible) => flexible.upper.upper_if_flexible(),
            _ => self,
        }
    }

    pub fn class_descriptor(&self) -> Option<&Arc<ClassDescriptor>> {
        match self.lower_if_flexible() {
            KType::Class(class) => Some(&class.class),
            _ => None,
        }
    }

    pub fn class_id(&self) -> Option<&ClassId> {
        self.class_descriptor().map(|class| &class.class_id)
    }

    pub fn arguments(&self) -> &[TypeProjection] {
        match self.lower_if_flexible() {
            KType::Class(class) => &class.arguments,
            _ => &[],
        }
    }

    pub fn type_parameter_descriptor(&self) -> Option<&Arc<TypeParameterDescriptor>> {
        match self.lower_if_flexible() {
            KType::TypeParameter(parameter) => Some(&parameter.parameter),
            _ => None,
        }
    }

    fn is_class(&self, id: ClassId) -> bool {
        self.class_id() == Some(&id)
    }

    pub fn is_nothing(&self) -> bool {
        self.is_class(standard_class_ids::nothing())
    }

    pub fn is_any(&self) -> bool {
        self.is_class(standard_class_ids::any())
    }

    pub fn is_unit(&self) -> bool {
        !self.is_marked_nullable() && self.is_class(standard_class_ids::unit())
    }

    pub fn is_int(&self) -> bool {
        !self.is_marked_nullable() && self.is_class(standard_class_ids::int())
    }

    pub fn is_boolean(&self) -> bool {
        !self.is_marked_nullable() && self.is_class(standard_class_ids::boolean())
    }

    pub fn is_string(&self) -> bool {
        self.is_class(standard_class_ids::string())
    }

    /// `Nothing?`, the type of the `null` literal.
    pub fn is_nullable_nothing(&self) -> bool {
        self.is_nothing() && self.is_marked_nullable()
    }

    /// Whether any type parameter matching `predicate` occurs in this type.
    pub fn contains_type_parameter(&self, predicate: &dyn Fn(&TypeParameterDescriptor) -> bool) -> bool {
        match self {
            KType::Class(class) => class.arguments.iter().any(|argument| {
                argument
                    .ty()
                    .is_some_and(|ty| ty.contains_type_parameter(predicate))
            }),
            KType::TypeParameter(parameter) => predicate(&parameter.parameter),
            KType::Flexible(flexible) => {
                flexible.lower.contains_type_parameter(predicate)
                    || flexible.upper.contains_type_parameter(predicate)
            }
            KType::Error(_) => false,
        }
    }
}

impl PartialEq for KType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (KType::Class(a), KType::Class(b)) => {
                Arc::ptr_eq(a, b)
                    || (a.nullable == b.nullable
                        && a.class.class_id == b.class.class_id
                        && a.arguments == b.arguments)
            }
            (KType::TypeParameter(a), KType::TypeParameter(b)) => {
                a.nullable == b.nullable && a.parameter.id == b.parameter.id
            }
            (KType::Flexible(a), KType::Flexible(b)) => a.lower == b.lower && a.upper == b.upper,
            (KType::Error(a), KType::Error(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for KType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KType::Class(class) => {
                write!(f, "{}", class.class.class_id.relative_class_name().as_str())?;
                if !class.arguments.is_empty() {
                    f.write_str("<")?;
                    for (i, argument) in class.arguments.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{argument}")?;
                    }
                    f.write_str(">")?;
                }
                if class.nullable {
                    f.write_str("?")?;
                }
                Ok(())
            }
            KType::TypeParameter(parameter) => {
                write!(f, "{}", parameter.parameter.name)?;
                if parameter.nullable {
                    f.write_str("?")?;
                }
                Ok(())
            }
            KType::Flexible(flexible) => write!(f, "{}!", flexible.lower.make_not_nullable()),
            KType::Error(message) => write!(f, "[Error type: {message}]"),
        }
    }
}

impl fmt::Debug for KType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KType({self})")
    }
}

impl fmt::Display for TypeProjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeProjection::Star => f.write_str("*"),
            TypeProjection::Type {
                projection: Variance::Invariant,
                ty,
            } => write!(f, "{ty}"),
            TypeProjection::Type { projection, ty } => write!(f, "{} {ty}", projection.label()),
        }
    }
}

impl fmt::Debug for TypeProjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}
