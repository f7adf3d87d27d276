//! The instruction set.
//!
//! A method body is a flat `Vec<Instruction>`; jump targets are indices
//! into that vector. Member references carry their owner, name and
//! descriptor inline.
//!
//! Values on the operand stack are one of three kinds (see
//! [`SlotKind`](crate::stack::SlotKind)): integers (`Int` and `Boolean`),
//! references, and return addresses pushed by `jsr`.

use serde::Serialize;
use smallvec::{SmallVec, smallvec};
use std::fmt;
use std::sync::Arc;

/// Index of an instruction within its method body.
pub type Offset = u32;

/// Comparison performed by a conditional jump.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Condition {
    Eq,
    Ne,
    Lt,
    Ge,
    Gt,
    Le,
}

impl Condition {
    pub fn negate(self) -> Condition {
        match self {
            Condition::Eq => Condition::Ne,
            Condition::Ne => Condition::Eq,
            Condition::Lt => Condition::Ge,
            Condition::Ge => Condition::Lt,
            Condition::Gt => Condition::Le,
            Condition::Le => Condition::Gt,
        }
    }

    pub fn test(self, left: i32, right: i32) -> bool {
        match self {
            Condition::Eq => left == right,
            Condition::Ne => left != right,
            Condition::Lt => left < right,
            Condition::Ge => left >= right,
            Condition::Gt => left > right,
            Condition::Le => left <= right,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Condition::Eq => "eq",
            Condition::Ne => "ne",
            Condition::Lt => "lt",
            Condition::Ge => "ge",
            Condition::Gt => "gt",
            Condition::Le => "le",
        }
    }

    pub(crate) fn code(self) -> u8 {
        match self {
            Condition::Eq => 0,
            Condition::Ne => 1,
            Condition::Lt => 2,
            Condition::Ge => 3,
            Condition::Gt => 4,
            Condition::Le => 5,
        }
    }

    pub(crate) fn from_code(code: u8) -> Option<Condition> {
        Some(match code {
            0 => Condition::Eq,
            1 => Condition::Ne,
            2 => Condition::Lt,
            3 => Condition::Ge,
            4 => Condition::Gt,
            5 => Condition::Le,
            _ => return None,
        })
    }
}

// =============================================================================
// Descriptors
// =============================================================================

/// A field type or method parameter/return type.
///
/// Written in the familiar compact form: `I`, `Z`, `V`, `Lkite/String;`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TypeDesc {
    Int,
    Boolean,
    Void,
    /// A reference to an instance of the class with this internal name.
    Object(Arc<str>),
}

impl TypeDesc {
    pub fn object(internal_name: &str) -> TypeDesc {
        TypeDesc::Object(Arc::from(internal_name))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeDesc::Void)
    }

    /// Whether values of this type travel as integers.
    pub fn is_integral(&self) -> bool {
        matches!(self, TypeDesc::Int | TypeDesc::Boolean)
    }

    /// Parse one type at the start of `text`, returning it and the rest.
    fn parse_prefix(text: &str) -> Option<(TypeDesc, &str)> {
        let mut chars = text.chars();
        let ty = match chars.next()? {
            'I' => TypeDesc::Int,
            'Z' => TypeDesc::Boolean,
            'V' => TypeDesc::Void,
            'L' => {
                let end = text.find(';')?;
                let name = &text[1..end];
                if name.is_empty() {
                    return None;
                }
                return Some((TypeDesc::object(name), &text[end + 1..]));
            }
            _ => return None,
        };
        Some((ty, chars.as_str()))
    }

    pub fn parse(text: &str) -> Option<TypeDesc> {
        match TypeDesc::parse_prefix(text)? {
            (ty, "") => Some(ty),
            _ => None,
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Int => f.write_str("I"),
            TypeDesc::Boolean => f.write_str("Z"),
            TypeDesc::Void => f.write_str("V"),
            TypeDesc::Object(name) => write!(f, "L{name};"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct MethodDescriptor {
    pub parameters: Vec<TypeDesc>,
    pub returns: TypeDesc,
}

impl MethodDescriptor {
    pub fn new(parameters: Vec<TypeDesc>, returns: TypeDesc) -> Self {
        MethodDescriptor { parameters, returns }
    }

    /// `(params)ret`, e.g. `(ILkite/Any;)V`.
    pub fn parse(text: &str) -> Option<MethodDescriptor> {
        let mut rest = text.strip_prefix('(')?;
        let mut parameters = Vec::new();
        while !rest.starts_with(')') {
            let (ty, tail) = TypeDesc::parse_prefix(rest)?;
            if ty.is_void() {
                return None;
            }
            parameters.push(ty);
            rest = tail;
        }
        let returns = TypeDesc::parse(&rest[1..])?;
        Some(MethodDescriptor { parameters, returns })
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for parameter in &self.parameters {
            write!(f, "{parameter}")?;
        }
        write!(f, "){}", self.returns)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct FieldRef {
    pub owner: Arc<str>,
    pub name: Arc<str>,
    pub ty: TypeDesc,
}

impl FieldRef {
    pub fn new(owner: &str, name: &str, ty: TypeDesc) -> Self {
        FieldRef {
            owner: Arc::from(owner),
            name: Arc::from(name),
            ty,
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}:{}", self.owner, self.name, self.ty)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct MethodRef {
    pub owner: Arc<str>,
    pub name: Arc<str>,
    pub descriptor: MethodDescriptor,
}

impl MethodRef {
    pub fn new(owner: &str, name: &str, descriptor: MethodDescriptor) -> Self {
        MethodRef {
            owner: Arc::from(owner),
            name: Arc::from(name),
            descriptor,
        }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.descriptor)
    }
}

// =============================================================================
// Instructions
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Instruction {
    Nop,
    AConstNull,
    IConst(i32),
    BConst(bool),
    /// Push a string constant.
    Ldc(Arc<str>),

    ILoad(u16),
    IStore(u16),
    ALoad(u16),
    AStore(u16),

    Pop,
    Dup,
    Swap,

    IAdd,
    ISub,
    IMul,
    IDiv,
    IRem,
    INeg,

    /// Pop an integer and jump when it compares to zero as `Condition`.
    If(Condition, Offset),
    /// Pop two integers and jump when `left condition right`.
    IfICmp(Condition, Offset),
    IfNull(Offset),
    IfNonNull(Offset),
    Goto(Offset),
    /// Push the offset of the next instruction and jump to a subroutine.
    Jsr(Offset),
    /// Return from a subroutine to the address held in a local.
    Ret(u16),
    LookupSwitch {
        default: Offset,
        cases: Vec<(i32, Offset)>,
    },

    New(Arc<str>),
    GetField(FieldRef),
    PutField(FieldRef),
    GetStatic(FieldRef),
    PutStatic(FieldRef),
    InvokeVirtual(MethodRef),
    InvokeStatic(MethodRef),
    /// Constructors and private methods: no virtual dispatch.
    InvokeSpecial(MethodRef),
    CheckCast(Arc<str>),
    InstanceOf(Arc<str>),
    AThrow,

    IReturn,
    AReturn,
    Return,
}

impl Instruction {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Nop => "nop",
            Instruction::AConstNull => "aconst_null",
            Instruction::IConst(_) => "iconst",
            Instruction::BConst(_) => "bconst",
            Instruction::Ldc(_) => "ldc",
            Instruction::ILoad(_) => "iload",
            Instruction::IStore(_) => "istore",
            Instruction::ALoad(_) => "aload",
            Instruction::AStore(_) => "astore",
            Instruction::Pop => "pop",
            Instruction::Dup => "dup",
            Instruction::Swap => "swap",
            Instruction::IAdd => "iadd",
            Instruction::ISub => "isub",
            Instruction::IMul => "imul",
            Instruction::IDiv => "idiv",
            Instruction::IRem => "irem",
            Instruction::INeg => "ineg",
            Instruction::If(condition, _) => match condition {
                Condition::Eq => "ifeq",
                Condition::Ne => "ifne",
                Condition::Lt => "iflt",
                Condition::Ge => "ifge",
                Condition::Gt => "ifgt",
                Condition::Le => "ifle",
            },
            Instruction::IfICmp(condition, _) => match condition {
                Condition::Eq => "if_icmpeq",
                Condition::Ne => "if_icmpne",
                Condition::Lt => "if_icmplt",
                Condition::Ge => "if_icmpge",
                Condition::Gt => "if_icmpgt",
                Condition::Le => "if_icmple",
            },
            Instruction::IfNull(_) => "ifnull",
            Instruction::IfNonNull(_) => "ifnonnull",
            Instruction::Goto(_) => "goto",
            Instruction::Jsr(_) => "jsr",
            Instruction::Ret(_) => "ret",
            Instruction::LookupSwitch { .. } => "lookupswitch",
            Instruction::New(_) => "new",
            Instruction::GetField(_) => "getfield",
            Instruction::PutField(_) => "putfield",
            Instruction::GetStatic(_) => "getstatic",
            Instruction::PutStatic(_) => "putstatic",
            Instruction::InvokeVirtual(_) => "invokevirtual",
            Instruction::InvokeStatic(_) => "invokestatic",
            Instruction::InvokeSpecial(_) => "invokespecial",
            Instruction::CheckCast(_) => "checkcast",
            Instruction::InstanceOf(_) => "instanceof",
            Instruction::AThrow => "athrow",
            Instruction::IReturn => "ireturn",
            Instruction::AReturn => "areturn",
            Instruction::Return => "return",
        }
    }

    /// Every offset this instruction may transfer control to, other than
    /// the next instruction. A switch lists its default first.
    pub fn jump_targets(&self) -> SmallVec<[Offset; 2]> {
        match self {
            Instruction::If(_, target)
            | Instruction::IfICmp(_, target)
            | Instruction::IfNull(target)
            | Instruction::IfNonNull(target)
            | Instruction::Goto(target)
            | Instruction::Jsr(target) => smallvec![*target],
            Instruction::LookupSwitch { default, cases } => {
                let mut targets = SmallVec::with_capacity(cases.len() + 1);
                targets.push(*default);
                targets.extend(cases.iter().map(|(_, target)| *target));
                targets
            }
            _ => SmallVec::new(),
        }
    }

    /// Rewrite every jump target in place.
    pub fn map_targets(&mut self, mut map: impl FnMut(Offset) -> Offset) {
        match self {
            Instruction::If(_, target)
            | Instruction::IfICmp(_, target)
            | Instruction::IfNull(target)
            | Instruction::IfNonNull(target)
            | Instruction::Goto(target)
            | Instruction::Jsr(target) => *target = map(*target),
            Instruction::LookupSwitch { default, cases } => {
                *default = map(*default);
                for (_, target) in cases {
                    *target = map(*target);
                }
            }
            _ => {}
        }
    }

    /// Jumps, including `jsr`, excluding switches.
    pub fn is_jump(&self) -> bool {
        matches!(
            self,
            Instruction::If(..)
                | Instruction::IfICmp(..)
                | Instruction::IfNull(_)
                | Instruction::IfNonNull(_)
                | Instruction::Goto(_)
                | Instruction::Jsr(_)
        )
    }

    pub fn is_conditional_jump(&self) -> bool {
        matches!(
            self,
            Instruction::If(..) | Instruction::IfICmp(..) | Instruction::IfNull(_) | Instruction::IfNonNull(_)
        )
    }

    pub fn is_switch(&self) -> bool {
        matches!(self, Instruction::LookupSwitch { .. })
    }

    /// Method returns and `athrow`: control leaves the method.
    pub fn exits_method(&self) -> bool {
        matches!(
            self,
            Instruction::IReturn | Instruction::AReturn | Instruction::Return | Instruction::AThrow
        )
    }

    /// Whether execution may continue with the next instruction.
    ///
    /// `jsr` does not fall through: the subroutine's `ret` transfers
    /// control to the next instruction instead.
    pub fn can_fall_through(&self) -> bool {
        !matches!(
            self,
            Instruction::Goto(_)
                | Instruction::Jsr(_)
                | Instruction::Ret(_)
                | Instruction::LookupSwitch { .. }
                | Instruction::IReturn
                | Instruction::AReturn
                | Instruction::Return
                | Instruction::AThrow
        )
    }

    /// Whether this instruction may raise an exception and so must be
    /// covered by the handler ranges around it.
    pub fn can_throw(&self) -> bool {
        matches!(
            self,
            Instruction::IDiv
                | Instruction::IRem
                | Instruction::New(_)
                | Instruction::GetField(_)
                | Instruction::PutField(_)
                | Instruction::InvokeVirtual(_)
                | Instruction::InvokeStatic(_)
                | Instruction::InvokeSpecial(_)
                | Instruction::CheckCast(_)
                | Instruction::AThrow
        )
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())?;
        match self {
            Instruction::IConst(value) => write!(f, " {value}"),
            Instruction::BConst(value) => write!(f, " {value}"),
            Instruction::Ldc(value) => write!(f, " {value:?}"),
            Instruction::ILoad(slot)
            | Instruction::IStore(slot)
            | Instruction::ALoad(slot)
            | Instruction::AStore(slot)
            | Instruction::Ret(slot) => write!(f, " {slot}"),
            Instruction::If(_, target)
            | Instruction::IfICmp(_, target)
            | Instruction::IfNull(target)
            | Instruction::IfNonNull(target)
            | Instruction::Goto(target)
            | Instruction::Jsr(target) => write!(f, " {target}"),
            Instruction::LookupSwitch { default, cases } => {
                f.write_str(" {")?;
                for (key, target) in cases {
                    write!(f, " {key}: {target};")?;
                }
                write!(f, " default: {default} }}")
            }
            Instruction::New(class) | Instruction::CheckCast(class) | Instruction::InstanceOf(class) => {
                write!(f, " {class}")
            }
            Instruction::GetField(field)
            | Instruction::PutField(field)
            | Instruction::GetStatic(field)
            | Instruction::PutStatic(field) => write!(f, " {field}"),
            Instruction::InvokeVirtual(method)
            | Instruction::InvokeStatic(method)
            | Instruction::InvokeSpecial(method) => write!(f, " {method}"),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "../tests/instruction_tests.rs"]
mod instruction_tests;
