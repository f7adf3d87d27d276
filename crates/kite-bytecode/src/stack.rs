//! Abstract interpretation of the operand stack and locals.
//!
//! A [`Frame`] tracks the kind of every stack slot and local. Integers
//! and references are interchangeable as far as this model cares; what
//! it exists for is telling return addresses (pushed by `jsr`) apart
//! from every other value.

use crate::class_file::MethodInfo;
use crate::instruction::{Instruction, TypeDesc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum SlotKind {
    Int,
    Reference,
    ReturnAddress,
}

impl SlotKind {
    /// The kind of a value of type `ty`; `None` for `void`.
    pub fn of(ty: &TypeDesc) -> Option<SlotKind> {
        match ty {
            TypeDesc::Int | TypeDesc::Boolean => Some(SlotKind::Int),
            TypeDesc::Object(_) => Some(SlotKind::Reference),
            TypeDesc::Void => None,
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SlotKind::Int => "int",
            SlotKind::Reference => "ref",
            SlotKind::ReturnAddress => "address",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    #[error("{mnemonic} needs {needed} operand(s), found {found}")]
    Underflow {
        mnemonic: &'static str,
        needed: usize,
        found: usize,
    },
    #[error("{mnemonic} cannot consume a return address")]
    ReturnAddressMisuse { mnemonic: &'static str },
    #[error("ret reads local {slot}, which does not hold a return address")]
    NotAReturnAddress { slot: u16 },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    pub stack: Vec<SlotKind>,
    pub locals: Vec<Option<SlotKind>>,
}

impl Frame {
    /// The frame on entry to `method`: arguments in the first locals.
    pub fn for_method(method: &MethodInfo) -> Frame {
        let mut locals = Vec::with_capacity(method.argument_slots() as usize);
        if !method.is_static() {
            locals.push(Some(SlotKind::Reference));
        }
        locals.extend(method.descriptor.parameters.iter().map(SlotKind::of));
        Frame {
            stack: Vec::new(),
            locals,
        }
    }

    /// The frame on entry to an exception handler reached from this one.
    pub fn for_handler(&self) -> Frame {
        Frame {
            stack: vec![SlotKind::Reference],
            locals: self.locals.clone(),
        }
    }

    pub fn top(&self) -> Option<SlotKind> {
        self.stack.last().copied()
    }

    fn pop_n(&mut self, instruction: &Instruction, count: usize) -> Result<(), StackError> {
        let found = self.stack.len();
        if found < count {
            return Err(StackError::Underflow {
                mnemonic: instruction.mnemonic(),
                needed: count,
                found,
            });
        }
        if self.stack[found - count..].contains(&SlotKind::ReturnAddress) {
            return Err(StackError::ReturnAddressMisuse {
                mnemonic: instruction.mnemonic(),
            });
        }
        self.stack.truncate(found - count);
        Ok(())
    }

    fn pop_any(&mut self, instruction: &Instruction) -> Result<SlotKind, StackError> {
        self.stack.pop().ok_or(StackError::Underflow {
            mnemonic: instruction.mnemonic(),
            needed: 1,
            found: 0,
        })
    }

    fn set_local(&mut self, slot: u16, kind: SlotKind) {
        let slot = slot as usize;
        if self.locals.len() <= slot {
            self.locals.resize(slot + 1, None);
        }
        self.locals[slot] = Some(kind);
    }

    /// Apply the stack effect of one instruction.
    ///
    /// `jsr` pushes the return address its subroutine will see, so the
    /// resulting frame is the one at the jump target.
    pub fn step(&mut self, instruction: &Instruction) -> Result<(), StackError> {
        use Instruction as I;
        match instruction {
            I::Nop | I::Goto(_) | I::Return => {}
            I::AConstNull | I::Ldc(_) | I::New(_) => self.stack.push(SlotKind::Reference),
            I::IConst(_) | I::BConst(_) | I::ILoad(_) => self.stack.push(SlotKind::Int),
            I::ALoad(_) => self.stack.push(SlotKind::Reference),
            I::IStore(slot) => {
                self.pop_n(instruction, 1)?;
                self.set_local(*slot, SlotKind::Int);
            }
            I::AStore(slot) => {
                let kind = self.pop_any(instruction)?;
                self.set_local(*slot, kind);
            }
            I::Pop => {
                self.pop_any(instruction)?;
            }
            I::Dup => {
                let top = self.top().ok_or(StackError::Underflow {
                    mnemonic: "dup",
                    needed: 1,
                    found: 0,
                })?;
                self.stack.push(top);
            }
            I::Swap => {
                let len = self.stack.len();
                if len < 2 {
                    return Err(StackError::Underflow {
                        mnemonic: "swap",
                        needed: 2,
                        found: len,
                    });
                }
                self.stack.swap(len - 1, len - 2);
            }
            I::IAdd | I::ISub | I::IMul | I::IDiv | I::IRem => {
                self.pop_n(instruction, 2)?;
                self.stack.push(SlotKind::Int);
            }
            I::INeg => {
                self.pop_n(instruction, 1)?;
                self.stack.push(SlotKind::Int);
            }
            I::If(..) | I::IfNull(_) | I::IfNonNull(_) | I::LookupSwitch { .. } => self.pop_n(instruction, 1)?,
            I::IfICmp(..) => self.pop_n(instruction, 2)?,
            I::Jsr(_) => self.stack.push(SlotKind::ReturnAddress),
            I::Ret(slot) => {
                let held = self.locals.get(*slot as usize).copied().flatten();
                if held != Some(SlotKind::ReturnAddress) {
                    return Err(StackError::NotAReturnAddress { slot: *slot });
                }
            }
            I::GetField(field) => {
                self.pop_n(instruction, 1)?;
                self.stack.extend(SlotKind::of(&field.ty));
            }
            I::PutField(_) => self.pop_n(instruction, 2)?,
            I::GetStatic(field) => self.stack.extend(SlotKind::of(&field.ty)),
            I::PutStatic(_) => self.pop_n(instruction, 1)?,
            I::InvokeVirtual(method) | I::InvokeSpecial(method) => {
                self.pop_n(instruction, method.descriptor.parameters.len() + 1)?;
                self.stack.extend(SlotKind::of(&method.descriptor.returns));
            }
            I::InvokeStatic(method) => {
                self.pop_n(instruction, method.descriptor.parameters.len())?;
                self.stack.extend(SlotKind::of(&method.descriptor.returns));
            }
            I::CheckCast(_) => {
                self.pop_n(instruction, 1)?;
                self.stack.push(SlotKind::Reference);
            }
            I::InstanceOf(_) => {
                self.pop_n(instruction, 1)?;
                self.stack.push(SlotKind::Int);
            }
            I::AThrow | I::IReturn | I::AReturn => self.pop_n(instruction, 1)?,
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/stack_tests.rs"]
mod stack_tests;
