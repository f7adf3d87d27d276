//! Per-method state: the code builder, local slots and enclosing
//! `finally` subroutines.

use super::ClassContext;
use crate::error::{CodegenError, CodegenResult};
use crate::types::{
    ANY_CLASS, BOOLEAN_CLASS, INT_CLASS, UNIT_CLASS, UNIT_INSTANCE_FIELD, earlier_line_field, internal_name, value_desc,
};
use kite_bytecode::{
    CONSTRUCTOR_NAME, Code, CodeBuilder, Condition, FieldRef, Instruction, Label, MethodDescriptor, MethodRef, SlotKind,
    TypeDesc,
};
use kite_resolve::ResolvedCall;
use kite_syntax::NodeIndex;
use kite_types::{ClassId, DeclarationDescriptor, DescriptorId, KType, standard_class_ids};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::rc::Rc;

/// What an expression left on the stack: the type of the pushed value, or
/// `None` when it pushed nothing (`Unit`, `Nothing`, statements).
pub(super) type Pushed = Option<TypeDesc>;

#[derive(Clone, Debug)]
pub(super) struct Local {
    pub slot: u16,
    pub desc: TypeDesc,
}

pub(crate) struct MethodGenerator<'g> {
    pub(super) class: &'g ClassContext<'g>,
    code: CodeBuilder,
    name: String,
    pub(super) is_static: bool,
    pub(super) returns: TypeDesc,
    locals: FxHashMap<DescriptorId, Local>,
    /// Subroutines of the `finally` blocks around the code being
    /// generated, innermost last.
    pub(super) finally_blocks: SmallVec<[Label; 2]>,
}

impl<'g> MethodGenerator<'g> {
    pub fn new(
        class: &'g ClassContext<'g>,
        name: &str,
        is_static: bool,
        returns: TypeDesc,
        argument_slots: u16,
    ) -> Self {
        MethodGenerator {
            class,
            code: CodeBuilder::new(argument_slots),
            name: name.to_string(),
            is_static,
            returns,
            locals: FxHashMap::default(),
            finally_blocks: SmallVec::new(),
        }
    }

    pub fn finish(self) -> CodegenResult<Code> {
        let name = self.name;
        self.code.finish().map_err(|source| CodegenError::Build {
            method: format!("{}.{}", self.class.internal_name, name),
            source,
        })
    }

    // =========================================================================
    // Emission
    // =========================================================================

    pub fn is_reachable(&self) -> bool {
        self.code.is_reachable()
    }

    /// Emit `instruction` unless the current position is unreachable.
    pub fn emit(&mut self, instruction: Instruction) {
        if self.code.is_reachable() {
            self.code.emit(instruction);
        }
    }

    pub(super) fn new_label(&mut self) -> Label {
        self.code.new_label()
    }

    pub(super) fn new_local(&mut self) -> u16 {
        self.code.new_local()
    }

    pub(super) fn place(&mut self, label: Label) {
        self.code.place(label);
    }

    pub(super) fn goto(&mut self, label: Label) {
        if self.code.is_reachable() {
            self.code.goto(label);
        }
    }

    pub(super) fn jump_if(&mut self, condition: Condition, label: Label) {
        if self.code.is_reachable() {
            self.code.jump_if(condition, label);
        }
    }

    pub(super) fn jump_if_icmp(&mut self, condition: Condition, label: Label) {
        if self.code.is_reachable() {
            self.code.jump_if_icmp(condition, label);
        }
    }

    pub(super) fn jump_if_null(&mut self, label: Label) {
        if self.code.is_reachable() {
            self.code.jump_if_null(label);
        }
    }

    pub(super) fn jump_if_non_null(&mut self, label: Label) {
        if self.code.is_reachable() {
            self.code.jump_if_non_null(label);
        }
    }

    pub(super) fn jsr(&mut self, label: Label) {
        if self.code.is_reachable() {
            self.code.jsr(label);
        }
    }

    pub(super) fn exception_handler(&mut self, from: Label, to: Label, handler: Label, catch_type: Option<&str>) {
        self.code.exception_handler(from, to, handler, catch_type);
    }

    pub(super) fn stack(&self) -> Vec<SlotKind> {
        self.code.stack().to_vec()
    }

    pub fn mark_line(&mut self, node: NodeIndex) {
        if self.code.is_reachable() {
            let line = self.class.line_of(node);
            self.code.line(line);
        }
    }

    // =========================================================================
    // Locals
    // =========================================================================

    pub fn bind_parameter(&mut self, parameter: NodeIndex, slot: u16, desc: TypeDesc) -> CodegenResult<()> {
        let Some(DeclarationDescriptor::Variable(variable)) = self.class.trace.declaration(parameter) else {
            return Err(CodegenError::MissingBinding {
                node: parameter.0,
                what: "parameter declaration",
            });
        };
        self.locals.insert(variable.id, Local { slot, desc });
        Ok(())
    }

    /// Allocate a slot for the variable `id`.
    pub(super) fn declare_local(&mut self, id: DescriptorId, desc: TypeDesc) -> Local {
        let local = Local {
            slot: self.code.new_local(),
            desc,
        };
        self.locals.insert(id, local.clone());
        local
    }

    pub(super) fn local(&self, id: DescriptorId, node: NodeIndex) -> CodegenResult<Local> {
        self.locals.get(&id).cloned().ok_or(CodegenError::MissingBinding {
            node: node.0,
            what: "local slot",
        })
    }

    pub fn load_slot(&mut self, slot: u16, desc: &TypeDesc) {
        self.emit(if desc.is_integral() {
            Instruction::ILoad(slot)
        } else {
            Instruction::ALoad(slot)
        });
    }

    pub(super) fn store_slot(&mut self, slot: u16, desc: &TypeDesc) {
        self.emit(if desc.is_integral() {
            Instruction::IStore(slot)
        } else {
            Instruction::AStore(slot)
        });
    }

    // =========================================================================
    // Values
    // =========================================================================

    /// Convert what an expression pushed to the value `target` expects;
    /// a `None` target discards it.
    pub(super) fn coerce(&mut self, pushed: Pushed, target: Option<&TypeDesc>) {
        match (pushed, target) {
            (None, None) => {}
            (Some(_), None) => self.emit(Instruction::Pop),
            (None, Some(TypeDesc::Object(_))) => self.push_unit(),
            (None, Some(_)) => {}
            (Some(from), Some(to)) => self.cast(&from, to),
        }
    }

    fn cast(&mut self, from: &TypeDesc, to: &TypeDesc) {
        if from == to {
            return;
        }
        match (from, to) {
            (TypeDesc::Object(_), TypeDesc::Int) => self.emit(Instruction::CheckCast(INT_CLASS.into())),
            (TypeDesc::Object(_), TypeDesc::Boolean) => self.emit(Instruction::CheckCast(BOOLEAN_CLASS.into())),
            // Values of erased type parameters.
            (TypeDesc::Object(from), TypeDesc::Object(to)) if &**from == ANY_CLASS && &**to != ANY_CLASS => {
                self.emit(Instruction::CheckCast(to.clone()))
            }
            _ => {}
        }
    }

    pub(super) fn push_unit(&mut self) {
        self.emit(Instruction::GetStatic(FieldRef::new(
            UNIT_CLASS,
            UNIT_INSTANCE_FIELD,
            TypeDesc::object(UNIT_CLASS),
        )));
    }

    /// Return the value on the stack (or nothing) as this method returns.
    pub fn emit_return(&mut self) {
        self.emit(match self.returns {
            TypeDesc::Void => Instruction::Return,
            TypeDesc::Int | TypeDesc::Boolean => Instruction::IReturn,
            TypeDesc::Object(_) => Instruction::AReturn,
        });
    }

    /// Throw an `IllegalStateException` with `message`.
    pub fn throw_illegal_state(&mut self, message: &str) {
        let class = internal_name(&standard_class_ids::illegal_state_exception());
        self.emit(Instruction::New(class.as_str().into()));
        self.emit(Instruction::Dup);
        self.emit(Instruction::Ldc(message.into()));
        self.emit(Instruction::InvokeSpecial(MethodRef::new(
            &class,
            CONSTRUCTOR_NAME,
            MethodDescriptor::new(vec![TypeDesc::object(&internal_name(&standard_class_ids::string()))], TypeDesc::Void),
        )));
        self.emit(Instruction::AThrow);
    }

    // =========================================================================
    // Analysis lookups
    // =========================================================================

    pub(super) fn node_type(&self, node: NodeIndex) -> Option<KType> {
        self.class.trace.expression_type(node)
    }

    /// The class-file type of the value `node` evaluates to.
    pub(super) fn node_desc(&self, node: NodeIndex) -> Option<TypeDesc> {
        self.node_type(node).and_then(|ty| value_desc(&ty))
    }

    pub(super) fn resolved_call(&self, node: NodeIndex) -> CodegenResult<Rc<ResolvedCall>> {
        self.class.trace.resolved_call(node).ok_or(CodegenError::MissingBinding {
            node: node.0,
            what: "resolved call",
        })
    }

    // =========================================================================
    // Script instances
    // =========================================================================

    /// Push the instance whose class is `owner`: this line, or an earlier
    /// line reached through its `$lineK` field.
    pub(super) fn load_line_instance(&mut self, owner: &ClassId) -> CodegenResult<()> {
        if self.is_static || !self.class.is_line_class(owner) {
            return Err(CodegenError::NoReceiver {
                class: owner.to_string(),
            });
        }
        self.emit(Instruction::ALoad(0));
        if *owner != self.class.class_id {
            let line = internal_name(owner);
            self.emit(Instruction::GetField(FieldRef::new(
                &self.class.internal_name,
                &earlier_line_field(owner),
                TypeDesc::object(&line),
            )));
        }
        Ok(())
    }
}
