// =============================================================================
// Branches, loops, exceptions and returns
// =============================================================================

use super::method::{MethodGenerator, Pushed};
use crate::error::{CodegenError, CodegenResult};
use crate::types::{ANY_CLASS, internal_name};
use kite_bytecode::{Condition, Instruction, Label, SlotKind, TypeDesc};
use kite_syntax::{NodeIndex, NodeKind};
use kite_types::DeclarationDescriptor;

impl MethodGenerator<'_> {
    pub(super) fn if_expression(
        &mut self,
        node: NodeIndex,
        condition: NodeIndex,
        then_branch: NodeIndex,
        else_branch: NodeIndex,
    ) -> CodegenResult<Pushed> {
        let target = self.node_desc(node);
        let otherwise = self.new_label();
        self.branch(condition, false, otherwise)?;
        if else_branch.is_none() {
            self.statement(then_branch)?;
            self.place(otherwise);
            return Ok(None);
        }

        let done = self.new_label();
        self.branch_value(then_branch, target.as_ref())?;
        self.goto(done);
        self.place(otherwise);
        self.branch_value(else_branch, target.as_ref())?;
        self.place(done);
        Ok(target)
    }

    /// One arm of a conditional: its value as `target`, or a statement.
    fn branch_value(&mut self, node: NodeIndex, target: Option<&TypeDesc>) -> CodegenResult<()> {
        match target {
            Some(_) => self.expression_as(node, target),
            None => self.statement(node),
        }
    }

    pub(super) fn when_expression(
        &mut self,
        node: NodeIndex,
        subject: NodeIndex,
        entries: &[NodeIndex],
    ) -> CodegenResult<Pushed> {
        let arena = self.class.arena;
        let target = self.node_desc(node);
        let done = self.new_label();

        let subject = if subject.is_some() {
            let pushed = self.expression(subject)?;
            let desc = pushed.unwrap_or_else(|| TypeDesc::object(ANY_CLASS));
            let slot = self.new_local();
            self.store_slot(slot, &desc);
            Some((slot, desc))
        } else {
            None
        };

        for &entry in entries {
            let NodeKind::WhenEntry { conditions, body } = arena.kind(entry) else {
                continue;
            };
            self.mark_line(entry);
            if conditions.is_empty() {
                self.branch_value(*body, target.as_ref())?;
                self.goto(done);
                continue;
            }
            let matched = self.new_label();
            let next = self.new_label();
            for &condition in conditions {
                match &subject {
                    Some((slot, desc)) => self.subject_matches(*slot, desc, condition, matched)?,
                    None => self.branch(condition, true, matched)?,
                }
            }
            self.goto(next);
            self.place(matched);
            self.branch_value(*body, target.as_ref())?;
            self.goto(done);
            self.place(next);
        }
        self.place(done);
        Ok(target)
    }

    /// Jump to `matched` when the `when` subject in `slot` equals the
    /// value of `condition`.
    fn subject_matches(
        &mut self,
        slot: u16,
        desc: &TypeDesc,
        condition: NodeIndex,
        matched: Label,
    ) -> CodegenResult<()> {
        if matches!(self.class.arena.kind(condition), NodeKind::NullLiteral) {
            if !desc.is_integral() {
                self.load_slot(slot, desc);
                self.jump_if_null(matched);
            }
            return Ok(());
        }
        let condition_desc = self.node_desc(condition);
        if desc.is_integral() && condition_desc.as_ref() == Some(desc) {
            self.load_slot(slot, desc);
            self.expression_as(condition, Some(desc))?;
            self.jump_if_icmp(Condition::Eq, matched);
            return Ok(());
        }
        let any = TypeDesc::object(ANY_CLASS);
        self.load_slot(slot, desc);
        self.expression_as(condition, Some(&any))?;
        self.invoke_are_equal();
        self.jump_if(Condition::Ne, matched);
        Ok(())
    }

    pub(super) fn while_loop(&mut self, condition: NodeIndex, body: NodeIndex) -> CodegenResult<()> {
        let top = self.new_label();
        let done = self.new_label();
        self.place(top);
        self.branch(condition, false, done)?;
        self.statement(body)?;
        self.goto(top);
        self.place(done);
        Ok(())
    }

    // =========================================================================
    // try / catch / finally
    // =========================================================================

    /// Handlers start with an empty stack, so whatever the enclosing
    /// expression has pushed is moved to locals first and restored after.
    pub(super) fn try_expression(
        &mut self,
        node: NodeIndex,
        body: NodeIndex,
        catches: &[NodeIndex],
        finally: NodeIndex,
    ) -> CodegenResult<Pushed> {
        let arena = self.class.arena;
        let target = self.node_desc(node);
        let spilled = self.spill_stack();
        let result = target.as_ref().map(|_| self.new_local());
        let subroutine = finally.is_some().then(|| self.new_label());

        let start = self.new_label();
        let end = self.new_label();
        let done = self.new_label();
        if let Some(subroutine) = subroutine {
            self.finally_blocks.push(subroutine);
        }

        self.place(start);
        self.branch_value(body, target.as_ref())?;
        self.store_result(result, target.as_ref());
        self.place(end);

        let handlers: Vec<Label> = catches.iter().map(|_| self.new_label()).collect();
        for (&catch, &handler) in catches.iter().zip(&handlers) {
            let class = self.caught_class(catch)?;
            self.exception_handler(start, end, handler, Some(&class));
        }
        let catch_all = subroutine.map(|_| self.new_label());
        if let Some(catch_all) = catch_all {
            self.exception_handler(start, end, catch_all, None);
        }
        self.leave_try(subroutine, done);

        for (&catch, &handler) in catches.iter().zip(&handlers) {
            let NodeKind::Catch { body, .. } = arena.kind(catch) else {
                continue;
            };
            self.place(handler);
            let catch_start = self.new_label();
            let catch_end = self.new_label();
            self.place(catch_start);
            self.mark_line(catch);
            let variable = self.catch_variable(catch)?;
            self.emit(Instruction::AStore(variable));
            self.branch_value(*body, target.as_ref())?;
            self.store_result(result, target.as_ref());
            self.place(catch_end);
            if let Some(catch_all) = catch_all {
                self.exception_handler(catch_start, catch_end, catch_all, None);
            }
            self.leave_try(subroutine, done);
        }

        if let (Some(subroutine), Some(catch_all)) = (subroutine, catch_all) {
            self.finally_blocks.pop();

            self.place(catch_all);
            let thrown = self.new_local();
            self.emit(Instruction::AStore(thrown));
            self.jsr(subroutine);
            self.emit(Instruction::ALoad(thrown));
            self.emit(Instruction::AThrow);

            self.place(subroutine);
            let address = self.new_local();
            self.emit(Instruction::AStore(address));
            self.statement(finally)?;
            self.emit(Instruction::Ret(address));
        }

        self.place(done);
        self.restore_stack(&spilled);
        if let (Some(slot), Some(desc)) = (result, &target) {
            self.load_slot(slot, desc);
        }
        Ok(target)
    }

    fn caught_class(&self, catch: NodeIndex) -> CodegenResult<String> {
        match self.class.trace.declaration(catch) {
            Some(DeclarationDescriptor::Variable(variable)) => variable
                .ty
                .class_id()
                .map(internal_name)
                .ok_or_else(|| CodegenError::Unsupported {
                    what: format!("catching {}", variable.ty),
                }),
            _ => Err(CodegenError::MissingBinding {
                node: catch.0,
                what: "catch parameter",
            }),
        }
    }

    fn catch_variable(&mut self, catch: NodeIndex) -> CodegenResult<u16> {
        match self.class.trace.declaration(catch) {
            Some(DeclarationDescriptor::Variable(variable)) => {
                let desc = TypeDesc::object(&self.caught_class(catch)?);
                Ok(self.declare_local(variable.id, desc).slot)
            }
            _ => Err(CodegenError::MissingBinding {
                node: catch.0,
                what: "catch parameter",
            }),
        }
    }

    fn store_result(&mut self, result: Option<u16>, target: Option<&TypeDesc>) {
        if let (Some(slot), Some(desc)) = (result, target) {
            self.store_slot(slot, desc);
        }
    }

    /// Normal exit from a protected region: run `finally`, then continue
    /// after the `try`.
    fn leave_try(&mut self, subroutine: Option<Label>, done: Label) {
        if let Some(subroutine) = subroutine {
            self.jsr(subroutine);
        }
        self.goto(done);
    }

    /// Move the operand stack into fresh locals, top first.
    fn spill_stack(&mut self) -> Vec<(u16, SlotKind)> {
        let stack = self.stack();
        let mut spilled = Vec::with_capacity(stack.len());
        for &kind in stack.iter().rev() {
            let slot = self.new_local();
            self.emit(match kind {
                SlotKind::Int => Instruction::IStore(slot),
                _ => Instruction::AStore(slot),
            });
            spilled.push((slot, kind));
        }
        spilled
    }

    fn restore_stack(&mut self, spilled: &[(u16, SlotKind)]) {
        for &(slot, kind) in spilled.iter().rev() {
            self.emit(match kind {
                SlotKind::Int => Instruction::ILoad(slot),
                _ => Instruction::ALoad(slot),
            });
        }
    }

    // =========================================================================
    // return
    // =========================================================================

    /// `return value`: runs the enclosing `finally` blocks, innermost
    /// first, before leaving the method.
    pub fn return_value(&mut self, value: NodeIndex) -> CodegenResult<()> {
        let returns = self.returns.clone();
        let value_desc = (!returns.is_void()).then_some(returns.clone());
        if value.is_some() {
            self.expression_as(value, value_desc.as_ref())?;
        }
        if !self.finally_blocks.is_empty() && self.is_reachable() {
            let saved = value_desc.as_ref().map(|desc| {
                let slot = self.new_local();
                self.store_slot(slot, desc);
                slot
            });
            for _ in 0..self.stack().len() {
                self.emit(Instruction::Pop);
            }
            let subroutines: Vec<Label> = self.finally_blocks.iter().rev().copied().collect();
            for subroutine in subroutines {
                self.jsr(subroutine);
            }
            if let (Some(slot), Some(desc)) = (saved, &value_desc) {
                self.load_slot(slot, desc);
            }
        }
        self.emit_return();
        Ok(())
    }
}
