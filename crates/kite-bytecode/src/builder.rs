//! Emitting method bodies with symbolic labels.
//!
//! [`CodeBuilder`] appends instructions and resolves forward jumps when the
//! body is finished. It also follows the operand stack as code is emitted,
//! so callers can ask what is on the stack at any point (code generation
//! spills it around `try`, whose handlers start with an empty stack).

use crate::class_file::{Code, ExceptionEntry, LineNumber};
use crate::error::BuildError;
use crate::instruction::{Condition, Instruction, Offset};
use crate::stack::{Frame, SlotKind};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Label(u32);

#[derive(Debug)]
struct PendingHandler {
    from: Label,
    to: Label,
    handler: Label,
    catch_type: Option<Arc<str>>,
}

#[derive(Debug)]
pub struct CodeBuilder {
    instructions: Vec<Instruction>,
    labels: Vec<Option<Offset>>,
    /// Frame recorded by the first jump to each label.
    label_frames: Vec<Option<Frame>>,
    handlers: Vec<PendingHandler>,
    line_numbers: Vec<LineNumber>,
    /// `None` while emitting unreachable code.
    frame: Option<Frame>,
    max_stack: usize,
    next_local: u16,
    max_locals: u16,
    error: Option<BuildError>,
}

impl CodeBuilder {
    /// A builder for a method whose arguments occupy the first
    /// `argument_slots` locals.
    pub fn new(argument_slots: u16) -> Self {
        CodeBuilder {
            instructions: Vec::new(),
            labels: Vec::new(),
            label_frames: Vec::new(),
            handlers: Vec::new(),
            line_numbers: Vec::new(),
            frame: Some(Frame::default()),
            max_stack: 0,
            next_local: argument_slots,
            max_locals: argument_slots,
            error: None,
        }
    }

    pub fn offset(&self) -> Offset {
        self.instructions.len() as Offset
    }

    /// Whether the next instruction can be reached.
    pub fn is_reachable(&self) -> bool {
        self.frame.is_some()
    }

    /// The operand stack before the next instruction; empty when
    /// unreachable.
    pub fn stack(&self) -> &[SlotKind] {
        self.frame.as_ref().map_or(&[], |frame| &frame.stack)
    }

    /// Allocate a fresh local slot.
    pub fn new_local(&mut self) -> u16 {
        let slot = self.next_local;
        self.next_local += 1;
        self.max_locals = self.max_locals.max(self.next_local);
        slot
    }

    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        self.label_frames.push(None);
        Label(self.labels.len() as u32 - 1)
    }

    /// Bind `label` to the next instruction.
    pub fn place(&mut self, label: Label) {
        self.labels[label.0 as usize] = Some(self.offset());
        if self.frame.is_none() {
            self.frame = self.label_frames[label.0 as usize].clone();
        }
    }

    /// Record the source line of the code emitted next.
    pub fn line(&mut self, line: u32) {
        if self.line_numbers.last().is_some_and(|entry| entry.line == line) {
            return;
        }
        let offset = self.offset();
        if let Some(last) = self.line_numbers.last_mut().filter(|entry| entry.offset == offset) {
            last.line = line;
        } else {
            self.line_numbers.push(LineNumber { offset, line });
        }
    }

    pub fn emit(&mut self, instruction: Instruction) {
        let offset = self.offset();
        if let Some(frame) = &mut self.frame {
            match frame.step(&instruction) {
                Ok(()) => self.max_stack = self.max_stack.max(frame.stack.len()),
                Err(source) => {
                    self.error.get_or_insert(BuildError::Stack { offset, source });
                }
            }
        }
        let ends_flow = !instruction.can_fall_through();
        self.instructions.push(instruction);
        if ends_flow {
            self.frame = None;
        }
    }

    fn record_target(&mut self, label: Label, frame: Frame) {
        let slot = &mut self.label_frames[label.0 as usize];
        if slot.is_none() {
            *slot = Some(frame);
        }
    }

    fn emit_jump(&mut self, instruction: Instruction, label: Label) {
        self.emit(instruction);
        if let Some(frame) = self.frame.clone() {
            self.record_target(label, frame);
        }
    }

    pub fn goto(&mut self, label: Label) {
        if let Some(frame) = self.frame.clone() {
            self.record_target(label, frame);
        }
        self.emit(Instruction::Goto(label.0));
    }

    /// Pop an integer; jump when it compares to zero as `condition`.
    pub fn jump_if(&mut self, condition: Condition, label: Label) {
        self.emit_jump(Instruction::If(condition, label.0), label);
    }

    pub fn jump_if_icmp(&mut self, condition: Condition, label: Label) {
        self.emit_jump(Instruction::IfICmp(condition, label.0), label);
    }

    pub fn jump_if_null(&mut self, label: Label) {
        self.emit_jump(Instruction::IfNull(label.0), label);
    }

    pub fn jump_if_non_null(&mut self, label: Label) {
        self.emit_jump(Instruction::IfNonNull(label.0), label);
    }

    /// Call the subroutine at `label`. Code after the `jsr` runs when it
    /// returns, with the stack as it was before the call.
    pub fn jsr(&mut self, label: Label) {
        let resume = self.frame.clone();
        if let Some(mut target) = resume.clone() {
            target.stack.push(SlotKind::ReturnAddress);
            self.max_stack = self.max_stack.max(target.stack.len());
            self.record_target(label, target);
        }
        self.instructions.push(Instruction::Jsr(label.0));
        self.frame = resume;
    }

    pub fn lookup_switch(&mut self, default: Label, cases: &[(i32, Label)]) {
        let instruction = Instruction::LookupSwitch {
            default: default.0,
            cases: cases.iter().map(|(key, label)| (*key, label.0)).collect(),
        };
        let mut after = self.frame.clone();
        if let Some(frame) = &mut after {
            frame.stack.pop();
        }
        self.emit(instruction);
        if let Some(frame) = after {
            self.record_target(default, frame.clone());
            for (_, label) in cases {
                self.record_target(*label, frame.clone());
            }
        }
    }

    /// Protect `from..to` with the handler at `handler`, which starts with
    /// the thrown exception alone on the stack. Call it while the
    /// protected code's frame is current, before placing `handler`.
    pub fn exception_handler(&mut self, from: Label, to: Label, handler: Label, catch_type: Option<&str>) {
        let entry = match &self.frame {
            Some(frame) => frame.for_handler(),
            None => Frame {
                stack: vec![SlotKind::Reference],
                locals: Vec::new(),
            },
        };
        self.record_target(handler, entry);
        self.max_stack = self.max_stack.max(1);
        self.handlers.push(PendingHandler {
            from,
            to,
            handler,
            catch_type: catch_type.map(Arc::from),
        });
    }

    fn resolve(&self, label: u32) -> Result<Offset, BuildError> {
        self.labels
            .get(label as usize)
            .copied()
            .flatten()
            .ok_or(BuildError::UnboundLabel(label))
    }

    pub fn finish(mut self) -> Result<Code, BuildError> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        let mut instructions = std::mem::take(&mut self.instructions);
        let mut unbound = None;
        for instruction in &mut instructions {
            instruction.map_targets(|label| match self.labels.get(label as usize).copied().flatten() {
                Some(offset) => offset,
                None => {
                    unbound.get_or_insert(label);
                    label
                }
            });
        }
        if let Some(label) = unbound {
            return Err(BuildError::UnboundLabel(label));
        }
        let mut exception_table = Vec::with_capacity(self.handlers.len());
        for pending in &self.handlers {
            let from = self.resolve(pending.from.0)?;
            let to = self.resolve(pending.to.0)?;
            // An empty range protects nothing.
            if from == to {
                continue;
            }
            exception_table.push(ExceptionEntry {
                from,
                to,
                handler: self.resolve(pending.handler.0)?,
                catch_type: pending.catch_type.clone(),
            });
        }
        Ok(Code {
            max_stack: self.max_stack.min(u16::MAX as usize) as u16,
            max_locals: self.max_locals,
            instructions,
            exception_table,
            line_numbers: self.line_numbers,
        })
    }
}

#[cfg(test)]
#[path = "../tests/builder_tests.rs"]
mod builder_tests;
