//! Splitting a method body into basic blocks.

use super::{BasicBlock, BlockId, ControlFlowGraph, ExceptionRange};
use crate::class_file::Code;
use crate::error::CfgError;
use crate::instruction::{Instruction, Offset};
use fixedbitset::FixedBitSet;
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashSet};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, trace};

impl ControlFlowGraph {
    /// Build the graph of `code`, including exception and subroutine edges.
    pub fn build_blocks(code: &Code) -> Result<ControlFlowGraph, CfgError> {
        let instructions = &code.instructions;
        let len = instructions.len();
        if len == 0 {
            return Err(CfgError::EmptyCode);
        }
        check_bounds(code)?;

        let starts = instruction_starts(code);
        let mut graph = ControlFlowGraph {
            blocks: IndexMap::default(),
            entry: 0,
            sink: 0,
            exceptions: Vec::new(),
            subroutines: IndexMap::default(),
            return_sites: IndexMap::default(),
            next_id: 0,
        };

        // Block owning each instruction.
        let mut block_at: Vec<BlockId> = Vec::with_capacity(len);
        for (offset, instruction) in instructions.iter().enumerate() {
            if starts.contains(offset) {
                let id = graph.fresh_id();
                graph.blocks.insert(id, BasicBlock::new(id));
            }
            let id = graph.next_id - 1;
            let block = graph.get_mut(id);
            block.instructions.push(instruction.clone());
            block.offsets.push(offset as Offset);
            block_at.push(id);
        }
        let sink = graph.fresh_id();
        graph.blocks.insert(sink, BasicBlock::new(sink));
        graph.sink = sink;

        graph.connect_blocks(&block_at)?;
        graph.connect_exceptions(code, &block_at);
        graph.connect_subroutines();

        debug!(
            blocks = graph.blocks.len(),
            exception_ranges = graph.exceptions.len(),
            subroutines = graph.subroutines.len(),
            "built control-flow graph"
        );
        Ok(graph)
    }

    fn connect_blocks(&mut self, block_at: &[BlockId]) -> Result<(), CfgError> {
        let ids: Vec<BlockId> = self.blocks.keys().copied().filter(|id| *id != self.sink).collect();
        for (index, &id) in ids.iter().enumerate() {
            let next = ids.get(index + 1).copied();
            let block = self.get(id);
            let (Some(last), Some(&offset)) = (block.last_instruction().cloned(), block.offsets.last()) else {
                continue;
            };
            let falls_off = CfgError::FallsOffEnd { offset };
            match &last {
                Instruction::Jsr(target) => {
                    self.add_successor(id, block_at[*target as usize]);
                    let next = next.ok_or(CfgError::JsrWithoutReturn { offset })?;
                    self.return_sites.insert(id, next);
                }
                Instruction::Ret(_) => {}
                instruction if instruction.is_jump() || instruction.is_switch() => {
                    for target in instruction.jump_targets() {
                        self.add_successor(id, block_at[target as usize]);
                    }
                    if instruction.is_conditional_jump() {
                        self.add_successor(id, next.ok_or(falls_off)?);
                    }
                }
                instruction if instruction.exits_method() => self.add_successor(id, self.sink),
                _ => self.add_successor(id, next.ok_or(falls_off)?),
            }
        }
        Ok(())
    }

    fn connect_exceptions(&mut self, code: &Code, block_at: &[BlockId]) {
        let mut merged: IndexMap<(Offset, Offset, Offset), Vec<Option<Arc<str>>>, FxBuildHasher> =
            IndexMap::default();
        for entry in &code.exception_table {
            merged
                .entry((entry.from, entry.to, entry.handler))
                .or_default()
                .push(entry.catch_type.clone());
        }
        for ((from, to, handler), catch_types) in merged {
            let handler = block_at[handler as usize];
            let protected: Vec<BlockId> = self
                .blocks
                .values()
                .filter(|block| block.start_offset().is_some_and(|start| from <= start && start < to))
                .map(|block| block.id)
                .collect();
            for &block in &protected {
                self.add_exception_successor(block, handler);
            }
            trace!(from, to, handler, blocks = protected.len(), "exception range");
            self.exceptions.push(ExceptionRange {
                protected,
                handler,
                catch_types,
            });
        }
    }

    /// Add an edge from every `ret` to the block after the `jsr` it
    /// returns to. Each `jsr` is followed forward with a stack of the
    /// subroutine calls in flight on that path; a `ret` returns from the
    /// innermost one.
    fn connect_subroutines(&mut self) {
        let calls: Vec<BlockId> = self.return_sites.keys().copied().collect();
        for call in calls {
            let Some(&target) = self.get(call).successors.first() else {
                continue;
            };
            let mut visited: FxHashSet<(BlockId, Vec<BlockId>)> = FxHashSet::default();
            let mut queue: VecDeque<(BlockId, Vec<BlockId>)> = VecDeque::new();
            queue.push_back((target, vec![call]));
            while let Some((node, mut stack)) = queue.pop_front() {
                if !visited.insert((node, stack.clone())) {
                    continue;
                }
                let block = self.get(node);
                if block.ends_with_ret() {
                    let Some(returning) = stack.pop() else {
                        continue;
                    };
                    let Some(&resume) = self.return_sites.get(&returning) else {
                        continue;
                    };
                    self.add_successor(node, resume);
                    if stack.is_empty() {
                        self.subroutines.insert(call, resume);
                    } else {
                        queue.push_back((resume, stack));
                    }
                } else if block.ends_with_jsr() {
                    // A subroutine calling itself never returns to a fixed site.
                    if stack.contains(&node) {
                        continue;
                    }
                    if let Some(&inner) = block.successors.first() {
                        stack.push(node);
                        queue.push_back((inner, stack));
                    }
                } else {
                    for &successor in &block.successors {
                        if successor != self.sink {
                            queue.push_back((successor, stack.clone()));
                        }
                    }
                }
            }
        }
    }
}

fn check_bounds(code: &Code) -> Result<(), CfgError> {
    let len = code.instructions.len() as Offset;
    for (offset, instruction) in code.instructions.iter().enumerate() {
        if let Some(target) = instruction.jump_targets().into_iter().find(|target| *target >= len) {
            return Err(CfgError::JumpOutOfRange {
                offset: offset as Offset,
                target,
            });
        }
    }
    for entry in &code.exception_table {
        if entry.from >= entry.to || entry.to > len || entry.handler >= len {
            return Err(CfgError::BadExceptionRange {
                from: entry.from,
                to: entry.to,
                handler: entry.handler,
            });
        }
    }
    Ok(())
}

/// Offsets that begin a basic block.
fn instruction_starts(code: &Code) -> FixedBitSet {
    let len = code.instructions.len();
    let mut starts = FixedBitSet::with_capacity(len + 1);
    starts.insert(0);
    for (offset, instruction) in code.instructions.iter().enumerate() {
        for target in instruction.jump_targets() {
            starts.insert(target as usize);
        }
        let ends_block = instruction.is_jump()
            || instruction.is_switch()
            || instruction.exits_method()
            || matches!(instruction, Instruction::Ret(_));
        if ends_block {
            starts.insert(offset + 1);
        }
    }
    for entry in &code.exception_table {
        starts.insert(entry.from as usize);
        starts.insert(entry.to as usize);
        starts.insert(entry.handler as usize);
    }
    starts
}
