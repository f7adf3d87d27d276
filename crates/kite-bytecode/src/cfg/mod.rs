//! Control-flow graphs of method bodies.
//!
//! [`ControlFlowGraph::build_blocks`] splits a method's instructions into
//! basic blocks and connects them with normal edges, exception edges
//! (from every protected block to its handler) and subroutine edges (from
//! each `ret` back to the block following the matching `jsr`). Every
//! block that leaves the method is wired to a dedicated empty sink block.
//!
//! The graph is mutated only by [`ControlFlowGraph::inline_jsr`], which
//! gives every `jsr` call site a private copy of its subroutine and then
//! deletes the `jsr`/`ret` plumbing, and [`ControlFlowGraph::remove_block`].
//! Both keep edges symmetric: `b` is in `a`'s successors exactly when `a`
//! is in `b`'s predecessors, separately for normal and exception edges.

mod build;
mod dominators;
mod jsr;
mod verify;

pub use dominators::Dominators;

use crate::instruction::{Instruction, Offset};
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashSet};
use smallvec::SmallVec;
use std::fmt::Write as _;
use std::sync::Arc;

pub type BlockId = u32;

type Edges = SmallVec<[BlockId; 2]>;

#[derive(Clone, Debug, Default)]
pub struct BasicBlock {
    pub id: BlockId,
    pub instructions: Vec<Instruction>,
    /// Offset of each instruction in the original method body.
    pub offsets: Vec<Offset>,
    successors: Edges,
    predecessors: Edges,
    exception_successors: Edges,
    exception_predecessors: Edges,
}

impl BasicBlock {
    fn new(id: BlockId) -> Self {
        BasicBlock {
            id,
            ..BasicBlock::default()
        }
    }

    /// Successors in edge order: a conditional jump's target comes
    /// before its fallthrough, a switch's default before its cases.
    pub fn successors(&self) -> &[BlockId] {
        &self.successors
    }

    pub fn predecessors(&self) -> &[BlockId] {
        &self.predecessors
    }

    pub fn exception_successors(&self) -> &[BlockId] {
        &self.exception_successors
    }

    pub fn exception_predecessors(&self) -> &[BlockId] {
        &self.exception_predecessors
    }

    pub fn last_instruction(&self) -> Option<&Instruction> {
        self.instructions.last()
    }

    pub fn start_offset(&self) -> Option<Offset> {
        self.offsets.first().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    fn ends_with_jsr(&self) -> bool {
        matches!(self.last_instruction(), Some(Instruction::Jsr(_)))
    }

    fn ends_with_ret(&self) -> bool {
        matches!(self.last_instruction(), Some(Instruction::Ret(_)))
    }

    /// A copy with the same instructions and no edges.
    fn detached_copy(&self, id: BlockId) -> BasicBlock {
        BasicBlock {
            id,
            instructions: self.instructions.clone(),
            offsets: self.offsets.clone(),
            ..BasicBlock::default()
        }
    }
}

/// Blocks protected by one handler. Handler table entries with the same
/// `(from, to, handler)` are merged into one range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExceptionRange {
    pub protected: Vec<BlockId>,
    pub handler: BlockId,
    /// `None` catches everything.
    pub catch_types: Vec<Option<Arc<str>>>,
}

#[derive(Clone, Debug)]
pub struct ControlFlowGraph {
    blocks: IndexMap<BlockId, BasicBlock, FxBuildHasher>,
    entry: BlockId,
    sink: BlockId,
    exceptions: Vec<ExceptionRange>,
    /// `jsr` block to the block its subroutine returns to, for every
    /// `jsr` whose matching `ret` was found.
    subroutines: IndexMap<BlockId, BlockId, FxBuildHasher>,
    /// `jsr` block to the block that follows it in the method body,
    /// recorded when the blocks are created.
    return_sites: IndexMap<BlockId, BlockId, FxBuildHasher>,
    next_id: BlockId,
}

impl ControlFlowGraph {
    pub fn entry(&self) -> BlockId {
        self.entry
    }

    /// The empty block every method exit leads to.
    pub fn sink(&self) -> BlockId {
        self.sink
    }

    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(&id)
    }

    /// Blocks in creation order; the sink comes after the blocks of the
    /// original body, copies made by jsr inlining after the sink.
    pub fn blocks(&self) -> impl Iterator<Item = &BasicBlock> {
        self.blocks.values()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn exception_ranges(&self) -> &[ExceptionRange] {
        &self.exceptions
    }

    /// `(jsr block, return-to block)` pairs.
    pub fn subroutines(&self) -> impl Iterator<Item = (BlockId, BlockId)> + '_ {
        self.subroutines.iter().map(|(&jsr, &exit)| (jsr, exit))
    }

    fn get(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[&id]
    }

    fn get_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        self.blocks
            .get_mut(&id)
            .unwrap_or_else(|| panic!("block {id} is not in the graph"))
    }

    fn fresh_id(&mut self) -> BlockId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // -------------------------------------------------------------------
    // Edges
    // -------------------------------------------------------------------

    fn add_successor(&mut self, from: BlockId, to: BlockId) {
        if self.get(from).successors.contains(&to) {
            return;
        }
        self.get_mut(from).successors.push(to);
        self.get_mut(to).predecessors.push(from);
    }

    fn remove_successor(&mut self, from: BlockId, to: BlockId) {
        self.get_mut(from).successors.retain(|id| *id != to);
        self.get_mut(to).predecessors.retain(|id| *id != from);
    }

    fn add_exception_successor(&mut self, from: BlockId, to: BlockId) {
        if self.get(from).exception_successors.contains(&to) {
            return;
        }
        self.get_mut(from).exception_successors.push(to);
        self.get_mut(to).exception_predecessors.push(from);
    }

    fn remove_exception_successor(&mut self, from: BlockId, to: BlockId) {
        self.get_mut(from).exception_successors.retain(|id| *id != to);
        self.get_mut(to).exception_predecessors.retain(|id| *id != from);
    }

    /// Redirect every edge from `node` to `old`, normal or exceptional,
    /// to `new`, keeping its position in the edge list.
    fn replace_successor(&mut self, node: BlockId, old: BlockId, new: BlockId) {
        if old == new {
            return;
        }
        let block = self.get(node);
        let normal = block.successors.contains(&old);
        let exceptional = block.exception_successors.contains(&old);
        if normal {
            let already = self.get(node).successors.contains(&new);
            let successors = &mut self.get_mut(node).successors;
            if already {
                successors.retain(|id| *id != old);
            } else {
                for id in successors.iter_mut().filter(|id| **id == old) {
                    *id = new;
                }
                self.get_mut(new).predecessors.push(node);
            }
            self.get_mut(old).predecessors.retain(|id| *id != node);
        }
        if exceptional {
            let already = self.get(node).exception_successors.contains(&new);
            let successors = &mut self.get_mut(node).exception_successors;
            if already {
                successors.retain(|id| *id != old);
            } else {
                for id in successors.iter_mut().filter(|id| **id == old) {
                    *id = new;
                }
                self.get_mut(new).exception_predecessors.push(node);
            }
            self.get_mut(old).exception_predecessors.retain(|id| *id != node);
        }
    }

    // -------------------------------------------------------------------
    // Removal
    // -------------------------------------------------------------------

    /// Detach `id` from every edge, drop the exception ranges it empties
    /// or handled and the subroutine records that mention it, then delete
    /// it. Returns `false` when no such block exists.
    ///
    /// # Panics
    ///
    /// When asked to remove the entry or the sink, or when a reference to
    /// the block survives the detachment.
    pub fn remove_block(&mut self, id: BlockId) -> bool {
        assert!(
            id != self.entry && id != self.sink,
            "cannot remove the entry or sink block {id}"
        );
        let Some(block) = self.blocks.get(&id) else {
            return false;
        };
        let successors = block.successors.clone();
        let exception_successors = block.exception_successors.clone();
        let predecessors = block.predecessors.clone();
        let exception_predecessors = block.exception_predecessors.clone();
        for successor in successors {
            self.remove_successor(id, successor);
        }
        for successor in exception_successors {
            self.remove_exception_successor(id, successor);
        }
        for predecessor in predecessors {
            self.remove_successor(predecessor, id);
        }
        for predecessor in exception_predecessors {
            self.remove_exception_successor(predecessor, id);
        }
        self.blocks.shift_remove(&id);

        self.exceptions.retain_mut(|range| {
            if range.handler == id {
                return false;
            }
            range.protected.retain(|block| *block != id);
            !range.protected.is_empty()
        });
        self.subroutines.retain(|jsr, exit| *jsr != id && *exit != id);
        self.return_sites.retain(|jsr, exit| *jsr != id && *exit != id);

        let dangling = self.blocks.values().any(|block| {
            block.successors.contains(&id)
                || block.predecessors.contains(&id)
                || block.exception_successors.contains(&id)
                || block.exception_predecessors.contains(&id)
        });
        assert!(!dangling, "block {id} is still referenced after removal");
        true
    }

    // -------------------------------------------------------------------
    // Traversal
    // -------------------------------------------------------------------

    /// Blocks reachable from the entry, in reverse postorder over normal
    /// and exception edges.
    pub fn reverse_postorder(&self) -> Vec<BlockId> {
        let mut visited: FxHashSet<BlockId> = FxHashSet::default();
        let mut postorder = Vec::with_capacity(self.blocks.len());
        // (block, index of the next child to visit)
        let mut stack: Vec<(BlockId, usize)> = vec![(self.entry, 0)];
        visited.insert(self.entry);
        while let Some((node, next)) = stack.last_mut() {
            let block = self.get(*node);
            let child = block
                .successors
                .iter()
                .chain(block.exception_successors.iter())
                .nth(*next)
                .copied();
            *next += 1;
            match child {
                Some(child) => {
                    if visited.insert(child) {
                        stack.push((child, 0));
                    }
                }
                None => {
                    postorder.push(*node);
                    stack.pop();
                }
            }
        }
        postorder.reverse();
        postorder
    }

    /// A human-readable listing of the blocks and their edges.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let list = |ids: &[BlockId]| {
            ids.iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        for block in self.blocks.values() {
            let marker = if block.id == self.entry {
                " (entry)"
            } else if block.id == self.sink {
                " (sink)"
            } else {
                ""
            };
            let _ = writeln!(out, "block {}{marker}", block.id);
            for (offset, instruction) in block.offsets.iter().zip(&block.instructions) {
                let _ = writeln!(out, "  {offset:>4}: {instruction}");
            }
            if !block.successors.is_empty() {
                let _ = writeln!(out, "  -> {}", list(&block.successors));
            }
            if !block.exception_successors.is_empty() {
                let _ = writeln!(out, "  => {}", list(&block.exception_successors));
            }
        }
        for range in &self.exceptions {
            let types = range
                .catch_types
                .iter()
                .map(|ty| ty.as_deref().unwrap_or("any"))
                .collect::<Vec<_>>()
                .join(" | ");
            let _ = writeln!(
                out,
                "catch [{}] in blocks {} -> block {}",
                types,
                list(&range.protected),
                range.handler
            );
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/cfg_tests.rs"]
mod cfg_tests;

#[cfg(test)]
#[path = "../../tests/jsr_tests.rs"]
mod jsr_tests;
