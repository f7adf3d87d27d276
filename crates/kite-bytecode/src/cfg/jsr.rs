//! Subroutine inlining.
//!
//! Two `jsr` call sites that share subroutine blocks get private copies of
//! the shared part, one split per round, until no two subroutine ranges
//! overlap. The `jsr`/`ret` instructions and the stores and pops of their
//! return addresses are then deleted, leaving plain control flow.

use super::{BlockId, ControlFlowGraph, ExceptionRange};
use crate::error::CfgError;
use crate::instruction::Instruction;
use crate::stack::{Frame, SlotKind};
use kite_common::limits::MAX_JSR_INLINING_ROUNDS;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use tracing::{debug, trace};

/// The blocks executed between a `jsr` and its matching `ret`.
#[derive(Debug)]
struct JsrRange {
    jsr: BlockId,
    /// The block the subroutine returns to.
    exit: BlockId,
    blocks: FxHashSet<BlockId>,
}

impl ControlFlowGraph {
    /// Give every `jsr` call site its own copy of the subroutine it calls,
    /// then remove the subroutine plumbing.
    pub fn inline_jsr(&mut self) -> Result<(), CfgError> {
        let mut rounds = 0;
        while self.split_first_overlap() {
            rounds += 1;
            if rounds >= MAX_JSR_INLINING_ROUNDS {
                return Err(CfgError::JsrInliningDiverged { rounds });
            }
        }
        debug!(rounds, blocks = self.blocks.len(), "jsr ranges separated");
        self.remove_jsr_instructions()?;
        self.remove_empty_blocks();
        self.subroutines.clear();
        self.return_sites.clear();
        Ok(())
    }

    /// Split the first pair of overlapping subroutine ranges found.
    /// Returns `false` once every range is disjoint from the others.
    fn split_first_overlap(&mut self) -> bool {
        let mut ordered: Vec<JsrRange> = Vec::with_capacity(self.subroutines.len());
        for (jsr, exit) in self.subroutines() {
            let range = JsrRange {
                jsr,
                exit,
                blocks: self.jsr_range(jsr, exit),
            };
            // A range goes before every range that contains its call.
            let position = ordered
                .iter()
                .position(|other| other.blocks.contains(&jsr))
                .unwrap_or(ordered.len());
            ordered.insert(position, range);
        }

        for (index, first) in ordered.iter().enumerate() {
            for second in &ordered[index + 1..] {
                if first.blocks.contains(&second.jsr) || second.blocks.contains(&first.jsr) {
                    continue;
                }
                let common: FxHashSet<BlockId> = first.blocks.intersection(&second.blocks).copied().collect();
                if !common.is_empty() {
                    trace!(jsr = first.jsr, other = second.jsr, shared = common.len(), "splitting jsr range");
                    let (jsr, exit) = (first.jsr, first.exit);
                    self.split_jsr_range(jsr, exit, &common);
                    return true;
                }
            }
        }
        false
    }

    /// Blocks reachable from `jsr` before its `ret` reaches `exit`, and
    /// entered only through the subroutine's first block.
    fn jsr_range(&self, jsr: BlockId, exit: BlockId) -> FxHashSet<BlockId> {
        let mut blocks = FxHashSet::default();
        let Some(&dom) = self.get(jsr).successors.first() else {
            return blocks;
        };
        let mut queue = VecDeque::from([jsr]);
        while let Some(node) = queue.pop_front() {
            for children in self.range_children(node, jsr, exit) {
                'child: for &child in children.iter().rev() {
                    if blocks.contains(&child) {
                        continue;
                    }
                    if node != jsr {
                        let block = self.get(child);
                        for &pred in block.predecessors.iter().chain(&block.exception_predecessors) {
                            if !self.is_dominator(pred, dom) {
                                continue 'child;
                            }
                        }
                    }
                    if child != self.sink {
                        blocks.insert(child);
                    }
                    queue.push_back(child);
                }
            }
        }
        blocks
    }

    /// The edge lists followed out of `node` when walking a subroutine:
    /// normal successors unless `node` returns to `exit`, and exception
    /// successors unless `node` is the call itself.
    fn range_children(&self, node: BlockId, jsr: BlockId, exit: BlockId) -> [&[BlockId]; 2] {
        let block = self.get(node);
        let normal: &[BlockId] = if block.ends_with_ret() && block.successors.contains(&exit) {
            &[]
        } else {
            &block.successors
        };
        let exceptional: &[BlockId] = if node == jsr { &[] } else { &block.exception_successors };
        [normal, exceptional]
    }

    /// Whether every path from the entry to `block` passes through `dom`.
    fn is_dominator(&self, block: BlockId, dom: BlockId) -> bool {
        if block == dom {
            return true;
        }
        let mut marked = FxHashSet::default();
        let mut queue = VecDeque::from([block]);
        while let Some(node) = queue.pop_front() {
            if !marked.insert(node) {
                continue;
            }
            if node == self.entry {
                return false;
            }
            let current = self.get(node);
            for &pred in current.predecessors.iter().chain(&current.exception_predecessors) {
                if pred != dom && !marked.contains(&pred) {
                    queue.push_back(pred);
                }
            }
        }
        true
    }

    /// Copy the `common` blocks for the call at `jsr`, rewiring the copy
    /// reached from `jsr` so the original blocks keep serving the other
    /// callers.
    fn split_jsr_range(&mut self, jsr: BlockId, exit: BlockId, common: &FxHashSet<BlockId>) {
        let mut copies: FxHashMap<BlockId, BlockId> = FxHashMap::default();
        let mut queue = VecDeque::from([jsr]);
        while let Some(node) = queue.pop_front() {
            for exceptional in [false, true] {
                let children: Vec<BlockId> = {
                    let [normal, handlers] = self.range_children(node, jsr, exit);
                    if exceptional { handlers.to_vec() } else { normal.to_vec() }
                };
                for &child in children.iter().rev() {
                    if let Some(&copy) = copies.get(&child) {
                        self.replace_successor(node, child, copy);
                    } else if common.contains(&child) {
                        let copy = self.copy_block(child, exit);
                        copies.insert(child, copy);
                        queue.push_back(copy);
                        self.replace_successor(node, child, copy);
                    }
                }
            }
        }
        self.split_exception_ranges(common, &copies);
    }

    /// A copy of `original` with the same outgoing edges. A copied `ret`
    /// that returns to `exit` takes that edge over from the original.
    fn copy_block(&mut self, original: BlockId, exit: BlockId) -> BlockId {
        let id = self.fresh_id();
        let source = self.get(original);
        let copy = source.detached_copy(id);
        let returns_to_exit = source.ends_with_ret() && source.successors.contains(&exit);
        let successors = source.successors.clone();
        let exception_successors = source.exception_successors.clone();
        self.blocks.insert(id, copy);
        if returns_to_exit {
            self.add_successor(id, exit);
            self.remove_successor(original, exit);
        } else {
            for successor in successors {
                self.add_successor(id, successor);
            }
        }
        for successor in exception_successors {
            self.add_exception_successor(id, successor);
        }
        id
    }

    /// Protect the copies wherever their originals were protected. A range
    /// made up entirely of copied blocks gets a separate range for the
    /// copies, handled by the handler's copy when there is one.
    fn split_exception_ranges(&mut self, common: &FxHashSet<BlockId>, copies: &FxHashMap<BlockId, BlockId>) {
        let mut added = Vec::new();
        for range in &mut self.exceptions {
            let shared: Vec<BlockId> = range
                .protected
                .iter()
                .copied()
                .filter(|block| common.contains(block))
                .collect();
            if shared.is_empty() {
                continue;
            }
            let copied = shared.iter().filter_map(|block| copies.get(block).copied());
            if shared.len() == range.protected.len() {
                added.push(ExceptionRange {
                    protected: copied.collect(),
                    handler: copies.get(&range.handler).copied().unwrap_or(range.handler),
                    catch_types: range.catch_types.clone(),
                });
            } else {
                range.protected.extend(copied);
            }
        }
        self.exceptions
            .extend(added.into_iter().filter(|range| !range.protected.is_empty()));
    }

    /// Walk the graph with the stack model and delete `jsr`, `ret`, and
    /// every `astore` or `pop` that consumes a return address.
    fn remove_jsr_instructions(&mut self) -> Result<(), CfgError> {
        let mut visited = FxHashSet::default();
        let mut pending = vec![(self.entry, Frame::default())];
        while let Some((id, mut frame)) = pending.pop() {
            if !visited.insert(id) {
                continue;
            }
            let block = self.get_mut(id);
            let mut kept = Vec::with_capacity(block.instructions.len());
            let mut kept_offsets = Vec::with_capacity(block.offsets.len());
            for (instruction, offset) in block.instructions.drain(..).zip(block.offsets.drain(..)) {
                let consumes_address = matches!(instruction, Instruction::AStore(_) | Instruction::Pop)
                    && frame.top() == Some(SlotKind::ReturnAddress);
                frame.step(&instruction).map_err(|error| CfgError::Verify {
                    block: id,
                    reason: error.to_string(),
                })?;
                let plumbing = matches!(instruction, Instruction::Jsr(_) | Instruction::Ret(_));
                if !plumbing && !consumes_address {
                    kept.push(instruction);
                    kept_offsets.push(offset);
                }
            }
            block.instructions = kept;
            block.offsets = kept_offsets;

            let block = self.get(id);
            for &handler in &block.exception_successors {
                pending.push((handler, frame.for_handler()));
            }
            for &successor in &block.successors {
                pending.push((successor, frame.clone()));
            }
        }
        Ok(())
    }

    /// Bypass and delete blocks left without instructions. The entry moves
    /// to its successor when it empties.
    fn remove_empty_blocks(&mut self) {
        let empty: Vec<BlockId> = self
            .blocks
            .values()
            .filter(|block| block.is_empty() && block.id != self.sink && block.successors.len() == 1)
            .map(|block| block.id)
            .collect();
        for id in empty {
            let Some(block) = self.blocks.get(&id) else {
                continue;
            };
            let successor = block.successors[0];
            if successor == id {
                continue;
            }
            let predecessors: Vec<BlockId> = block
                .predecessors
                .iter()
                .chain(&block.exception_predecessors)
                .copied()
                .collect();
            for pred in predecessors {
                self.replace_successor(pred, id, successor);
            }
            for range in &mut self.exceptions {
                if range.handler == id {
                    range.handler = successor;
                }
            }
            if self.entry == id {
                self.entry = successor;
            }
            trace!(block = id, successor, "removing empty block");
            self.remove_block(id);
        }
    }
}
