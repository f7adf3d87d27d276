//! Stack-height verification over the graph.

use super::{BlockId, ControlFlowGraph};
use crate::error::CfgError;
use crate::stack::{Frame, SlotKind};
use rustc_hash::FxHashMap;
use tracing::trace;

impl ControlFlowGraph {
    /// Run the stack model over every block reachable from the entry,
    /// starting from `initial`, and check that control-flow merges agree
    /// on the stack height and never mix return addresses with values.
    pub fn verify(&self, initial: Frame) -> Result<(), CfgError> {
        let mut entry_frames: FxHashMap<BlockId, Frame> = FxHashMap::default();
        entry_frames.insert(self.entry, initial);
        let mut pending = vec![self.entry];

        while let Some(id) = pending.pop() {
            let Some(start) = entry_frames.get(&id).cloned() else {
                continue;
            };
            let block = self.get(id);
            let mut frame = start.clone();
            for instruction in &block.instructions {
                frame.step(instruction).map_err(|error| CfgError::Verify {
                    block: id,
                    reason: error.to_string(),
                })?;
            }

            let mut edges: Vec<(BlockId, Frame)> = Vec::new();
            for &handler in &block.exception_successors {
                edges.push((handler, start.for_handler()));
                edges.push((handler, frame.for_handler()));
            }
            for &successor in &block.successors {
                if successor != self.sink {
                    edges.push((successor, frame.clone()));
                }
            }
            for (target, incoming) in edges {
                match entry_frames.get_mut(&target) {
                    None => {
                        entry_frames.insert(target, incoming);
                        pending.push(target);
                    }
                    Some(existing) => {
                        if merge_into(existing, &incoming).map_err(|reason| CfgError::Verify {
                            block: target,
                            reason,
                        })? {
                            pending.push(target);
                        }
                    }
                }
            }
        }
        trace!(blocks = entry_frames.len(), "verified");
        Ok(())
    }
}

/// Merge `incoming` into `existing`; returns whether `existing` changed.
/// Locals that disagree become unknown.
fn merge_into(existing: &mut Frame, incoming: &Frame) -> Result<bool, String> {
    if existing.stack.len() != incoming.stack.len() {
        return Err(format!(
            "stack height mismatch at merge: {} vs {}",
            existing.stack.len(),
            incoming.stack.len()
        ));
    }
    for (slot, (ours, theirs)) in existing.stack.iter().zip(&incoming.stack).enumerate() {
        if ours != theirs && (*ours == SlotKind::ReturnAddress || *theirs == SlotKind::ReturnAddress) {
            return Err(format!("stack slot {slot} holds {ours} on one path and {theirs} on another"));
        }
    }
    let mut changed = false;
    if existing.locals.len() > incoming.locals.len() {
        for local in &mut existing.locals[incoming.locals.len()..] {
            changed |= local.take().is_some();
        }
    }
    for (ours, theirs) in existing.locals.iter_mut().zip(&incoming.locals) {
        if ours.is_some() && ours != theirs {
            *ours = None;
            changed = true;
        }
    }
    Ok(changed)
}
