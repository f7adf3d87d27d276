//! Dominator sets by iterative dataflow over reverse postorder.

use super::{BlockId, ControlFlowGraph};
use fixedbitset::FixedBitSet;
use rustc_hash::FxHashMap;

/// Dominators of the blocks reachable from the entry. Exception edges
/// count as control flow.
#[derive(Clone, Debug)]
pub struct Dominators {
    order: Vec<BlockId>,
    index: FxHashMap<BlockId, usize>,
    sets: Vec<FixedBitSet>,
}

impl Dominators {
    /// Whether every path from the entry to `block` passes through
    /// `dominator`. Unreachable blocks are dominated by nothing.
    pub fn dominates(&self, dominator: BlockId, block: BlockId) -> bool {
        match (self.index.get(&dominator), self.index.get(&block)) {
            (Some(&d), Some(&b)) => self.sets[b].contains(d),
            _ => false,
        }
    }

    /// The closest strict dominator of `block`; `None` for the entry and
    /// unreachable blocks.
    pub fn immediate_dominator(&self, block: BlockId) -> Option<BlockId> {
        let &b = self.index.get(&block)?;
        // Strict dominators form a chain; the closest has the largest set.
        self.sets[b]
            .ones()
            .filter(|&d| d != b)
            .max_by_key(|&d| self.sets[d].count_ones(..))
            .map(|d| self.order[d])
    }

    /// Reachable blocks in reverse postorder.
    pub fn order(&self) -> &[BlockId] {
        &self.order
    }
}

impl ControlFlowGraph {
    pub fn dominators(&self) -> Dominators {
        let order = self.reverse_postorder();
        let index: FxHashMap<BlockId, usize> = order.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let count = order.len();

        let mut full = FixedBitSet::with_capacity(count);
        full.insert_range(..);
        let mut sets = vec![full; count];
        if count > 0 {
            sets[0].clear();
            sets[0].insert(0);
        }

        let preds: Vec<Vec<usize>> = order
            .iter()
            .map(|&id| {
                let block = self.get(id);
                block
                    .predecessors
                    .iter()
                    .chain(&block.exception_predecessors)
                    .filter_map(|pred| index.get(pred).copied())
                    .collect()
            })
            .collect();

        let mut changed = true;
        while changed {
            changed = false;
            for b in 1..count {
                let mut next = FixedBitSet::with_capacity(count);
                let mut first = true;
                for &p in &preds[b] {
                    if first {
                        next.clone_from(&sets[p]);
                        first = false;
                    } else {
                        next.intersect_with(&sets[p]);
                    }
                }
                next.insert(b);
                if next != sets[b] {
                    sets[b] = next;
                    changed = true;
                }
            }
        }

        Dominators { order, index, sets }
    }
}
