//! Backward liveness dataflow over the CFG
//!
//! Results are side tables parallel to the block list; the CFG itself is
//! never mutated.

use crate::ir::*;
use hashbrown::HashSet;

/// Per-block liveness facts.
#[derive(Debug, Clone, Default)]
pub struct BlockLiveness {
    pub defs: HashSet<ValueId>,
    pub uses: HashSet<ValueId>,
    pub live_in: HashSet<ValueId>,
    pub live_out: HashSet<ValueId>,
    /// Live-after set of each instruction, parallel to the block's `insts`.
    pub inst_live_out: Vec<HashSet<ValueId>>,
}

/// Liveness facts for one function, parallel to its block list.
#[derive(Debug, Clone, Default)]
pub struct FunctionLiveness {
    pub blocks: Vec<BlockLiveness>,
}

/// Compute per-block `use`/`def`, iterate `in`/`out` to a fixpoint, then
/// sweep each block backwards for per-instruction live-after sets.
pub fn analyze(function: &CfgFunction) -> FunctionLiveness {
    let mut facts: Vec<BlockLiveness> = function
        .blocks
        .iter()
        .map(|block| {
            let mut fact = BlockLiveness::default();
            for inst in &block.insts {
                for read in inst.read_operands() {
                    if !fact.defs.contains(&read) {
                        fact.uses.insert(read);
                    }
                }
                for written in inst.written_operands() {
                    fact.defs.insert(written);
                }
            }
            fact
        })
        .collect();

    // out[b] = union of in[succ]; in[b] = use[b] ∪ (out[b] − def[b])
    let mut changed = true;
    while changed {
        changed = false;

        for index in (0..function.blocks.len()).rev() {
            let mut new_out: HashSet<ValueId> = HashSet::new();
            for &succ in &function.blocks[index].successors {
                new_out.extend(facts[succ].live_in.iter().copied());
            }

            let fact = &facts[index];
            let mut new_in: HashSet<ValueId> = fact.uses.clone();
            for &value in &new_out {
                if !fact.defs.contains(&value) {
                    new_in.insert(value);
                }
            }

            if new_in != fact.live_in || new_out != fact.live_out {
                facts[index].live_in = new_in;
                facts[index].live_out = new_out;
                changed = true;
            }
        }
    }

    for (index, block) in function.blocks.iter().enumerate() {
        let fact = &mut facts[index];
        let mut live = fact.live_out.clone();
        fact.inst_live_out = vec![HashSet::new(); block.insts.len()];

        for (i, inst) in block.insts.iter().enumerate().rev() {
            fact.inst_live_out[i] = live.clone();
            for written in inst.written_operands() {
                live.remove(&written);
            }
            for read in inst.read_operands() {
                live.insert(read);
            }
        }
    }

    FunctionLiveness { blocks: facts }
}
