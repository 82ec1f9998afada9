//! Basic-block partitioning and successor linking

use crate::ir::*;
use hashbrown::HashMap;

/// Partition a linear function into basic blocks and link successor
/// edges. Block order preserves the linear instruction order.
pub fn build_function(function: &LinearFunction) -> Vec<BasicBlock> {
    let mut blocks = split(function);
    link(&mut blocks, function);
    blocks
}

/// A new block begins at the start of the stream, immediately after any
/// terminator, and at every label that differs from the current entry.
fn split(function: &LinearFunction) -> Vec<BasicBlock> {
    let mut blocks: Vec<BasicBlock> = Vec::new();
    let mut open_block = true;

    for (i, inst) in function.insts.iter().enumerate() {
        if open_block {
            if inst.opcode != Opcode::Label {
                panic!("internal error: basic blocks must begin with a label");
            }
            blocks.push(BasicBlock {
                entry_label: inst.operands[0],
                ..BasicBlock::default()
            });
            open_block = false;
        }

        let block = blocks.last_mut().expect("internal error: no open block");
        block.insts.push(inst.clone());

        if inst.is_block_terminator() {
            open_block = true;
            continue;
        }

        if let Some(next) = function.insts.get(i + 1) {
            if next.opcode == Opcode::Label && next.operands[0] != block.entry_label {
                open_block = true;
            }
        }
    }

    blocks
}

/// Inspect every block's last instruction and record successor indices.
/// Blocks without a terminator get a synthetic fallthrough `Jump` to the
/// next block; the trailing epilogue block has nothing to fall through to
/// and keeps its lone label.
fn link(blocks: &mut [BasicBlock], function: &LinearFunction) {
    let mut label_to_block: HashMap<LabelId, usize> = HashMap::new();
    for (index, block) in blocks.iter().enumerate() {
        for inst in &block.insts {
            if inst.opcode == Opcode::Label {
                label_to_block.insert(inst.operands[0], index);
            }
        }
    }

    let resolve = |label: LabelId| -> usize {
        *label_to_block
            .get(&label)
            .unwrap_or_else(|| panic!("internal error: unresolved label L{}", label))
    };

    let count = blocks.len();
    for index in 0..count {
        let Some(last) = blocks[index].insts.last().cloned() else { continue };

        match last.opcode {
            Opcode::Jump => {
                let target = resolve(last.operands[0]);
                blocks[index].successors.push(target);
            }
            Opcode::Branch => {
                let if_true = resolve(last.operands[1]);
                let if_false = resolve(last.operands[2]);
                blocks[index].successors.push(if_true);
                blocks[index].successors.push(if_false);
            }
            Opcode::Return => {
                let epilogue = resolve(function.epilogue_label);
                blocks[index].successors.push(epilogue);
            }
            _ => {
                if index + 1 < count {
                    let next_entry = blocks[index + 1].entry_label;
                    blocks[index]
                        .insts
                        .push(Inst::new(Opcode::Jump, NO_VALUE, &[next_entry]));
                    blocks[index].successors.push(index + 1);
                }
            }
        }
    }
}
