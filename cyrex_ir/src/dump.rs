//! Textual IR listing

use crate::ir::*;
use crate::irgen::IrGen;
use crate::liveness;
use std::fmt::Write;

/// Render the whole module, one `func` section per function with a
/// `BB<entry>:` header per block. With `with_liveness`, each block header
/// is followed by its live-in/live-out sets as comment lines.
pub fn dump_module(ir: &IrGen, with_liveness: bool) -> String {
    let mut out = String::new();

    for (name, function) in ir.module().iter() {
        writeln!(out, "func {}", name).unwrap();

        let facts = with_liveness.then(|| liveness::analyze(function));

        for (index, block) in function.blocks.iter().enumerate() {
            writeln!(out, "BB{}:", block.entry_label).unwrap();

            if let Some(facts) = &facts {
                let fact = &facts.blocks[index];
                writeln!(out, "; live-in: {}", value_set(&fact.live_in)).unwrap();
                writeln!(out, "; live-out: {}", value_set(&fact.live_out)).unwrap();
            }

            for inst in &block.insts {
                writeln!(out, "{}", format_inst(ir, inst)).unwrap();
            }
        }
    }

    out
}

fn value_set(set: &hashbrown::HashSet<ValueId>) -> String {
    let mut ids: Vec<ValueId> = set.iter().copied().collect();
    ids.sort_unstable();
    ids.iter()
        .map(|id| format!("v{}", id))
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_inst(ir: &IrGen, inst: &Inst) -> String {
    match inst.opcode {
        Opcode::Label => return format!("L{}:", inst.operands[0]),
        Opcode::Branch => {
            return format!(
                "b v{}, L{}, L{}",
                inst.operands[0], inst.operands[1], inst.operands[2]
            )
        }
        Opcode::Jump => return format!("j L{}", inst.operands[0]),
        _ => {}
    }

    let mut line = String::new();

    if inst.result != NO_VALUE {
        write!(
            line,
            "v{} : {} = ",
            inst.result,
            ir.value(inst.result).ty
        )
        .unwrap();
    }

    line.push_str(inst.opcode.name());

    if inst.opcode == Opcode::Const {
        if let Some(literal) = ir.literal(inst.result) {
            write!(line, " {}", literal.as_i64()).unwrap();
        }
    }

    let operands: Vec<String> = inst
        .operands
        .iter()
        .filter(|&&op| !(inst.opcode == Opcode::Return && op == NO_VALUE))
        .map(|op| format!("v{}", op))
        .collect();
    if !operands.is_empty() {
        write!(line, " {}", operands.join(", ")).unwrap();
    }

    line
}
