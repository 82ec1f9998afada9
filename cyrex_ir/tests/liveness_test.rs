//! Liveness analysis tests

use cyrex_ir::{liveness, CfgFunction, IrGen, Opcode};
use pretty_assertions::assert_eq;

fn cfg(source: &str) -> CfgFunction {
    let tokens = cyrex_lexer::tokenize(source).expect("tokenize");
    let program = cyrex_parser::parse(tokens).expect("parse");
    let mut ir = IrGen::new();
    ir.generate(&program);
    assert!(!ir.has_errors());
    ir.function_by_name("main").expect("main exists").clone()
}

#[test]
fn straight_line_defs_and_uses() {
    // v0 = x, v1 = the literal 1
    let function = cfg("function main() : int { var x : int = 1 return x }");
    let facts = liveness::analyze(&function);

    let entry = &facts.blocks[0];
    assert!(entry.defs.contains(&0));
    assert!(entry.defs.contains(&1));
    // Everything read here is defined in the same block first.
    assert!(entry.uses.is_empty());
    assert!(entry.live_in.is_empty());

    // After the store, x is still needed by the return.
    let store_at = function.blocks[0]
        .insts
        .iter()
        .position(|i| i.opcode == Opcode::Store)
        .unwrap();
    assert!(entry.inst_live_out[store_at].contains(&0));
}

#[test]
fn loop_variable_is_live_around_the_back_edge() {
    let function =
        cfg("function main() : int { var i : int = 0 while i < 10 do i = i + 1 return i }");
    let facts = liveness::analyze(&function);

    // Block order: entry, cond, body, exit, epilogue. The loop counter v0
    // is live into the condition, the body and the exit.
    let cond = &facts.blocks[1];
    let body = &facts.blocks[2];
    let exit = &facts.blocks[3];

    assert!(cond.uses.contains(&0));
    assert!(cond.live_in.contains(&0));
    assert!(cond.live_out.contains(&0));
    assert!(body.live_in.contains(&0));
    assert!(body.live_out.contains(&0));
    assert!(exit.live_in.contains(&0));
    assert!(exit.live_out.is_empty());
}

#[test]
fn value_dead_after_its_last_use() {
    let function = cfg("function main() : int { var x : int = 1 return 0 }");
    let facts = liveness::analyze(&function);

    let entry = &facts.blocks[0];
    // x is written and never read; it is live nowhere after its store.
    let store_at = function.blocks[0]
        .insts
        .iter()
        .position(|i| i.opcode == Opcode::Store)
        .unwrap();
    assert!(!entry.inst_live_out[store_at].contains(&0));
    assert!(entry.live_out.is_empty());
}

#[test]
fn facts_are_parallel_to_blocks_and_insts() {
    let function = cfg(
        "function main() : int { var a : int = 1 if a < 2 { a = 3 } return a }",
    );
    let facts = liveness::analyze(&function);

    assert_eq!(facts.blocks.len(), function.blocks.len());
    for (fact, block) in facts.blocks.iter().zip(&function.blocks) {
        assert_eq!(fact.inst_live_out.len(), block.insts.len());
    }
}
