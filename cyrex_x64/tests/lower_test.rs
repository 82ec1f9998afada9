//! Lowering tests: instruction templates, prologue/epilogue framing

use cyrex_ir::IrGen;
use cyrex_x64::{Gpr, Mc, Operand, Reg, X64Codegen, AL, RAX, RBP, RSP};
use pretty_assertions::assert_eq;

fn gen(source: &str) -> IrGen {
    let tokens = cyrex_lexer::tokenize(source).expect("tokenize");
    let program = cyrex_parser::parse(tokens).expect("parse");
    let mut ir = IrGen::new();
    ir.generate(&program);
    assert!(!ir.has_errors(), "unexpected IR errors: {:?}", ir.errors());
    ir
}

fn lower(ir: &IrGen) -> Vec<Mc> {
    let codegen = X64Codegen::new(ir, false);
    let function = ir.function_by_name("main").expect("main exists");
    codegen.lower_function(function).into_list()
}

fn r(gpr: Gpr) -> Operand {
    Operand::reg(Reg::qword(gpr))
}

#[test]
fn return_zero_moves_the_literal_and_jumps_to_the_epilogue() {
    let ir = gen("function main() : int { return 0 }");
    let mc = lower(&ir);

    assert_eq!(
        mc,
        vec![
            Mc::Label { id: 0 },
            Mc::Mov { dst: Operand::reg(RAX), src: Operand::imm(0) },
            Mc::Jmp { dst: Mc::label_dst(1) },
            Mc::Label { id: 1 },
            Mc::Ret,
        ]
    );
}

#[test]
fn registers_are_handed_out_in_volatile_order() {
    let ir = gen("function main() : int { var x : int = 1 + 2 return x }");
    let mc = lower(&ir);

    // x claims rcx, the sum temporary claims rdx; rax stays the scratch.
    assert_eq!(
        mc,
        vec![
            Mc::Label { id: 0 },
            Mc::Mov { dst: Operand::reg(RAX), src: Operand::imm(1) },
            Mc::Add { dst: Operand::reg(RAX), src: Operand::imm(2) },
            Mc::Mov { dst: r(Gpr::Rdx), src: Operand::reg(RAX) },
            Mc::Mov { dst: r(Gpr::Rcx), src: r(Gpr::Rdx) },
            Mc::Mov { dst: Operand::reg(RAX), src: r(Gpr::Rcx) },
            Mc::Jmp { dst: Mc::label_dst(1) },
            Mc::Label { id: 1 },
            Mc::Ret,
        ]
    );
}

#[test]
fn comparisons_lower_to_cmp_set_movzx() {
    let ir = gen("function main() : int { return 1 < 2 }");
    let mc = lower(&ir);

    let setl_at = mc
        .iter()
        .position(|ins| matches!(ins, Mc::Setl { .. }))
        .expect("setl emitted");
    assert_eq!(mc[setl_at - 2], Mc::Mov { dst: Operand::reg(RAX), src: Operand::imm(1) });
    assert_eq!(
        mc[setl_at - 1],
        Mc::Cmp { lhs: Operand::reg(RAX), rhs: Operand::imm(2) }
    );
    assert_eq!(mc[setl_at], Mc::Setl { dst: Operand::reg(AL) });
    assert_eq!(
        mc[setl_at + 1],
        Mc::MovZx { dst: Operand::reg(RAX), src: Operand::reg(AL) }
    );
}

#[test]
fn logic_opcodes_lower_like_arithmetic() {
    let ir = gen("function main() : int { return 6 & 3 }");
    let mc = lower(&ir);

    assert!(mc.contains(&Mc::And { dst: Operand::reg(RAX), src: Operand::imm(3) }));
}

#[test]
fn branches_lower_to_test_jnz_jz() {
    let ir = gen("function main() : int { if 1 { } return 0 }");
    let mc = lower(&ir);

    let test_at = mc
        .iter()
        .position(|ins| matches!(ins, Mc::Test { .. }))
        .expect("test emitted");
    assert_eq!(mc[test_at + 1], Mc::Jnz { dst: Mc::label_dst(2) });
    assert_eq!(mc[test_at + 2], Mc::Jz { dst: Mc::label_dst(3) });
}

#[test]
fn functions_without_stack_skip_the_frame() {
    let ir = gen("function main() : int { return 0 }");
    let codegen = X64Codegen::new(&ir, false);
    let function = ir.function_by_name("main").unwrap();
    let lowered = codegen.lower_function(function);

    assert_eq!(lowered.stack_size, 0);
    assert!(lowered.prologue.is_empty());
    assert_eq!(lowered.epilogue, vec![Mc::Ret]);
}

#[test]
fn spilling_builds_a_16_byte_aligned_frame() {
    // Eleven registers are available for values (six volatile beyond rax,
    // five callee-saved); the twelfth variable spills to the stack.
    let vars: String = ('a'..='l')
        .map(|name| format!("var {} : int = 1 ", name))
        .collect();
    let source = format!("function main() : int {{ {} return 0 }}", vars);
    let ir = gen(&source);

    let codegen = X64Codegen::new(&ir, false);
    let function = ir.function_by_name("main").unwrap();
    let lowered = codegen.lower_function(function);

    assert_eq!(lowered.stack_size, 16);

    assert_eq!(
        &lowered.prologue[..2],
        &[
            Mc::Push { src: Operand::reg(RBP) },
            Mc::Mov { dst: Operand::reg(RBP), src: Operand::reg(RSP) },
        ]
    );
    // All five callee-saved registers were claimed along the way.
    let pushes: Vec<_> = lowered.prologue[2..lowered.prologue.len() - 1].to_vec();
    assert_eq!(
        pushes,
        vec![
            Mc::Push { src: r(Gpr::Rbx) },
            Mc::Push { src: r(Gpr::R12) },
            Mc::Push { src: r(Gpr::R13) },
            Mc::Push { src: r(Gpr::R14) },
            Mc::Push { src: r(Gpr::R15) },
        ]
    );
    assert_eq!(
        lowered.prologue.last(),
        Some(&Mc::Sub { dst: Operand::reg(RSP), src: Operand::imm(16) })
    );

    // Epilogue pops in reverse claim order, then unwinds the frame.
    assert_eq!(
        lowered.epilogue,
        vec![
            Mc::Pop { src: r(Gpr::R15) },
            Mc::Pop { src: r(Gpr::R14) },
            Mc::Pop { src: r(Gpr::R13) },
            Mc::Pop { src: r(Gpr::R12) },
            Mc::Pop { src: r(Gpr::Rbx) },
            Mc::Pop { src: Operand::reg(RBP) },
            Mc::Add { dst: Operand::reg(RSP), src: Operand::imm(16) },
            Mc::Ret,
        ]
    );

    // The spilled store writes through the frame pointer.
    assert!(lowered
        .block
        .iter()
        .any(|ins| matches!(ins, Mc::Mov { dst, .. } if dst.is_mem())));
}

#[test]
fn assembly_carries_the_module_preamble_and_globals() {
    let ir = gen("function main() : int { return 0 }");
    let assembly = X64Codegen::new(&ir, false).assembly();

    assert!(assembly.starts_with("bits 64\nsection .text\n"));
    assert!(assembly.contains("global main\n"));
    assert!(assembly.contains("main:\n"));
    assert!(assembly.contains("\tret\n"));
}

#[test]
fn memory_stores_carry_their_size_keyword() {
    let vars: String = ('a'..='l')
        .map(|name| format!("var {} : int = 1 ", name))
        .collect();
    let source = format!("function main() : int {{ {} return 0 }}", vars);
    let ir = gen(&source);
    let assembly = X64Codegen::new(&ir, false).assembly();

    assert!(assembly.contains("mov dword [rbp-4], 1"));
}
