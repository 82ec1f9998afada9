//! NASM-flavored assembly printing

use crate::mc::{type_size, Mc, Operand, OperandKind};
use cyrex_ir::{IrGen, NO_VALUE};
use std::fmt::Write;

/// Textual form of one operand.
pub fn operand_text(operand: &Operand) -> String {
    match operand.kind {
        OperandKind::Reg(reg) => reg.name().to_string(),
        OperandKind::Mem(offset) => format!("[rbp-{}]", offset),
        OperandKind::Imm(imm) => imm.to_string(),
    }
}

/// Print the instruction list. Label definitions render as `.L<id>:`,
/// jump targets as `.L<id>`; a store to memory with a known originating
/// value gets its size keyword.
pub fn emit_body(ir: &IrGen, mc: &[Mc], out: &mut String) {
    for ins in mc {
        match ins {
            Mc::Mov { dst, src } => {
                if dst.is_mem() && dst.value != NO_VALUE {
                    let size = type_size(&ir.value(dst.value).ty);
                    writeln!(
                        out,
                        "\tmov {} {}, {}",
                        size.elem.keyword(),
                        operand_text(dst),
                        operand_text(src)
                    )
                    .unwrap();
                } else {
                    writeln!(out, "\tmov {}, {}", operand_text(dst), operand_text(src))
                        .unwrap();
                }
            }
            Mc::MovZx { dst, src } => {
                writeln!(out, "\tmovzx {}, {}", operand_text(dst), operand_text(src)).unwrap()
            }
            Mc::Push { src } => writeln!(out, "\tpush {}", operand_text(src)).unwrap(),
            Mc::Pop { src } => writeln!(out, "\tpop {}", operand_text(src)).unwrap(),
            Mc::Add { dst, src } => {
                writeln!(out, "\tadd {}, {}", operand_text(dst), operand_text(src)).unwrap()
            }
            Mc::Sub { dst, src } => {
                writeln!(out, "\tsub {}, {}", operand_text(dst), operand_text(src)).unwrap()
            }
            Mc::Inc { src } => writeln!(out, "\tinc {}", operand_text(src)).unwrap(),
            Mc::Dec { src } => writeln!(out, "\tdec {}", operand_text(src)).unwrap(),
            Mc::And { dst, src } => {
                writeln!(out, "\tand {}, {}", operand_text(dst), operand_text(src)).unwrap()
            }
            Mc::Or { dst, src } => {
                writeln!(out, "\tor {}, {}", operand_text(dst), operand_text(src)).unwrap()
            }
            Mc::Xor { dst, src } => {
                writeln!(out, "\txor {}, {}", operand_text(dst), operand_text(src)).unwrap()
            }
            Mc::Cmp { lhs, rhs } => {
                writeln!(out, "\tcmp {}, {}", operand_text(lhs), operand_text(rhs)).unwrap()
            }
            Mc::Test { lhs, rhs } => {
                writeln!(out, "\ttest {}, {}", operand_text(lhs), operand_text(rhs)).unwrap()
            }
            Mc::Setl { dst } => writeln!(out, "\tsetl {}", operand_text(dst)).unwrap(),
            Mc::Setle { dst } => writeln!(out, "\tsetle {}", operand_text(dst)).unwrap(),
            Mc::Setg { dst } => writeln!(out, "\tsetg {}", operand_text(dst)).unwrap(),
            Mc::Setge { dst } => writeln!(out, "\tsetge {}", operand_text(dst)).unwrap(),
            Mc::Sete { dst } => writeln!(out, "\tsete {}", operand_text(dst)).unwrap(),
            Mc::Setne { dst } => writeln!(out, "\tsetne {}", operand_text(dst)).unwrap(),
            Mc::Jmp { dst } => writeln!(out, "\tjmp .L{}", operand_text(dst)).unwrap(),
            Mc::Jl { dst } => writeln!(out, "\tjl .L{}", operand_text(dst)).unwrap(),
            Mc::Jle { dst } => writeln!(out, "\tjle .L{}", operand_text(dst)).unwrap(),
            Mc::Jg { dst } => writeln!(out, "\tjg .L{}", operand_text(dst)).unwrap(),
            Mc::Jge { dst } => writeln!(out, "\tjge .L{}", operand_text(dst)).unwrap(),
            Mc::Je { dst } => writeln!(out, "\tje .L{}", operand_text(dst)).unwrap(),
            Mc::Jne { dst } => writeln!(out, "\tjne .L{}", operand_text(dst)).unwrap(),
            Mc::Jnz { dst } => writeln!(out, "\tjnz .L{}", operand_text(dst)).unwrap(),
            Mc::Jz { dst } => writeln!(out, "\tjz .L{}", operand_text(dst)).unwrap(),
            Mc::Label { id } => writeln!(out, ".L{}:", id).unwrap(),
            Mc::Ret => writeln!(out, "\tret").unwrap(),
            Mc::Nop => writeln!(out, "\tnop").unwrap(),
        }
    }
}
