//! CFG-to-machine-code lowering
//!
//! Each function lowers block by block into a flat `Mc` list framed by a
//! synthesized prologue and epilogue. `rax` is the lowering scratch and is
//! never handed out as a value location.

use crate::allocator::LocationAllocator;
use crate::emit;
use crate::mc::{Mc, Operand, AL, RAX, RBP, RSP};
use crate::optimizer::Optimizer;
use crate::strategy::{strategy, Lifetime};
use cyrex_ir::{CfgFunction, Inst, IrGen, LabelId, Opcode, NO_VALUE};
use std::fmt::Write;

/// Machine code for one function, split into its three sections.
#[derive(Debug, Clone, Default)]
pub struct FunctionMc {
    pub stack_size: i32,
    pub epilogue_label: LabelId,
    pub prologue: Vec<Mc>,
    pub block: Vec<Mc>,
    pub epilogue: Vec<Mc>,
}

impl FunctionMc {
    /// prologue ++ block ++ epilogue
    pub fn into_list(self) -> Vec<Mc> {
        let mut list = self.prologue;
        list.extend(self.block);
        list.extend(self.epilogue);
        list
    }
}

/// Lowers a module and renders its assembly.
pub struct X64Codegen<'ir> {
    ir: &'ir IrGen,
    optimize: bool,
}

impl<'ir> X64Codegen<'ir> {
    pub fn new(ir: &'ir IrGen, optimize: bool) -> Self {
        Self { ir, optimize }
    }

    /// Assemble every function in the module.
    pub fn assembly(&self) -> String {
        let mut out = String::new();
        out.push_str("bits 64\n");
        out.push_str("section .text\n");

        for (name, function) in self.ir.module().iter() {
            writeln!(out, "global {}", name).unwrap();

            let mut mc = self.lower_function(function).into_list();
            if self.optimize {
                Optimizer::new(self.ir).run(&mut mc);
            }

            writeln!(out, "{}:", name).unwrap();
            emit::emit_body(self.ir, &mc, &mut out);
        }

        out
    }

    /// Lower one function without running the optimizer.
    pub fn lower_function(&self, function: &CfgFunction) -> FunctionMc {
        let mut alloc = LocationAllocator::new(self.ir);
        let epilogue_label = function
            .blocks
            .last()
            .expect("internal error: function has no blocks")
            .entry_label;

        let mut body = Vec::new();
        for block in &function.blocks {
            for inst in &block.insts {
                lower_inst(&mut body, &mut alloc, epilogue_label, inst);
            }
        }

        // The frame is kept 16-byte aligned.
        let stack_size = (alloc.stack_size() + 15) & !15;

        let mut prologue = Vec::new();
        if stack_size != 0 {
            prologue.push(Mc::Push { src: Operand::reg(RBP) });
            prologue.push(Mc::Mov { dst: Operand::reg(RBP), src: Operand::reg(RSP) });
        }
        for &gpr in alloc.regs_to_restore() {
            prologue.push(Mc::Push { src: Operand::reg(crate::mc::Reg::qword(gpr)) });
        }
        if stack_size != 0 {
            prologue.push(Mc::Sub {
                dst: Operand::reg(RSP),
                src: Operand::imm(stack_size as i64),
            });
        }

        let mut epilogue = Vec::new();
        for &gpr in alloc.regs_to_restore().iter().rev() {
            epilogue.push(Mc::Pop { src: Operand::reg(crate::mc::Reg::qword(gpr)) });
        }
        if stack_size != 0 {
            epilogue.push(Mc::Pop { src: Operand::reg(RBP) });
            epilogue.push(Mc::Add {
                dst: Operand::reg(RSP),
                src: Operand::imm(stack_size as i64),
            });
        }
        epilogue.push(Mc::Ret);

        FunctionMc { stack_size, epilogue_label, prologue, block: body, epilogue }
    }
}

fn lower_inst(
    mc: &mut Vec<Mc>,
    alloc: &mut LocationAllocator,
    epilogue_label: LabelId,
    inst: &Inst,
) {
    let strat = strategy(inst.opcode);
    if matches!(strat.result, Some(Lifetime::Persistent | Lifetime::Temporary)) {
        alloc.alloc_on_demand(inst.result);
    }

    let rax = Operand::reg(RAX);

    match inst.opcode {
        // The location was reserved above; nothing to execute.
        Opcode::Alloc => {}
        // Literals flow as immediates at their use sites.
        Opcode::Const => {}
        Opcode::Store => {
            let dst = alloc.operand(inst.operands[0]);
            let src = alloc.operand(inst.operands[1]);
            mc.push(Mc::Mov { dst, src });
        }
        Opcode::Load => {
            let src = alloc.operand(inst.operands[0]);
            mc.push(Mc::Mov { dst: rax, src });
            mc.push(Mc::Mov { dst: alloc.operand(inst.result), src: rax });
        }
        Opcode::Add | Opcode::Sub | Opcode::And | Opcode::Or | Opcode::Xor => {
            let lhs = alloc.operand(inst.operands[0]);
            let rhs = alloc.operand(inst.operands[1]);
            mc.push(Mc::Mov { dst: rax, src: lhs });
            mc.push(match inst.opcode {
                Opcode::Add => Mc::Add { dst: rax, src: rhs },
                Opcode::Sub => Mc::Sub { dst: rax, src: rhs },
                Opcode::And => Mc::And { dst: rax, src: rhs },
                Opcode::Or => Mc::Or { dst: rax, src: rhs },
                _ => Mc::Xor { dst: rax, src: rhs },
            });
            mc.push(Mc::Mov { dst: alloc.operand(inst.result), src: rax });
        }
        Opcode::Lesser => comparison(mc, alloc, inst, |dst| Mc::Setl { dst }),
        Opcode::LesserOrEqual => comparison(mc, alloc, inst, |dst| Mc::Setle { dst }),
        Opcode::Greater => comparison(mc, alloc, inst, |dst| Mc::Setg { dst }),
        Opcode::GreaterOrEqual => comparison(mc, alloc, inst, |dst| Mc::Setge { dst }),
        Opcode::Equal => comparison(mc, alloc, inst, |dst| Mc::Sete { dst }),
        Opcode::NotEqual => comparison(mc, alloc, inst, |dst| Mc::Setne { dst }),
        Opcode::Label => mc.push(Mc::Label { id: inst.operands[0] }),
        Opcode::Branch => {
            let cond = alloc.operand(inst.operands[0]);
            mc.push(Mc::Mov { dst: rax, src: cond });
            mc.push(Mc::Test { lhs: rax, rhs: rax });
            mc.push(Mc::Jnz { dst: Mc::label_dst(inst.operands[1]) });
            mc.push(Mc::Jz { dst: Mc::label_dst(inst.operands[2]) });
        }
        Opcode::Jump => mc.push(Mc::Jmp { dst: Mc::label_dst(inst.operands[0]) }),
        Opcode::Return => {
            if inst.operands[0] != NO_VALUE {
                let src = alloc.operand(inst.operands[0]);
                mc.push(Mc::Mov { dst: rax, src });
            }
            mc.push(Mc::Jmp { dst: Mc::label_dst(epilogue_label) });
        }
    }

    for (position, &operand) in inst.operands.iter().enumerate() {
        if strat.consumes.get(position).copied().unwrap_or(false) {
            alloc.consume(operand);
        }
    }
}

/// `mov rax, lhs; cmp rax, rhs; set<cc> al; movzx rax, al; mov result, rax`
fn comparison(
    mc: &mut Vec<Mc>,
    alloc: &mut LocationAllocator,
    inst: &Inst,
    set: fn(Operand) -> Mc,
) {
    let rax = Operand::reg(RAX);
    let al = Operand::reg(AL);

    let lhs = alloc.operand(inst.operands[0]);
    let rhs = alloc.operand(inst.operands[1]);
    mc.push(Mc::Mov { dst: rax, src: lhs });
    mc.push(Mc::Cmp { lhs: rax, rhs });
    mc.push(set(al));
    mc.push(Mc::MovZx { dst: rax, src: al });
    mc.push(Mc::Mov { dst: alloc.operand(inst.result), src: rax });
}
