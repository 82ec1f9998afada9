//! Peephole optimization over the machine-code list
//!
//! Patterns are scanned from the head; whenever one fires, the scan
//! resumes at the rewrite point. The peephole and dead-label passes
//! iterate to a fixpoint, then a final sweep drops push/pop pairs whose
//! register is never touched in between.

use crate::mc::{Gpr, Mc, Operand};
use cyrex_ir::{LabelId, LiteralLookup, NO_VALUE};
use hashbrown::HashSet;

pub struct Optimizer<'a> {
    literals: &'a dyn LiteralLookup,
}

/// Truth of `lhs <cc> rhs` for the relational conditions. Zero-flag jumps
/// have no two-operand reading and never fold.
fn compile_time_compare(jump: &Mc, lhs: i64, rhs: i64) -> Option<bool> {
    match jump {
        Mc::Jl { .. } => Some(lhs < rhs),
        Mc::Jle { .. } => Some(lhs <= rhs),
        Mc::Jg { .. } => Some(lhs > rhs),
        Mc::Jge { .. } => Some(lhs >= rhs),
        Mc::Je { .. } => Some(lhs == rhs),
        Mc::Jne { .. } => Some(lhs != rhs),
        _ => None,
    }
}

impl<'a> Optimizer<'a> {
    pub fn new(literals: &'a dyn LiteralLookup) -> Self {
        Self { literals }
    }

    /// Iterate the rewrite passes to a fixpoint, then clean up push/pop
    /// pairs.
    pub fn run(&self, mc: &mut Vec<Mc>) {
        let before = mc.len();
        while self.pass(mc) {}
        self.remove_redundant_push_pop(mc);
        log::debug!("peephole: {} instructions down to {}", before, mc.len());
    }

    /// One round: peephole rewrites, then unused-label removal once the
    /// rewrites make no progress.
    pub fn pass(&self, mc: &mut Vec<Mc>) -> bool {
        self.peephole(mc) || self.dead_labels(mc)
    }

    fn peephole(&self, mc: &mut Vec<Mc>) -> bool {
        let mut changed = false;
        let mut i = 0;

        while i < mc.len() {
            let a = mc[i];
            let remaining = mc.len() - i;

            // mov x, x
            if let Some((dst, src)) = a.as_mov() {
                if dst == src {
                    mc.remove(i);
                    changed = true;
                    continue;
                }
            }

            // mov rax, 1 ; test rax, rax ; jcc T ; j<neg cc> F  ->  jmp T
            if remaining > 3 {
                let (b, c, d) = (mc[i + 1], mc[i + 2], mc[i + 3]);
                if let (Some((a_dst, a_src)), Some((t_lhs, t_rhs))) = (a.as_mov(), b.as_test()) {
                    if a_dst.is_rax()
                        && a_src.is_imm_value(1)
                        && t_lhs.is_rax()
                        && t_rhs.is_rax()
                        && c.is_conditional_jump()
                        && d.is_conditional_jump()
                        && d.same_kind(&c.negated())
                    {
                        let dst = c.jump_dst().unwrap();
                        mc.splice(i..i + 3, [Mc::Jmp { dst }]);
                        changed = true;
                        continue;
                    }
                }
            }

            // xor rax, rax ; test rax, rax ; jcc T ; j<neg cc> F  ->  jmp F
            if remaining > 3 {
                let (b, c, d) = (mc[i + 1], mc[i + 2], mc[i + 3]);
                if let (Some((a_dst, a_src)), Some((t_lhs, t_rhs))) = (a.as_xor(), b.as_test()) {
                    if a_dst.is_rax()
                        && a_src.is_rax()
                        && t_lhs.is_rax()
                        && t_rhs.is_rax()
                        && c.is_conditional_jump()
                        && d.is_conditional_jump()
                        && d.same_kind(&c.negated())
                    {
                        let dst = d.jump_dst().unwrap();
                        mc.splice(i..i + 3, [Mc::Jmp { dst }]);
                        changed = true;
                        continue;
                    }
                }
            }

            // mov rax, X ; mov Y, rax  ->  mov Y, X
            if remaining > 1 {
                if let (Some((a_dst, a_src)), Some((b_dst, b_src))) =
                    (a.as_mov(), mc[i + 1].as_mov())
                {
                    if a_dst.is_rax() && b_src == a_dst {
                        mc.splice(i..i + 2, [Mc::Mov { dst: b_dst, src: a_src }]);
                        changed = true;
                        continue;
                    }
                }
            }

            // mov A, C ; <math> A, B ; mov C, A  ->  <math> C, B
            if remaining > 2 {
                let (b, c) = (mc[i + 1], mc[i + 2]);
                if let (Some((a_dst, a_src)), Some((b_dst, b_src)), Some((c_dst, c_src))) =
                    (a.as_mov(), b.as_binary_math(), c.as_mov())
                {
                    if a_dst == b_dst && a_dst == c_src && a_src == c_dst {
                        mc.splice(i..i + 3, [b.binary_math_with(c_dst, b_src)]);
                        changed = true;
                        continue;
                    }
                }
            }

            // mov r, s ; <math> d, r  ->  <math> d, s   (s a register or immediate)
            if remaining > 1 {
                let b = mc[i + 1];
                if let (Some((a_dst, a_src)), Some((b_dst, b_src))) =
                    (a.as_mov(), b.as_binary_math())
                {
                    if a_dst.is_reg() && (a_src.is_reg() || a_src.is_imm()) && b_src == a_dst {
                        mc.splice(i..i + 2, [b.binary_math_with(b_dst, a_src)]);
                        changed = true;
                        continue;
                    }
                }
            }

            // xor r, r ; mov r2, r  ->  xor r2, r2
            if remaining > 1 {
                if let (Some((a_dst, a_src)), Some((b_dst, b_src))) =
                    (a.as_xor(), mc[i + 1].as_mov())
                {
                    if a_dst == a_src && b_src == a_dst {
                        mc.splice(i..i + 2, [Mc::Xor { dst: b_dst, src: b_dst }]);
                        changed = true;
                        continue;
                    }
                }
            }

            // xor c, c ; cmp x, c  ->  cmp x, 0   (c born from a literal)
            if remaining > 1 {
                if let (Some((a_dst, a_src)), Some((b_lhs, b_rhs))) =
                    (a.as_xor(), mc[i + 1].as_cmp())
                {
                    if a_dst == a_src
                        && a_src.value != NO_VALUE
                        && self.literals.literal(a_src.value).is_some()
                        && b_lhs.is_reg()
                        && b_rhs == a_src
                    {
                        mc.splice(i..i + 2, [Mc::Cmp { lhs: b_lhs, rhs: Operand::imm(0) }]);
                        changed = true;
                        continue;
                    }
                }
            }

            // xor r, r ; cmp r, 0 ; je L  ->  xor r, r ; jmp L
            if remaining > 2 {
                let (b, c) = (mc[i + 1], mc[i + 2]);
                if let (Some((a_dst, a_src)), Some((b_lhs, b_rhs)), Mc::Je { dst }) =
                    (a.as_xor(), b.as_cmp(), c)
                {
                    if a_dst == a_src && b_lhs == a_src && b_rhs.is_imm_value(0) {
                        mc[i + 1] = Mc::Jmp { dst };
                        mc.remove(i + 2);
                        changed = true;
                        continue;
                    }
                }
            }

            // xor r, r ; mov r, v  ->  mov r, v   (v a register)
            if remaining > 1 {
                if let (Some((a_dst, a_src)), Some((b_dst, b_src))) =
                    (a.as_xor(), mc[i + 1].as_mov())
                {
                    if a_dst == a_src && b_dst == a_src && b_src.is_reg() {
                        mc.remove(i);
                        changed = true;
                        continue;
                    }
                }
            }

            // jmp L ; jcc M  ->  jmp L
            if remaining > 1 {
                if matches!(a, Mc::Jmp { .. }) && mc[i + 1].is_conditional_jump() {
                    mc.remove(i + 1);
                    changed = true;
                    continue;
                }
            }

            // jmp L ; L:  ->  L:
            if remaining > 1 {
                if let (Mc::Jmp { dst }, Some(label)) = (a, mc[i + 1].as_label()) {
                    if dst.as_imm() == Some(label as i64) {
                        mc.remove(i);
                        changed = true;
                        continue;
                    }
                }
            }

            // mov x, 0  ->  xor x, x   (x not memory)
            if let Some((dst, src)) = a.as_mov() {
                if src.is_imm_value(0) && !dst.is_mem() {
                    mc[i] = Mc::Xor { dst, src: dst };
                    changed = true;
                    continue;
                }
            }

            // mov x, y ; mov z, x  ->  mov z, y
            if remaining > 1 {
                if let (Some((a_dst, a_src)), Some((b_dst, b_src))) =
                    (a.as_mov(), mc[i + 1].as_mov())
                {
                    if a_dst == b_src {
                        mc.splice(i..i + 2, [Mc::Mov { dst: b_dst, src: a_src }]);
                        changed = true;
                        continue;
                    }
                }
            }

            // cmp ; set<cc> ; movzx ; test ; jcc T ; jcc F
            //   ->  cmp ; j<cc> T ; j<neg cc> F
            if remaining > 5 {
                let (b, c, d, e, f) = (mc[i + 1], mc[i + 2], mc[i + 3], mc[i + 4], mc[i + 5]);
                if a.as_cmp().is_some()
                    && b.is_setcc()
                    && c.is_movzx()
                    && d.as_test().is_some()
                    && e.is_conditional_jump()
                    && f.is_conditional_jump()
                {
                    let e_dst = e.jump_dst().unwrap();
                    let f_dst = f.jump_dst().unwrap();
                    mc[i + 1] = b.set_to_jump(e_dst);
                    mc[i + 2] = b.set_to_jump(f_dst).negated();
                    mc.drain(i + 3..i + 6);
                    changed = true;
                    continue;
                }
            }

            // cmp ; set<cc> ; movzx ; test ; jcc T  ->  cmp ; j<cc> T
            if remaining > 4 {
                let (b, c, d, e) = (mc[i + 1], mc[i + 2], mc[i + 3], mc[i + 4]);
                if a.as_cmp().is_some()
                    && b.is_setcc()
                    && c.is_movzx()
                    && d.as_test().is_some()
                    && e.is_conditional_jump()
                {
                    let e_dst = e.jump_dst().unwrap();
                    mc[i + 1] = b.set_to_jump(e_dst);
                    mc.drain(i + 2..i + 5);
                    changed = true;
                    continue;
                }
            }

            // mov rax, I1 ; cmp rax, I2 ; jcc T ; jcc F
            //   ->  mov rax, I1 ; jmp <taken>
            if remaining > 3 {
                let (b, c, d) = (mc[i + 1], mc[i + 2], mc[i + 3]);
                if let (Some((a_dst, a_src)), Some((b_lhs, b_rhs))) = (a.as_mov(), b.as_cmp()) {
                    if a_dst.is_rax()
                        && a_src.is_imm()
                        && b_lhs.is_rax()
                        && b_rhs.is_imm()
                        && c.is_conditional_jump()
                        && d.is_conditional_jump()
                    {
                        let lhs = a_src.as_imm().unwrap();
                        let rhs = b_rhs.as_imm().unwrap();
                        if let Some(truth) = compile_time_compare(&c, lhs, rhs) {
                            let taken = if truth { c.jump_dst() } else { d.jump_dst() };
                            let taken = taken.unwrap();
                            mc.splice(i + 1..i + 3, [Mc::Jmp { dst: taken }]);
                            changed = true;
                            continue;
                        }
                    }
                }
            }

            // mov r, imm ; mov r2, r  ->  mov r2, imm
            if remaining > 1 {
                if let (Some((a_dst, a_src)), Some((b_dst, b_src))) =
                    (a.as_mov(), mc[i + 1].as_mov())
                {
                    if a_src.is_imm() && a_dst.is_reg() && b_src == a_dst {
                        mc.splice(i..i + 2, [Mc::Mov { dst: b_dst, src: a_src }]);
                        changed = true;
                        continue;
                    }
                }
            }

            // mov rax, r ; cmp rax, rhs  ->  cmp r, rhs
            if remaining > 1 {
                if let (Some((a_dst, a_src)), Some((b_lhs, b_rhs))) =
                    (a.as_mov(), mc[i + 1].as_cmp())
                {
                    if a_dst.is_rax() && a_src.is_reg() && b_lhs.is_rax() {
                        mc.splice(i..i + 2, [Mc::Cmp { lhs: a_src, rhs: b_rhs }]);
                        changed = true;
                        continue;
                    }
                }
            }

            // cmp ; jcc T ; j<neg cc> F ; <T or F>:  ->  drop the jump to
            // the label that directly follows
            if remaining > 3 {
                let (b, c, d) = (mc[i + 1], mc[i + 2], mc[i + 3]);
                if a.as_cmp().is_some()
                    && b.is_conditional_jump()
                    && c.is_conditional_jump()
                    && c.same_kind(&b.negated())
                {
                    if let Some(label) = d.as_label() {
                        if b.jump_target() == Some(label as i64) {
                            mc.remove(i + 1);
                            changed = true;
                            continue;
                        }
                        if c.jump_target() == Some(label as i64) {
                            mc.remove(i + 2);
                            changed = true;
                            continue;
                        }
                    }
                }
            }

            i += 1;
        }

        changed
    }

    /// Remove every label no jump refers to.
    fn dead_labels(&self, mc: &mut Vec<Mc>) -> bool {
        let mut referenced: HashSet<LabelId> = HashSet::new();
        for ins in mc.iter() {
            if matches!(ins, Mc::Jmp { .. }) || ins.is_conditional_jump() {
                if let Some(target) = ins.jump_target() {
                    referenced.insert(target as LabelId);
                }
            }
        }

        let before = mc.len();
        mc.retain(|ins| match ins.as_label() {
            Some(id) => referenced.contains(&id),
            None => true,
        });
        mc.len() != before
    }

    /// Drop push/pop pairs for registers (tracked by their 64-bit parent,
    /// `rbp` excluded) that no instruction between them touches.
    pub fn remove_redundant_push_pop(&self, mc: &mut Vec<Mc>) {
        let mut untouched: HashSet<Gpr> = HashSet::new();

        for ins in mc.iter() {
            if let Mc::Push { src } = ins {
                if let Some(reg) = src.as_reg() {
                    let gpr = reg.gpr;
                    if gpr != Gpr::Rbp && !untouched.contains(&gpr) {
                        untouched.insert(gpr);
                        continue;
                    }
                }
            }
            if matches!(ins, Mc::Pop { .. }) {
                continue;
            }
            for operand in ins.operands() {
                if let Some(reg) = operand.as_reg() {
                    untouched.remove(&reg.gpr);
                }
            }
        }

        mc.retain(|ins| match ins {
            Mc::Push { src } | Mc::Pop { src } => src
                .as_reg()
                .map_or(true, |reg| !untouched.contains(&reg.gpr)),
            _ => true,
        });
    }
}
