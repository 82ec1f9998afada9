//! x86-64 machine-code model: registers, operands, instructions

use cyrex_ir::{LabelId, ValueId, NO_VALUE};
use cyrex_parser::ast::Type;
use smallvec::SmallVec;
use std::fmt;
use std::mem;

/// The 14 general-purpose registers, addressed by their 64-bit name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gpr {
    Rbp,
    Rsp,
    Rax,
    Rbx,
    Rcx,
    Rdx,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
}

/// Register width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegSize {
    Qword,
    Dword,
    Word,
    Byte,
}

impl RegSize {
    /// The NASM size keyword used for memory operands.
    pub fn keyword(self) -> &'static str {
        match self {
            RegSize::Qword => "qword",
            RegSize::Dword => "dword",
            RegSize::Word => "word",
            RegSize::Byte => "byte",
        }
    }
}

/// A register at a specific width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reg {
    pub gpr: Gpr,
    pub size: RegSize,
}

pub const RAX: Reg = Reg { gpr: Gpr::Rax, size: RegSize::Qword };
pub const AL: Reg = Reg { gpr: Gpr::Rax, size: RegSize::Byte };
pub const RBP: Reg = Reg { gpr: Gpr::Rbp, size: RegSize::Qword };
pub const RSP: Reg = Reg { gpr: Gpr::Rsp, size: RegSize::Qword };

// System-V: rax..r11 may be clobbered freely, rbx/r12..r15 must be saved.
pub const VOLATILE_REGS: [Gpr; 7] =
    [Gpr::Rax, Gpr::Rcx, Gpr::Rdx, Gpr::R8, Gpr::R9, Gpr::R10, Gpr::R11];
pub const CALLEE_SAVED_REGS: [Gpr; 5] = [Gpr::Rbx, Gpr::R12, Gpr::R13, Gpr::R14, Gpr::R15];

impl Gpr {
    pub fn is_callee_saved(self) -> bool {
        CALLEE_SAVED_REGS.contains(&self)
    }

    pub fn name(self, size: RegSize) -> &'static str {
        use Gpr::*;
        use RegSize::*;
        match (self, size) {
            (Rbp, Qword) => "rbp",
            (Rbp, Dword) => "ebp",
            (Rbp, Word) => "bp",
            (Rbp, Byte) => "bpl",
            (Rsp, Qword) => "rsp",
            (Rsp, Dword) => "esp",
            (Rsp, Word) => "sp",
            (Rsp, Byte) => "spl",
            (Rax, Qword) => "rax",
            (Rax, Dword) => "eax",
            (Rax, Word) => "ax",
            (Rax, Byte) => "al",
            (Rbx, Qword) => "rbx",
            (Rbx, Dword) => "ebx",
            (Rbx, Word) => "bx",
            (Rbx, Byte) => "bl",
            (Rcx, Qword) => "rcx",
            (Rcx, Dword) => "ecx",
            (Rcx, Word) => "cx",
            (Rcx, Byte) => "cl",
            (Rdx, Qword) => "rdx",
            (Rdx, Dword) => "edx",
            (Rdx, Word) => "dx",
            (Rdx, Byte) => "dl",
            (R8, Qword) => "r8",
            (R8, Dword) => "r8d",
            (R8, Word) => "r8w",
            (R8, Byte) => "r8b",
            (R9, Qword) => "r9",
            (R9, Dword) => "r9d",
            (R9, Word) => "r9w",
            (R9, Byte) => "r9b",
            (R10, Qword) => "r10",
            (R10, Dword) => "r10d",
            (R10, Word) => "r10w",
            (R10, Byte) => "r10b",
            (R11, Qword) => "r11",
            (R11, Dword) => "r11d",
            (R11, Word) => "r11w",
            (R11, Byte) => "r11b",
            (R12, Qword) => "r12",
            (R12, Dword) => "r12d",
            (R12, Word) => "r12w",
            (R12, Byte) => "r12b",
            (R13, Qword) => "r13",
            (R13, Dword) => "r13d",
            (R13, Word) => "r13w",
            (R13, Byte) => "r13b",
            (R14, Qword) => "r14",
            (R14, Dword) => "r14d",
            (R14, Word) => "r14w",
            (R14, Byte) => "r14b",
            (R15, Qword) => "r15",
            (R15, Dword) => "r15d",
            (R15, Word) => "r15w",
            (R15, Byte) => "r15b",
        }
    }
}

impl Reg {
    pub const fn qword(gpr: Gpr) -> Reg {
        Reg { gpr, size: RegSize::Qword }
    }

    /// Collapse any width back to the 64-bit parent.
    pub fn largest(self) -> Reg {
        Reg::qword(self.gpr)
    }

    pub fn with_size(self, size: RegSize) -> Reg {
        Reg { gpr: self.gpr, size }
    }

    pub fn name(self) -> &'static str {
        self.gpr.name(self.size)
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Storage width and byte size of a source-level type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSize {
    pub elem: RegSize,
    pub bytes: i32,
}

/// Pointers are always a qword; everything else sizes by name, with an
/// unknown name falling back to one byte.
pub fn type_size(ty: &Type) -> TypeSize {
    if ty.is_pointer() {
        return TypeSize { elem: RegSize::Qword, bytes: 8 };
    }

    match ty.name.as_str() {
        "char" => TypeSize { elem: RegSize::Byte, bytes: 1 },
        "short" => TypeSize { elem: RegSize::Word, bytes: 2 },
        "int" => TypeSize { elem: RegSize::Dword, bytes: 4 },
        "long" => TypeSize { elem: RegSize::Qword, bytes: 8 },
        _ => TypeSize { elem: RegSize::Byte, bytes: 1 },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    Reg(Reg),
    Mem(i32),
    Imm(i64),
}

/// A machine operand, optionally tagged with the value id it came from.
/// The tag feeds diagnostics and optimizer decisions; equality ignores it.
#[derive(Debug, Clone, Copy)]
pub struct Operand {
    pub kind: OperandKind,
    pub value: ValueId,
}

impl PartialEq for Operand {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for Operand {}

impl Operand {
    pub fn reg(reg: Reg) -> Operand {
        Operand { kind: OperandKind::Reg(reg), value: NO_VALUE }
    }

    pub fn reg_for(reg: Reg, value: ValueId) -> Operand {
        Operand { kind: OperandKind::Reg(reg), value }
    }

    pub fn mem(offset: i32, value: ValueId) -> Operand {
        Operand { kind: OperandKind::Mem(offset), value }
    }

    pub fn imm(imm: i64) -> Operand {
        Operand { kind: OperandKind::Imm(imm), value: NO_VALUE }
    }

    pub fn imm_for(imm: i64, value: ValueId) -> Operand {
        Operand { kind: OperandKind::Imm(imm), value }
    }

    pub fn is_reg(&self) -> bool {
        matches!(self.kind, OperandKind::Reg(_))
    }

    pub fn is_mem(&self) -> bool {
        matches!(self.kind, OperandKind::Mem(_))
    }

    pub fn is_imm(&self) -> bool {
        matches!(self.kind, OperandKind::Imm(_))
    }

    pub fn is_imm_value(&self, value: i64) -> bool {
        self.kind == OperandKind::Imm(value)
    }

    pub fn is_rax(&self) -> bool {
        self.kind == OperandKind::Reg(RAX)
    }

    pub fn as_reg(&self) -> Option<Reg> {
        match self.kind {
            OperandKind::Reg(reg) => Some(reg),
            _ => None,
        }
    }

    pub fn as_imm(&self) -> Option<i64> {
        match self.kind {
            OperandKind::Imm(imm) => Some(imm),
            _ => None,
        }
    }
}

/// The machine-code repertoire. Jump destinations are immediates carrying
/// a label id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mc {
    // Storage
    Mov { dst: Operand, src: Operand },
    MovZx { dst: Operand, src: Operand },
    Push { src: Operand },
    Pop { src: Operand },
    // Maths
    Add { dst: Operand, src: Operand },
    Sub { dst: Operand, src: Operand },
    Inc { src: Operand },
    Dec { src: Operand },
    // Logic
    And { dst: Operand, src: Operand },
    Or { dst: Operand, src: Operand },
    Xor { dst: Operand, src: Operand },
    // Comparisons
    Cmp { lhs: Operand, rhs: Operand },
    Test { lhs: Operand, rhs: Operand },
    Setl { dst: Operand },
    Setle { dst: Operand },
    Setg { dst: Operand },
    Setge { dst: Operand },
    Sete { dst: Operand },
    Setne { dst: Operand },
    // Branching
    Jmp { dst: Operand },
    Jl { dst: Operand },
    Jle { dst: Operand },
    Jg { dst: Operand },
    Jge { dst: Operand },
    Je { dst: Operand },
    Jne { dst: Operand },
    Jnz { dst: Operand },
    Jz { dst: Operand },
    Label { id: LabelId },
    Ret,
    Nop,
}

impl Mc {
    pub fn label_dst(label: LabelId) -> Operand {
        Operand::imm(label as i64)
    }

    pub fn is_binary_math(&self) -> bool {
        matches!(self, Mc::Add { .. } | Mc::Sub { .. })
    }

    pub fn is_setcc(&self) -> bool {
        matches!(
            self,
            Mc::Setl { .. }
                | Mc::Setle { .. }
                | Mc::Setg { .. }
                | Mc::Setge { .. }
                | Mc::Sete { .. }
                | Mc::Setne { .. }
        )
    }

    pub fn is_conditional_jump(&self) -> bool {
        matches!(
            self,
            Mc::Jl { .. }
                | Mc::Jle { .. }
                | Mc::Jg { .. }
                | Mc::Jge { .. }
                | Mc::Je { .. }
                | Mc::Jne { .. }
                | Mc::Jnz { .. }
                | Mc::Jz { .. }
        )
    }

    /// Same instruction kind, operands ignored.
    pub fn same_kind(&self, other: &Mc) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }

    pub fn as_mov(&self) -> Option<(Operand, Operand)> {
        match self {
            Mc::Mov { dst, src } => Some((*dst, *src)),
            _ => None,
        }
    }

    pub fn as_binary_math(&self) -> Option<(Operand, Operand)> {
        match self {
            Mc::Add { dst, src } | Mc::Sub { dst, src } => Some((*dst, *src)),
            _ => None,
        }
    }

    pub fn as_xor(&self) -> Option<(Operand, Operand)> {
        match self {
            Mc::Xor { dst, src } => Some((*dst, *src)),
            _ => None,
        }
    }

    pub fn as_cmp(&self) -> Option<(Operand, Operand)> {
        match self {
            Mc::Cmp { lhs, rhs } => Some((*lhs, *rhs)),
            _ => None,
        }
    }

    pub fn as_test(&self) -> Option<(Operand, Operand)> {
        match self {
            Mc::Test { lhs, rhs } => Some((*lhs, *rhs)),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<LabelId> {
        match self {
            Mc::Label { id } => Some(*id),
            _ => None,
        }
    }

    pub fn is_movzx(&self) -> bool {
        matches!(self, Mc::MovZx { .. })
    }

    /// Destination operand of `jmp` or any conditional jump.
    pub fn jump_dst(&self) -> Option<Operand> {
        match self {
            Mc::Jmp { dst }
            | Mc::Jl { dst }
            | Mc::Jle { dst }
            | Mc::Jg { dst }
            | Mc::Jge { dst }
            | Mc::Je { dst }
            | Mc::Jne { dst }
            | Mc::Jnz { dst }
            | Mc::Jz { dst } => Some(*dst),
            _ => None,
        }
    }

    /// Label id targeted by `jmp` or a conditional jump.
    pub fn jump_target(&self) -> Option<i64> {
        self.jump_dst().and_then(|dst| dst.as_imm())
    }

    /// Flip the condition, preserving the destination.
    pub fn negated(&self) -> Mc {
        match *self {
            Mc::Jl { dst } => Mc::Jge { dst },
            Mc::Jle { dst } => Mc::Jg { dst },
            Mc::Jg { dst } => Mc::Jle { dst },
            Mc::Jge { dst } => Mc::Jl { dst },
            Mc::Jz { dst } => Mc::Jnz { dst },
            Mc::Jnz { dst } => Mc::Jz { dst },
            Mc::Je { dst } => Mc::Jne { dst },
            Mc::Jne { dst } => Mc::Je { dst },
            _ => panic!("internal error: jump instruction is not conditional"),
        }
    }

    /// Turn a `set<cc>` into the conditional jump with the same condition.
    pub fn set_to_jump(&self, dst: Operand) -> Mc {
        match self {
            Mc::Setl { .. } => Mc::Jl { dst },
            Mc::Setle { .. } => Mc::Jle { dst },
            Mc::Setg { .. } => Mc::Jg { dst },
            Mc::Setge { .. } => Mc::Jge { dst },
            Mc::Sete { .. } => Mc::Je { dst },
            Mc::Setne { .. } => Mc::Jne { dst },
            _ => panic!("internal error: instruction is not a setcc"),
        }
    }

    /// Rebuild this binary math instruction with new operands.
    pub fn binary_math_with(&self, dst: Operand, src: Operand) -> Mc {
        match self {
            Mc::Add { .. } => Mc::Add { dst, src },
            Mc::Sub { .. } => Mc::Sub { dst, src },
            _ => panic!("internal error: instruction is not binary math"),
        }
    }

    /// Every operand of the instruction, in no particular order.
    pub fn operands(&self) -> SmallVec<[Operand; 2]> {
        let mut out = SmallVec::new();
        match self {
            Mc::Mov { dst, src }
            | Mc::MovZx { dst, src }
            | Mc::Add { dst, src }
            | Mc::Sub { dst, src }
            | Mc::And { dst, src }
            | Mc::Or { dst, src }
            | Mc::Xor { dst, src } => {
                out.push(*dst);
                out.push(*src);
            }
            Mc::Cmp { lhs, rhs } | Mc::Test { lhs, rhs } => {
                out.push(*lhs);
                out.push(*rhs);
            }
            Mc::Push { src } | Mc::Pop { src } | Mc::Inc { src } | Mc::Dec { src } => {
                out.push(*src)
            }
            Mc::Setl { dst }
            | Mc::Setle { dst }
            | Mc::Setg { dst }
            | Mc::Setge { dst }
            | Mc::Sete { dst }
            | Mc::Setne { dst } => out.push(*dst),
            Mc::Jmp { dst }
            | Mc::Jl { dst }
            | Mc::Jle { dst }
            | Mc::Jg { dst }
            | Mc::Jge { dst }
            | Mc::Je { dst }
            | Mc::Jne { dst }
            | Mc::Jnz { dst }
            | Mc::Jz { dst } => out.push(*dst),
            Mc::Label { .. } | Mc::Ret | Mc::Nop => {}
        }
        out
    }
}
