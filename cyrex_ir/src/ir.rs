//! IR data model: opcodes, instructions, values and function shapes

use cyrex_parser::ast::Type;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Dense identifier of a produced value.
pub type ValueId = i32;

/// Label identifier. Labels share the operand integer type with values but
/// live in their own namespace.
pub type LabelId = i32;

/// Sentinel for "no result" / "no operand".
pub const NO_VALUE: ValueId = -1;

/// IR opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    // Storage
    Alloc,
    Const,
    Store,
    Load,
    // Math
    Add,
    Sub,
    // Comparison and logic
    Lesser,
    LesserOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
    And,
    Or,
    Xor,
    // Control flow
    Label,
    Branch,
    Jump,
    Return,
}

impl Opcode {
    pub fn name(self) -> &'static str {
        match self {
            Opcode::Alloc => "alloc",
            Opcode::Const => "const",
            Opcode::Store => "store",
            Opcode::Load => "load",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Lesser => "lt",
            Opcode::LesserOrEqual => "le",
            Opcode::Greater => "gt",
            Opcode::GreaterOrEqual => "ge",
            Opcode::Equal => "eq",
            Opcode::NotEqual => "neq",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Xor => "xor",
            Opcode::Label => "L",
            Opcode::Branch => "b",
            Opcode::Jump => "j",
            Opcode::Return => "ret",
        }
    }

    /// Binary arithmetic, comparison and logic opcodes: two value
    /// operands, one result.
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            Opcode::Add
                | Opcode::Sub
                | Opcode::Lesser
                | Opcode::LesserOrEqual
                | Opcode::Greater
                | Opcode::GreaterOrEqual
                | Opcode::Equal
                | Opcode::NotEqual
                | Opcode::And
                | Opcode::Or
                | Opcode::Xor
        )
    }
}

/// A produced value. Id and type are immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    pub ty: Type,
}

/// A tagged constant. Only signed 64-bit integers exist today; the tag
/// keeps the representation open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
}

impl Literal {
    pub fn as_i64(self) -> i64 {
        match self {
            Literal::Int(v) => v,
        }
    }
}

/// Instruction operand list; labels and values share the slot type.
pub type Operands = SmallVec<[i32; 3]>;

/// A three-address instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inst {
    pub opcode: Opcode,
    pub result: ValueId,
    pub operands: Operands,
}

impl Inst {
    pub fn new(opcode: Opcode, result: ValueId, operands: &[i32]) -> Self {
        Self { opcode, result, operands: Operands::from_slice(operands) }
    }

    pub fn is_block_terminator(&self) -> bool {
        matches!(self.opcode, Opcode::Branch | Opcode::Jump | Opcode::Return)
    }

    /// Value ids this instruction reads. Label operands are excluded.
    pub fn read_operands(&self) -> Operands {
        match self.opcode {
            Opcode::Store => Operands::from_slice(&[self.operands[1]]),
            Opcode::Load => Operands::from_slice(&[self.operands[0]]),
            op if op.is_binary() => Operands::from_slice(&self.operands[..2]),
            Opcode::Branch => Operands::from_slice(&[self.operands[0]]),
            Opcode::Return if self.operands[0] != NO_VALUE => {
                Operands::from_slice(&[self.operands[0]])
            }
            _ => Operands::new(),
        }
    }

    /// Value ids this instruction writes.
    pub fn written_operands(&self) -> Operands {
        match self.opcode {
            Opcode::Const | Opcode::Load => Operands::from_slice(&[self.result]),
            Opcode::Store => Operands::from_slice(&[self.operands[0]]),
            op if op.is_binary() => Operands::from_slice(&[self.result]),
            _ => Operands::new(),
        }
    }
}

/// A function as a flat instruction stream, before block partitioning.
///
/// The first instruction is always the prologue label and the last the
/// epilogue label. `values` snapshots the generator's value table when the
/// function completes; ids index into it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearFunction {
    pub prologue_label: LabelId,
    pub epilogue_label: LabelId,
    pub values: Vec<Value>,
    pub insts: Vec<Inst>,
}

/// A maximal straight-line run of instructions with one entry label.
///
/// Successors are indices into the owning function's block list, so the
/// graph stays cycle-free at the ownership level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BasicBlock {
    pub entry_label: LabelId,
    pub insts: Vec<Inst>,
    pub successors: SmallVec<[usize; 2]>,
}

/// A function in CFG form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CfgFunction {
    pub values: Vec<Value>,
    pub blocks: Vec<BasicBlock>,
}

/// Mapping from function name to CFG function, preserving source order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Module {
    functions: Vec<(String, CfgFunction)>,
}

impl Module {
    pub fn insert(&mut self, name: impl Into<String>, function: CfgFunction) {
        self.functions.push((name.into(), function));
    }

    pub fn get(&self, name: &str) -> Option<&CfgFunction> {
        self.functions
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, f)| f)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.iter().any(|(n, _)| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CfgFunction)> {
        self.functions.iter().map(|(n, f)| (n.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Read-only literal query, the one thing the machine-code optimizer needs
/// to know about the IR generator.
pub trait LiteralLookup {
    fn literal(&self, value: ValueId) -> Option<Literal>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminators_are_branch_jump_return() {
        assert!(Inst::new(Opcode::Jump, NO_VALUE, &[0]).is_block_terminator());
        assert!(Inst::new(Opcode::Branch, NO_VALUE, &[0, 1, 2]).is_block_terminator());
        assert!(Inst::new(Opcode::Return, NO_VALUE, &[NO_VALUE]).is_block_terminator());
        assert!(!Inst::new(Opcode::Label, NO_VALUE, &[0]).is_block_terminator());
        assert!(!Inst::new(Opcode::Add, 2, &[0, 1]).is_block_terminator());
    }

    #[test]
    fn read_and_written_operands_per_opcode() {
        let store = Inst::new(Opcode::Store, NO_VALUE, &[0, 1]);
        assert_eq!(store.read_operands().as_slice(), &[1]);
        assert_eq!(store.written_operands().as_slice(), &[0]);

        let add = Inst::new(Opcode::Add, 2, &[0, 1]);
        assert_eq!(add.read_operands().as_slice(), &[0, 1]);
        assert_eq!(add.written_operands().as_slice(), &[2]);

        let branch = Inst::new(Opcode::Branch, NO_VALUE, &[3, 10, 11]);
        assert_eq!(branch.read_operands().as_slice(), &[3]);
        assert!(branch.written_operands().is_empty());

        let ret_void = Inst::new(Opcode::Return, NO_VALUE, &[NO_VALUE]);
        assert!(ret_void.read_operands().is_empty());
    }

    #[test]
    fn module_preserves_insertion_order() {
        let mut module = Module::default();
        module.insert("zeta", CfgFunction::default());
        module.insert("alpha", CfgFunction::default());
        let names: Vec<&str> = module.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert!(module.contains("alpha"));
        assert!(module.get("missing").is_none());
    }
}
