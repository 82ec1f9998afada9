//! On-demand location assignment for IR values
//!
//! One allocator lives per function and is dropped with it. Values get a
//! volatile register when one is free, then a callee-saved register
//! (recorded for save/restore), then a stack slot.

use crate::mc::{type_size, Gpr, Operand, Reg, CALLEE_SAVED_REGS, VOLATILE_REGS};
use crate::strategy::Lifetime;
use cyrex_ir::{IrGen, LiteralLookup, ValueId};
use hashbrown::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Reg(Gpr),
    Stack(i32),
}

#[derive(Debug, Clone, Copy)]
pub struct ValueLocation {
    pub loc: Location,
    pub lifetime: Lifetime,
}

pub struct LocationAllocator<'ir> {
    ir: &'ir IrGen,
    locations: HashMap<ValueId, ValueLocation>,
    claimed: HashMap<Gpr, ValueId>,
    stack_size: i32,
    regs_to_restore: Vec<Gpr>,
    claimed_callee_saved: HashSet<Gpr>,
}

impl<'ir> LocationAllocator<'ir> {
    pub fn new(ir: &'ir IrGen) -> Self {
        Self {
            ir,
            locations: HashMap::new(),
            claimed: HashMap::new(),
            stack_size: 0,
            regs_to_restore: Vec::new(),
            claimed_callee_saved: HashSet::new(),
        }
    }

    pub fn stack_size(&self) -> i32 {
        self.stack_size
    }

    /// Callee-saved registers claimed so far, in claim order.
    pub fn regs_to_restore(&self) -> &[Gpr] {
        &self.regs_to_restore
    }

    pub fn alloc_reg(&mut self, value: ValueId, gpr: Gpr, lifetime: Lifetime) {
        if self.claimed.contains_key(&gpr) {
            panic!(
                "internal error: {} is already claimed",
                Reg::qword(gpr).name()
            );
        }
        self.claimed.insert(gpr, value);
        self.locations
            .insert(value, ValueLocation { loc: Location::Reg(gpr), lifetime });
    }

    pub fn alloc_stack(&mut self, value: ValueId, lifetime: Lifetime) {
        let size = type_size(&self.ir.value(value).ty);
        self.stack_size += size.bytes;
        self.locations.insert(
            value,
            ValueLocation { loc: Location::Stack(self.stack_size), lifetime },
        );
    }

    /// Give `value` a location if it has none: volatile registers first
    /// (never `rax`, it is the lowering scratch), then callee-saved, then
    /// a stack spill.
    pub fn alloc_on_demand(&mut self, value: ValueId) {
        if self.locations.contains_key(&value) {
            return;
        }

        for gpr in VOLATILE_REGS {
            if gpr == Gpr::Rax {
                continue;
            }
            if !self.claimed.contains_key(&gpr) {
                self.alloc_reg(value, gpr, Lifetime::Temporary);
                return;
            }
        }

        for gpr in CALLEE_SAVED_REGS {
            if !self.claimed.contains_key(&gpr) {
                self.alloc_reg(value, gpr, Lifetime::Temporary);
                self.save_callee_reg(gpr);
                return;
            }
        }

        self.alloc_stack(value, Lifetime::Temporary);
    }

    fn save_callee_reg(&mut self, gpr: Gpr) {
        if !gpr.is_callee_saved() {
            panic!(
                "internal error: {} is not a callee saved reg",
                Reg::qword(gpr).name()
            );
        }
        if self.claimed_callee_saved.insert(gpr) {
            self.regs_to_restore.push(gpr);
        }
    }

    /// Release a value's register once its last use completed. Persistent
    /// values and stack slots stay put.
    pub fn consume(&mut self, value: ValueId) {
        let Some(location) = self.locations.get(&value) else { return };
        if location.lifetime == Lifetime::Persistent {
            return;
        }
        if let Location::Reg(gpr) = location.loc {
            log::trace!("consumed v{}", value);
            self.claimed.remove(&gpr);
            self.locations.remove(&value);
        }
    }

    pub fn location(&self, value: ValueId) -> Option<Operand> {
        self.locations.get(&value).map(|location| match location.loc {
            Location::Reg(gpr) => Operand::reg_for(Reg::qword(gpr), value),
            Location::Stack(offset) => Operand::mem(offset, value),
        })
    }

    /// The operand for a use of `value`: its location if one exists, the
    /// literal as an immediate otherwise. Anything else is a compiler bug.
    pub fn operand(&self, value: ValueId) -> Operand {
        if let Some(operand) = self.location(value) {
            return operand;
        }
        if let Some(literal) = self.ir.literal(value) {
            return Operand::imm_for(literal.as_i64(), value);
        }
        panic!("internal error: use of unallocated value v{}", value);
    }
}
