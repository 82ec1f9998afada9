//! x86-64 backend for the Cyrex compiler
//!
//! Lowers CFG functions into a fixed machine-code repertoire ([`mc`]),
//! assigns every value a location on demand ([`allocator`], driven by the
//! per-opcode [`strategy`] table), rewrites the instruction list to a
//! fixpoint ([`optimizer`]) and prints NASM-flavored assembly ([`emit`]).

pub mod allocator;
pub mod emit;
pub mod lower;
pub mod mc;
pub mod optimizer;
pub mod strategy;

pub use allocator::*;
pub use emit::*;
pub use lower::*;
pub use mc::*;
pub use optimizer::*;
pub use strategy::*;
