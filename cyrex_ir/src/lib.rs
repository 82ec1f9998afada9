//! Intermediate representation for the Cyrex compiler
//!
//! Three pieces live here: the linear three-address IR and its CFG form
//! ([`ir`]), the AST-to-IR generator ([`irgen`]), and the basic-block
//! builder ([`bb`]) that partitions a linear function and links successor
//! edges. [`liveness`] computes per-block dataflow over the finished CFG
//! and [`dump`] renders the textual IR listing.

pub mod bb;
pub mod dump;
pub mod ir;
pub mod irgen;
pub mod liveness;

pub use bb::*;
pub use dump::*;
pub use ir::*;
pub use irgen::*;
pub use liveness::*;
