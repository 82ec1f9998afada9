//! Lexical analysis for the Cyrex language
//!
//! Turns `.cyrex` source text into a flat token stream consumed by the
//! parser. Unknown bytes are recorded as errors and skipped so that a
//! single bad character does not abort scanning.

pub mod lexer;
pub mod token;

pub use lexer::*;
pub use token::*;
