//! Shared utilities and error types for the Cyrex language compiler
//!
//! This crate provides the error type used across all compiler stages.

pub mod error;

pub use error::*;
