//! Recourse Test Harness - scenarios, fuzzing and benchmarks
//!
//! This crate provides:
//! - End-to-end recovery scenarios (signal, handler case, restarts)
//! - Randomized stack-discipline fuzzing
//! - Property-based tests of the engine's stack and dispatch rules
//! - Criterion benchmarks for dispatch and restart lookup

pub mod proptest_stacks;
pub mod scenarios;
pub mod stack_fuzzer;

pub use scenarios::*;
pub use stack_fuzzer::*;
