//! Run ad-hoc Node.js snippets through an external interpreter, optionally installing
//! npm packages first, and get back `returncode`, `stdout` and `stderr`.
//!
//! This is not a security sandbox: the only limit is a wall-clock timeout.

pub mod config;
pub mod execution;
pub mod functions;
pub mod printer;
pub mod process;
pub mod utils;

pub use execution::{ExecutionOutcome, ExecutionRequest, Executor, RuntimeProfile};
