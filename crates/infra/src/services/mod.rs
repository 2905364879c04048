//! Service layer implementations.
//!
//! Services wire the infrastructure adapters into the core use cases.

pub mod execution_stack;

pub use execution_stack::ExecutionStack;
