//! Batch execution of device actions

pub mod executor;

pub use executor::ActionExecutor;
