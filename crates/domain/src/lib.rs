//! # HomeVoice Domain
//!
//! Business domain types and models for HomeVoice.
//!
//! This crate contains:
//! - Device action types (ActionRequest, ActionResult, BatchResult)
//! - Device catalogue and approval rule types
//! - Configuration structures
//! - Domain error types and Result definitions
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other HomeVoice crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
