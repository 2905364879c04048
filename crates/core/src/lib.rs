//! # HomeVoice Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces for the hub transport and guarded messaging
//! - The auto-approval policy
//! - The batch action executor
//! - Command and messaging error types
//!
//! ## Architecture Principles
//! - Depends only on `homevoice-common` and `homevoice-domain`
//! - No network or platform code
//! - All external dependencies via traits

pub mod approval;
pub mod errors;
pub mod execution;
pub mod messaging;

pub use approval::ApprovalPolicy;
pub use errors::{CommandError, ExecutionError, MessagingError, TransportError};
pub use execution::ActionExecutor;
pub use messaging::{DeviceMessaging, HubTransport, MessageHandler};
