//! Domain types and models

pub mod action;
pub mod approval;
pub mod batch;
pub mod device;

pub use action::{ActionOutcome, ActionRequest, ActionResult};
pub use approval::ApprovalRule;
pub use batch::{BatchResult, BatchStatus};
pub use device::{DeviceCatalogue, DeviceDescriptor};
