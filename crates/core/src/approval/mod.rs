//! Action approval

pub mod policy;

pub use policy::ApprovalPolicy;
