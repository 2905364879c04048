//! Hub messaging
//!
//! - [`client`]: breaker-guarded messaging client
//! - [`loopback`]: in-process hub transport with fault injection
//! - [`breakers`]: breaker registry construction from configuration

pub mod breakers;
pub mod client;
pub mod loopback;

pub use breakers::{breaker_config, registry_from_config};
pub use client::MessagingClient;
pub use loopback::{HubOperation, LoopbackHub, PublishedMessage};
