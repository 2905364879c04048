//! Messaging ports
//!
//! This module provides the port interfaces between the execution layer and
//! the home-automation hub.

pub mod ports;

pub use ports::{DeviceMessaging, HubTransport, MessageHandler};
