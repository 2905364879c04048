//! Shared test helpers for `homevoice-core` integration tests.
//!
//! Provides an in-memory `DeviceMessaging` mock so executor tests can focus
//! on batch behaviour instead of transport plumbing.

pub mod messaging;
