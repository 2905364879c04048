//! Testing utilities and helpers
//!
//! - **[`mocks`]**: recording observer, scripted operations and a classified
//!   test error
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use homevoice_common::resilience::{CircuitBreaker, CircuitBreakerConfig};
//! use homevoice_common::testing::{MockClock, RecordingObserver};
//!
//! let clock = MockClock::new();
//! let observer = Arc::new(RecordingObserver::new());
//! let breaker =
//!     CircuitBreaker::with_clock("publish", CircuitBreakerConfig::default(), clock.clone())
//!         .expect("valid config")
//!         .with_observer(observer.clone());
//!
//! clock.advance(Duration::from_secs(5));
//! assert!(observer.events().is_empty());
//! # drop(breaker);
//! ```

pub mod mocks;

pub use mocks::{BreakerEvent, RecordingObserver, ScriptedOperation, TestError};

pub use crate::resilience::{Clock, MockClock, SystemClock};
