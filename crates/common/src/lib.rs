//! Framereel Common Utilities
//!
//! Shared infrastructure for all Framereel crates:
//! - Error taxonomy and result alias
//! - Pipeline configuration (the single source of every tunable)
//! - Run clock and frame pacing
//! - Tracing/logging initialization

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
