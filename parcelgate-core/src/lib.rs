//! parcelgate core - shared error, logging and configuration layer
//!
//! Everything the access crate needs from its surroundings: one error type
//! with context, a tracing bootstrap and the TOML configuration model.

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
pub use logging::*;

// Re-export commonly used external types
pub use tracing;
