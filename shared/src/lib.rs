//! Shared library for the discount code service
//!
//! Common functionality used by the service binaries:
//! - Error type with HTTP mapping
//! - Environment configuration

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{Config, StoreBackend};
pub use error::{AppError, ErrorResponse, Result};
