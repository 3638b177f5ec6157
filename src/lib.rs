// Core infrastructure modules
pub mod core {
    pub mod config;
    pub mod errors;
}

pub mod dispatch; // Graph nodes and path-parallel loading
pub mod logging;

// Re-exports for convenience
pub use crate::core::config::{LoaderConfig, LoaderConfigBuilder};
pub use crate::core::errors::{LoaderError, Result};
pub use dispatch::*;
pub use logging::init_tracing;
