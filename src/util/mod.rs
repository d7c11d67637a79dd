//! Utility modules for startupgen

pub mod logging;

pub use logging::{init_from_args, init_from_env, init_logging, LoggingConfig};
