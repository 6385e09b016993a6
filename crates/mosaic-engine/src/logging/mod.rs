//! Logging setup on the `log` facade with an `env_logger` backend.

mod init;

pub use init::{LoggingConfig, init_logging};
