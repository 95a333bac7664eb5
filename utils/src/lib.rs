//! Shared utilities for the Satchel wallet.

pub mod logging;

pub use logging::{init_logging, LogFormat};
