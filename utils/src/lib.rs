//! Shared utilities for the OCL governance contracts.

pub mod logging;

pub use logging::{init_logging, init_tracing, LogFormat, UnknownLogFormat};
