//! This crate contains the initialization logic for logging and the helpers
//! that make the binaries' output consistent.
pub mod config;
pub mod panic_hook;
pub mod tracing;

pub use config::Config;
