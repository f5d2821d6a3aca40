//! Command implementations.
//!
//! - [`build`] - Run or watch the configured targets
//! - [`check`] - Validate the configuration

pub mod build;
pub mod check;

pub use build::execute as build_execute;
pub use check::execute as check_execute;
