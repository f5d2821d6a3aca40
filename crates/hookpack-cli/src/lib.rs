//! hookpack CLI - run hook-driven builds from a configuration file.
//!
//! # Architecture
//!
//! - [`cli`] - Argument definitions
//! - [`config`] - Configuration file discovery and layering
//! - [`error`] - CLI error type and miette conversion
//! - [`logger`] - Structured logging with tracing
//! - [`ui`] - Status messages and build summaries
//! - `commands` - `build` and `check`
//!
//! # Example
//!
//! ```rust,no_run
//! use hookpack_cli::{error::Result, logger};
//!
//! fn main() -> Result<()> {
//!     logger::init_logger(false, false, false);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, Result};
