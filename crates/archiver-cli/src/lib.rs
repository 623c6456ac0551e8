//! Driver for the setup archiver.
//!
//! [`driver::Archiver`] runs one complete mirroring pass; the
//! `setup-archiver` binary wraps it with argument parsing, logging and a
//! summary table.

pub mod config;
pub mod driver;
pub mod logging;
pub mod summary;

pub use config::{ArchiverConfig, ReplaceMode};
pub use driver::{Archiver, RunReport};
