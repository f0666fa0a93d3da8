//! Command-line adapter for the development process supervisor.

#![deny(unsafe_code)]

#[cfg(test)]
use tokio_test as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;

pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::{Commands, ConsoleCommand};
pub use error::CliError;
pub use parser::Cli;
