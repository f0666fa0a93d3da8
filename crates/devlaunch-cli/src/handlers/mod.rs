//! Command handlers.
//!
//! Handlers follow one pattern: `pub async fn execute(ctx: &CliContext, ...) -> Result<()>`.
//! They call the supervisor and format its answers; lifecycle rules live in the
//! runtime, not here.

pub mod clean;
pub mod console;
pub mod session;
pub mod status;
pub mod up;
pub mod url;
