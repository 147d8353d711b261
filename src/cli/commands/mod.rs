//! Command handlers, one module per top-level subcommand.

pub mod attempt;
pub mod challenge;
pub mod init;
pub mod progress;
pub mod session;
