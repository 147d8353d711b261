//! Infrastructure: external service clients, configuration, logging and
//! credential storage.

pub mod claude;
pub mod config;
pub mod credentials;
pub mod logging;
