//! Adapters implementing domain ports.

pub mod generation;
pub mod images;
pub mod memory;
pub mod sqlite;
