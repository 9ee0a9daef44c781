//! CLI command implementations

pub mod classify;
pub mod import;
pub mod library;
