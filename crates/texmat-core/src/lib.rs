//! Texmat Core - Foundational types for the texmat material importer
//!
//! This crate provides the types that all other texmat crates depend on:
//! - `TexmatError` - The error taxonomy and Result alias
//! - `ContentHash` - SHA-256 based structural fingerprints
//! - `Vec3` - Vector math used to check shading subgraphs

mod error;
mod hash;
mod types;

pub use error::{Result, TexmatError};
pub use hash::{ContentHash, Fingerprinter};
pub use types::Vec3;
