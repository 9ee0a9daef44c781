//! Texmat Import - Archive extraction and the import pipeline
//!
//! An import extracts a texture archive into a scratch directory, resolves
//! which maps to use, synthesizes a material graph and applies it to a
//! [`texmat_graph::GraphSink`].

mod extract;
mod pipeline;

pub use extract::{AutoExtractor, Extractor, ScratchDir, UnarExtractor, ZipExtractor};
pub use pipeline::{import_archive, material_name, ImportOutcome};
