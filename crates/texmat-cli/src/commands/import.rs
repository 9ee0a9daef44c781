//! Archive import command

use anyhow::{Context, Result};
use std::path::PathBuf;
use texmat_graph::HostDocument;
use texmat_import::{import_archive, AutoExtractor, ImportOutcome};
use texmat_resolve::{DisplacementUsage, FilenameGrammar, MaterialSpec, PreferenceList};

use super::library;
use crate::config::TexmatConfig;

pub struct ImportArgs {
    pub archive: PathBuf,
    pub config: Option<PathBuf>,
    pub no_diffuse: bool,
    pub no_specular: bool,
    pub no_roughness: bool,
    pub prefer: Option<PreferenceList>,
    pub displacement: Option<DisplacementUsage>,
    pub grammar: Option<FilenameGrammar>,
    pub library: Option<PathBuf>,
    pub pack: Option<PathBuf>,
    pub format: String,
}

impl ImportArgs {
    /// Apply command-line flags on top of the configured spec
    fn spec(&self, config: &TexmatConfig) -> MaterialSpec {
        let mut spec = config.spec();
        if self.no_diffuse {
            spec.diffuse = false;
        }
        if self.no_specular {
            spec.specular = false;
        }
        if self.no_roughness {
            spec.roughness = false;
        }
        if let Some(prefer) = &self.prefer {
            spec.relief_preference = prefer.clone();
        }
        if let Some(displacement) = self.displacement {
            spec.displacement = displacement;
        }
        if let Some(grammar) = self.grammar {
            spec.grammar = grammar;
        }
        spec
    }

    /// The scratch directory is gone once the import returns, so images are
    /// always packed: into `--pack` when given, else the configured directory.
    fn document(&self, config: &TexmatConfig) -> HostDocument {
        HostDocument::with_pack_dir(self.pack.clone().unwrap_or_else(|| config.pack_dir.clone()))
    }
}

pub fn run(args: ImportArgs) -> Result<()> {
    if !args.archive.exists() {
        anyhow::bail!("File not found: {}", args.archive.display());
    }

    let config = match &args.config {
        Some(path) => TexmatConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TexmatConfig::load().context("Failed to load config")?,
    };
    let spec = args.spec(&config);
    tracing::debug!(?spec, "material spec");

    let library_path = args.library.clone().unwrap_or(config.library_path.clone());
    let groups = library::load(&library_path)?;

    let mut doc = args.document(&config);

    let outcome = import_archive(
        &args.archive,
        &spec,
        &groups,
        &AutoExtractor::default(),
        &mut doc,
    )
    .with_context(|| format!("Failed to import {}", args.archive.display()))?;

    library::save(&groups, &library_path)?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&outcome)?),
        "toml" => println!("{}", toml::to_string_pretty(&outcome)?),
        _ => print_summary(&outcome, &doc),
    }
    Ok(())
}

fn print_summary(outcome: &ImportOutcome, doc: &HostDocument) {
    let name = doc.last_material().unwrap_or(&outcome.material_name);
    println!("Material '{}' created.", name);
    if let Some(pixels) = outcome.resolution.resolution {
        println!("  Resolution: {}px", pixels);
    }
    for component in outcome.resolution.components.values() {
        let relief = if outcome.resolution.relief == Some(component.kind) {
            " (relief)"
        } else {
            ""
        };
        println!(
            "  {:<12} {}{}",
            component.kind.name(),
            component.source_path.file_name().unwrap_or_default().to_string_lossy(),
            relief
        );
    }
    println!(
        "  {} node(s), {} link(s), {} image(s)",
        outcome.graph.nodes.len(),
        outcome.graph.links.len(),
        outcome.graph.images.len()
    );
    for texture in &outcome.graph.textures {
        println!("  Standalone texture: {}", texture.name);
    }
}
