//! Node group library commands

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::{Path, PathBuf};
use texmat_graph::NodeGroupLibrary;

use crate::config::TexmatConfig;

#[derive(Subcommand)]
pub enum LibraryCommands {
    /// List node groups in the library
    List {
        /// Library file (defaults to the configured one)
        #[arg(long)]
        library: Option<PathBuf>,

        /// Output format (text, json or toml)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

pub fn run(cmd: LibraryCommands) -> Result<()> {
    match cmd {
        LibraryCommands::List { library, format } => run_list(library, &format),
    }
}

/// Read a library file. A missing file is an empty library.
pub fn load(path: &Path) -> Result<NodeGroupLibrary> {
    if !path.exists() {
        return Ok(NodeGroupLibrary::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read library {}", path.display()))?;
    let library = toml::from_str(&content)
        .with_context(|| format!("Failed to parse library {}", path.display()))?;
    Ok(library)
}

pub fn save(library: &NodeGroupLibrary, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let content = toml::to_string_pretty(library)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write library {}", path.display()))?;
    tracing::debug!(path = %path.display(), groups = library.len(), "library saved");
    Ok(())
}

fn run_list(path: Option<PathBuf>, format: &str) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => TexmatConfig::load()?.library_path,
    };
    let library = load(&path)?;

    if library.is_empty() {
        println!("No node groups in {}", path.display());
        return Ok(());
    }

    match format {
        "json" => {
            let items: Vec<serde_json::Value> = library
                .groups()
                .iter()
                .map(|g| {
                    serde_json::json!({
                        "name": g.name,
                        "fingerprint": g.fingerprint().to_prefixed_hex(),
                        "inputs": g.inputs.iter().map(|s| &s.name).collect::<Vec<_>>(),
                        "outputs": g.outputs.iter().map(|s| &s.name).collect::<Vec<_>>(),
                        "nodes": g.nodes.len(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        "toml" => println!("{}", toml::to_string_pretty(&library)?),
        _ => {
            println!("{} node group(s):\n", library.len());
            for group in library.groups() {
                println!(
                    "  {} ({} node(s)) [{}]",
                    group.name,
                    group.nodes.len(),
                    &group.fingerprint().to_hex()[..12]
                );
            }
        }
    }
    Ok(())
}
