//! Texmat CLI - Build shader materials from texture archives

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{classify, import, library};
use std::path::PathBuf;
use texmat_resolve::{DisplacementUsage, FilenameGrammar, PreferenceList};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "texmat")]
#[command(about = "Turn texture map archives into shader materials", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a texture archive as a material
    Import {
        /// Path to the archive (.zip, or anything unar understands)
        archive: PathBuf,

        /// Read settings from this file instead of the usual config layers
        #[arg(long)]
        config: Option<PathBuf>,

        /// Skip the diffuse map
        #[arg(long)]
        no_diffuse: bool,

        /// Skip the specular map
        #[arg(long)]
        no_specular: bool,

        /// Skip the roughness map
        #[arg(long)]
        no_roughness: bool,

        /// Relief map preference, most preferred first (e.g. "normal,bump,disp")
        #[arg(long)]
        prefer: Option<PreferenceList>,

        /// How to use a displacement map: none, material, texture
        #[arg(long)]
        displacement: Option<DisplacementUsage>,

        /// Filename convention: combined, sized, bare
        #[arg(long)]
        grammar: Option<FilenameGrammar>,

        /// Node group library file, created if missing
        #[arg(long)]
        library: Option<PathBuf>,

        /// Copy images into this directory (defaults to the configured pack_dir)
        #[arg(long)]
        pack: Option<PathBuf>,

        /// Output format (text, json or toml)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show how file names would be classified and resolved
    Classify {
        /// File names to classify
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Filename convention: combined, sized, bare
        #[arg(long)]
        grammar: Option<FilenameGrammar>,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Node group library operations
    #[command(subcommand)]
    Library(library::LibraryCommands),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Import {
            archive,
            config,
            no_diffuse,
            no_specular,
            no_roughness,
            prefer,
            displacement,
            grammar,
            library,
            pack,
            format,
        } => import::run(import::ImportArgs {
            archive,
            config,
            no_diffuse,
            no_specular,
            no_roughness,
            prefer,
            displacement,
            grammar,
            library,
            pack,
            format,
        }),
        Commands::Classify {
            files,
            grammar,
            format,
        } => classify::run(&files, grammar, &format),
        Commands::Library(cmd) => library::run(cmd),
    }
}
