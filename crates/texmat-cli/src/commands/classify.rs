//! Filename classification command

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use texmat_resolve::{classify, resolve, FilenameGrammar, MapKind, Resolution};

use crate::config::TexmatConfig;

#[derive(Debug, Serialize)]
struct Row {
    file: String,
    kind: Option<MapKind>,
    token: Option<String>,
    pixels: Option<u32>,
}

#[derive(Serialize)]
struct Report<'a> {
    files: &'a [Row],
    resolution: &'a Resolution,
}

fn rows(files: &[PathBuf], grammar: FilenameGrammar) -> Vec<Row> {
    files
        .iter()
        .map(|path| {
            let file = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let classified = classify(&file, grammar);
            Row {
                kind: classified.as_ref().map(|c| c.kind),
                token: classified.as_ref().map(|c| c.token.clone()),
                pixels: classified.and_then(|c| c.resolution),
                file,
            }
        })
        .collect()
}

pub fn run(files: &[PathBuf], grammar: Option<FilenameGrammar>, format: &str) -> Result<()> {
    let mut spec = TexmatConfig::load()?.spec();
    if let Some(grammar) = grammar {
        spec.grammar = grammar;
    }

    let rows = rows(files, spec.grammar);
    let resolution = resolve(files, &spec)?;

    if format == "json" {
        let report = Report {
            files: &rows,
            resolution: &resolution,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for row in &rows {
        match (row.kind, &row.token) {
            (Some(kind), Some(token)) => {
                let pixels = row.pixels.map(|p| format!(" @ {}px", p)).unwrap_or_default();
                println!("  {:<32} {} ({}){}", row.file, kind.name(), token, pixels);
            }
            _ => println!("  {:<32} ignored", row.file),
        }
    }
    println!();
    let selected: Vec<&str> = resolution.kinds().map(MapKind::name).collect();
    println!("Selected: {}", selected.join(", "));
    if let Some(relief) = resolution.relief {
        println!("Relief: {}", relief.name());
    }
    Ok(())
}
