//! Resolution of archive members into material components

use crate::grammar::classify;
use crate::map_kind::MapKind;
use crate::spec::MaterialSpec;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use texmat_core::{Result, TexmatError};

/// A map selected for the material
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedComponent {
    pub kind: MapKind,
    /// Filename token the kind was recognised by, lower-cased
    pub token: String,
    pub source_path: PathBuf,
    pub resolution_hint: Option<u32>,
}

/// The outcome of resolving one archive
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    /// At most one component per kind
    pub components: BTreeMap<MapKind, ResolvedComponent>,
    /// The map that won the relief slot, if any
    pub relief: Option<MapKind>,
    /// Resolution shared by every sized component
    pub resolution: Option<u32>,
}

impl Resolution {
    pub fn get(&self, kind: MapKind) -> Option<&ResolvedComponent> {
        self.components.get(&kind)
    }

    pub fn contains(&self, kind: MapKind) -> bool {
        self.components.contains_key(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = MapKind> + '_ {
        self.components.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// Classify the extracted files and pick the components to build from.
///
/// Files are visited in file-name order. When two files name the same kind
/// the first one visited is kept; callers must not rely on which.
pub fn resolve<P: AsRef<Path>>(files: &[P], spec: &MaterialSpec) -> Result<Resolution> {
    let mut ordered: Vec<(&str, &Path)> = files
        .iter()
        .filter_map(|p| {
            let path = p.as_ref();
            let name = path.file_name().and_then(|n| n.to_str());
            if name.is_none() {
                tracing::trace!(file = %path.display(), "not a map component");
            }
            name.map(|name| (name, path))
        })
        .collect();
    ordered.sort();

    let mut components: BTreeMap<MapKind, ResolvedComponent> = BTreeMap::new();
    let mut expected: Option<u32> = None;

    for (name, path) in ordered {
        let Some(classified) = classify(name, spec.grammar) else {
            tracing::trace!(file = name, "not a map component");
            continue;
        };

        if let Some(found) = classified.resolution {
            match expected {
                None => expected = Some(found),
                Some(expected) if expected != found => {
                    return Err(TexmatError::InconsistentResolution {
                        expected,
                        found,
                        file: name.to_string(),
                    });
                }
                Some(_) => {}
            }
        }

        if !spec.wants(classified.kind) {
            tracing::debug!(file = name, kind = %classified.kind, "component not wanted");
            continue;
        }

        if components.contains_key(&classified.kind) {
            tracing::debug!(file = name, kind = %classified.kind, "duplicate component ignored");
            continue;
        }

        components.insert(
            classified.kind,
            ResolvedComponent {
                kind: classified.kind,
                token: classified.token,
                source_path: path.to_path_buf(),
                resolution_hint: classified.resolution,
            },
        );
    }

    let relief = spec
        .relief_preference
        .select(spec.displacement, |k| components.contains_key(&k));

    // Losing normal/bump candidates have nowhere to go. Displacement stays
    // because it can still be used on its own.
    components.retain(|&kind, _| {
        !matches!(kind, MapKind::Normal | MapKind::Bump) || Some(kind) == relief
    });

    if components.is_empty() {
        return Err(TexmatError::NoUsableComponents);
    }

    tracing::debug!(
        components = components.len(),
        relief = ?relief,
        resolution = ?expected,
        "resolved archive components"
    );

    Ok(Resolution {
        components,
        relief,
        resolution: expected,
    })
}
