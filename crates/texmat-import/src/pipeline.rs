//! End-to-end import of one archive

use serde::Serialize;
use std::path::Path;
use texmat_core::Result;
use texmat_graph::{synthesize, GraphSink, NodeGraph, NodeGroupLibrary};
use texmat_resolve::{resolve, MaterialSpec, Resolution};

use crate::extract::Extractor;

/// What one import produced
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    /// Name requested for the material. The sink may have renamed it.
    pub material_name: String,
    pub resolution: Resolution,
    pub graph: NodeGraph,
}

/// Material name for an archive: its file name up to the last dot
pub fn material_name(archive: &Path) -> String {
    archive
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("material")
        .to_string()
}

/// Extract `archive`, build a material from its texture maps and hand the
/// material to `sink`.
///
/// The scratch directory is removed before this returns, whether or not the
/// import succeeded, so a sink that needs the image files past this point
/// must copy them while the material is applied.
pub fn import_archive<E, S>(
    archive: &Path,
    spec: &MaterialSpec,
    library: &NodeGroupLibrary,
    extractor: &E,
    sink: &mut S,
) -> Result<ImportOutcome>
where
    E: Extractor + ?Sized,
    S: GraphSink,
{
    let material_name = material_name(archive);
    tracing::info!(archive = %archive.display(), material = %material_name, "importing");

    let scratch = extractor.extract(archive)?;
    tracing::debug!(files = scratch.files().len(), dir = %scratch.path().display(), "extracted");

    let resolution = resolve(scratch.files(), spec)?;
    tracing::info!(
        components = resolution.len(),
        relief = ?resolution.relief,
        resolution = ?resolution.resolution,
        "resolved components"
    );

    let graph = synthesize(&resolution, spec, &material_name, library);
    graph.apply(sink)?;
    drop(scratch);

    Ok(ImportOutcome {
        material_name,
        resolution,
        graph,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ScratchDir;
    use std::cell::RefCell;
    use std::fs;
    use std::path::PathBuf;
    use texmat_core::TexmatError;
    use texmat_graph::HostDocument;

    /// Writes fixed empty files and remembers where
    struct FixedFiles {
        names: Vec<&'static str>,
        used: RefCell<Option<PathBuf>>,
    }

    impl FixedFiles {
        fn new(names: &[&'static str]) -> Self {
            Self {
                names: names.to_vec(),
                used: RefCell::new(None),
            }
        }

        fn scratch_path(&self) -> PathBuf {
            self.used.borrow().clone().unwrap()
        }
    }

    impl Extractor for FixedFiles {
        fn extract(&self, _archive: &Path) -> Result<ScratchDir> {
            let scratch = ScratchDir::new()?;
            for name in &self.names {
                fs::write(scratch.path().join(name), b"img")?;
            }
            *self.used.borrow_mut() = Some(scratch.path().to_path_buf());
            scratch.scan()
        }
    }

    #[test]
    fn test_material_name_is_file_stem() {
        assert_eq!(material_name(Path::new("/dl/rock_01.zip")), "rock_01");
        assert_eq!(material_name(Path::new("bark.tar.gz")), "bark.tar");
    }

    #[test]
    fn test_import_builds_material() {
        let extractor = FixedFiles::new(&["x_diff_1k.png", "x_rough_1k.png"]);
        let library = NodeGroupLibrary::new();
        let mut doc = HostDocument::new();
        let outcome = import_archive(
            Path::new("bark.zip"),
            &MaterialSpec::default(),
            &library,
            &extractor,
            &mut doc,
        )
        .unwrap();
        assert_eq!(outcome.material_name, "bark");
        assert_eq!(outcome.resolution.resolution, Some(1024));
        assert!(doc.material("bark").is_some());
        assert!(!extractor.scratch_path().exists());
    }

    #[test]
    fn test_scratch_removed_on_failure() {
        let extractor = FixedFiles::new(&["readme.txt", "preview.jpg"]);
        let library = NodeGroupLibrary::new();
        let mut doc = HostDocument::new();
        let err = import_archive(
            Path::new("bark.zip"),
            &MaterialSpec::default(),
            &library,
            &extractor,
            &mut doc,
        )
        .unwrap_err();
        assert!(matches!(err, TexmatError::NoUsableComponents));
        assert!(!extractor.scratch_path().exists());
        assert!(doc.materials.is_empty());
    }

    #[test]
    fn test_inconsistent_resolution_aborts() {
        let extractor = FixedFiles::new(&["a_diff_2k.png", "a_nor_4k.png"]);
        let library = NodeGroupLibrary::new();
        let mut doc = HostDocument::new();
        let err = import_archive(
            Path::new("a.zip"),
            &MaterialSpec::default(),
            &library,
            &extractor,
            &mut doc,
        )
        .unwrap_err();
        assert!(matches!(err, TexmatError::InconsistentResolution { .. }));
        assert!(doc.materials.is_empty());
        assert!(library.is_empty());
    }
}
