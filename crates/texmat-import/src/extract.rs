//! Archive extraction into a scratch directory

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;
use texmat_core::{Result, TexmatError};
use zip::ZipArchive;

const SCRATCH_PREFIX: &str = "texture-import-";

/// A private directory holding one archive's extracted files.
///
/// The directory and everything in it is deleted when this value is dropped.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
    files: Vec<PathBuf>,
}

impl ScratchDir {
    /// Create an empty scratch directory under the system temp dir
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir()
            .map_err(|e| {
                TexmatError::ArchiveUnreadable(format!("cannot create scratch directory: {}", e))
            })?;
        Ok(Self {
            dir,
            files: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Regular files found by the last [`ScratchDir::scan`], in path order
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Record every regular file below the directory
    pub fn scan(mut self) -> Result<Self> {
        let mut files = Vec::new();
        let mut pending = vec![self.dir.path().to_path_buf()];
        while let Some(dir) = pending.pop() {
            for entry in fs::read_dir(&dir).map_err(unreadable)? {
                let entry = entry.map_err(unreadable)?;
                let file_type = entry.file_type().map_err(unreadable)?;
                if file_type.is_dir() {
                    pending.push(entry.path());
                } else if file_type.is_file() {
                    files.push(entry.path());
                }
            }
        }
        files.sort();
        self.files = files;
        Ok(self)
    }
}

fn unreadable(e: impl std::fmt::Display) -> TexmatError {
    TexmatError::ArchiveUnreadable(e.to_string())
}

/// Unpacks an archive into a fresh [`ScratchDir`]
pub trait Extractor {
    fn extract(&self, archive: &Path) -> Result<ScratchDir>;
}

/// Reads zip archives in process
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipExtractor;

impl Extractor for ZipExtractor {
    fn extract(&self, archive: &Path) -> Result<ScratchDir> {
        let scratch = ScratchDir::new()?;
        let file = File::open(archive).map_err(unreadable)?;
        let mut zip = ZipArchive::new(file).map_err(unreadable)?;

        for i in 0..zip.len() {
            let mut entry = zip.by_index(i).map_err(unreadable)?;
            // Reject absolute paths and `..` components
            let Some(relative) = entry.enclosed_name() else {
                return Err(TexmatError::ArchiveUnreadable(format!(
                    "entry '{}' escapes the extraction directory",
                    entry.name()
                )));
            };
            let target = scratch.path().join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&target).map_err(unreadable)?;
                continue;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(unreadable)?;
            }
            let mut out = File::create(&target).map_err(unreadable)?;
            io::copy(&mut entry, &mut out).map_err(unreadable)?;
        }

        tracing::debug!(archive = %archive.display(), entries = zip.len(), "zip extracted");
        scratch.scan()
    }
}

/// Runs the external `unar` tool, which understands most archive formats
#[derive(Debug, Clone)]
pub struct UnarExtractor {
    program: String,
}

impl Default for UnarExtractor {
    fn default() -> Self {
        Self {
            program: "unar".to_string(),
        }
    }
}

impl UnarExtractor {
    /// Use a different executable in place of `unar`
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Extractor for UnarExtractor {
    fn extract(&self, archive: &Path) -> Result<ScratchDir> {
        let scratch = ScratchDir::new()?;
        let archive = fs::canonicalize(archive).map_err(unreadable)?;

        // `-q -D` must stay separate arguments
        let mut cmd = Command::new(&self.program);
        cmd.arg("-q")
            .arg("-D")
            .arg(&archive)
            .current_dir(scratch.path())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::debug!(program = %self.program, archive = %archive.display(), "running extractor");
        let output = cmd
            .output()
            .map_err(|e| TexmatError::ArchiveUnreadable(format!("{}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = match stderr.trim() {
                "" => format!("{} exited with {}", self.program, output.status),
                text => text.to_string(),
            };
            return Err(TexmatError::ArchiveUnreadable(message));
        }
        scratch.scan()
    }
}

/// Zip archives in process, anything else through `unar`
#[derive(Debug, Default, Clone)]
pub struct AutoExtractor {
    pub unar: UnarExtractor,
}

impl AutoExtractor {
    fn is_zip(archive: &Path) -> bool {
        archive
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("zip"))
    }
}

impl Extractor for AutoExtractor {
    fn extract(&self, archive: &Path) -> Result<ScratchDir> {
        if Self::is_zip(archive) {
            ZipExtractor.extract(archive)
        } else {
            self.unar.extract(archive)
        }
    }
}
