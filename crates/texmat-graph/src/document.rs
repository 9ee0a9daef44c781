//! In-memory host document
//!
//! `HostDocument` plays the part of the host scene: it owns materials,
//! images and textures, renames on name clashes the way a host would, and
//! can pack image files into a directory so they outlive the scratch
//! directory they were extracted to.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use texmat_core::{Result, TexmatError};

use crate::graph::{
    ColourSpace, DisplacementMethod, ImageResource, Location, NodeKind, StandaloneTexture,
};
use crate::naming::unique_name;
use crate::sink::GraphSink;

#[derive(Debug, Clone, Serialize)]
pub struct HostImage {
    pub name: String,
    pub path: PathBuf,
    pub colour_space: ColourSpace,
    /// Whether `path` points at a packed copy
    pub packed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HostTexture {
    pub name: String,
    pub image: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HostNode {
    #[serde(flatten)]
    pub kind: NodeKind,
    pub label: Option<String>,
    pub location: Location,
}

#[derive(Debug, Clone, Serialize)]
pub struct HostLink {
    pub from: usize,
    pub output: String,
    pub to: usize,
    pub input: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HostMaterial {
    pub name: String,
    pub nodes: Vec<HostNode>,
    pub links: Vec<HostLink>,
    pub displacement_method: Option<DisplacementMethod>,
}

#[derive(Debug)]
struct Staged {
    material: HostMaterial,
    images: Vec<HostImage>,
    textures: Vec<HostTexture>,
    /// Requested image name -> name actually given
    image_names: HashMap<String, String>,
}

#[derive(Debug, Default, Serialize)]
pub struct HostDocument {
    pub materials: BTreeMap<String, HostMaterial>,
    pub images: BTreeMap<String, HostImage>,
    pub textures: BTreeMap<String, HostTexture>,
    #[serde(skip)]
    pack_dir: Option<PathBuf>,
    #[serde(skip)]
    staged: Option<Staged>,
    #[serde(skip)]
    last_material: Option<String>,
}

impl HostDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy every registered image into `dir` when a material is finished
    pub fn with_pack_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            pack_dir: Some(dir.into()),
            ..Self::default()
        }
    }

    pub fn material(&self, name: &str) -> Option<&HostMaterial> {
        self.materials.get(name)
    }

    /// Name given to the most recently finished material
    pub fn last_material(&self) -> Option<&str> {
        self.last_material.as_deref()
    }

    fn staged(&mut self) -> Result<&mut Staged> {
        self.staged
            .as_mut()
            .ok_or_else(|| TexmatError::SinkError("no material in progress".to_string()))
    }

    /// Copy each image into `dir` under a file name no earlier run has
    /// used. On failure only the files created here are removed.
    fn pack(dir: &Path, images: &mut [HostImage]) -> Result<()> {
        fs::create_dir_all(dir)?;
        let mut written: Vec<PathBuf> = Vec::new();
        for image in images.iter_mut() {
            match Self::pack_one(dir, image) {
                Ok(target) => {
                    written.push(target.clone());
                    image.path = target;
                    image.packed = true;
                }
                Err(e) => {
                    for path in &written {
                        fs::remove_file(path).ok();
                    }
                    return Err(TexmatError::SinkError(format!(
                        "failed to pack image {}: {}",
                        image.path.display(),
                        e
                    )));
                }
            }
        }
        Ok(())
    }

    fn pack_one(dir: &Path, image: &HostImage) -> io::Result<PathBuf> {
        let extension = image.path.extension().and_then(|e| e.to_str());
        let file_name = |stem: &str| match extension {
            Some(ext) => format!("{}.{}", stem, ext),
            None => stem.to_string(),
        };

        let mut source = File::open(&image.path)?;
        let stem = unique_name(&image.name, |n| dir.join(file_name(n)).exists());
        let target = dir.join(file_name(&stem));
        // Never replace a file, even one that appeared since the name check
        let mut out = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)?;
        if let Err(e) = io::copy(&mut source, &mut out) {
            drop(out);
            fs::remove_file(&target).ok();
            return Err(e);
        }
        Ok(target)
    }
}

impl GraphSink for HostDocument {
    type Node = usize;

    fn begin_material(&mut self, name: &str) -> Result<()> {
        if self.staged.is_some() {
            return Err(TexmatError::SinkError(
                "a material is already in progress".to_string(),
            ));
        }
        let name = unique_name(name, |n| self.materials.contains_key(n));
        self.staged = Some(Staged {
            material: HostMaterial {
                name,
                nodes: Vec::new(),
                links: Vec::new(),
                displacement_method: None,
            },
            images: Vec::new(),
            textures: Vec::new(),
            image_names: HashMap::new(),
        });
        Ok(())
    }

    fn register_image(&mut self, image: &ImageResource) -> Result<()> {
        let existing: Vec<String> = self.images.keys().cloned().collect();
        let staged = self.staged()?;
        let name = unique_name(&image.name, |n| {
            existing.iter().any(|e| e == n) || staged.images.iter().any(|i| i.name == n)
        });
        staged.image_names.insert(image.name.clone(), name.clone());
        staged.images.push(HostImage {
            name,
            path: image.path.clone(),
            colour_space: image.colour_space,
            packed: false,
        });
        Ok(())
    }

    fn create_node(
        &mut self,
        kind: &NodeKind,
        label: Option<&str>,
        location: Location,
    ) -> Result<usize> {
        let staged = self.staged()?;
        let kind = match kind {
            NodeKind::ImageTexture { image } => {
                let image = staged.image_names.get(image).cloned().ok_or_else(|| {
                    TexmatError::SinkError(format!("image '{}' was not registered", image))
                })?;
                NodeKind::ImageTexture { image }
            }
            other => other.clone(),
        };
        staged.material.nodes.push(HostNode {
            kind,
            label: label.map(String::from),
            location,
        });
        Ok(staged.material.nodes.len() - 1)
    }

    fn connect(&mut self, from: usize, output: &str, to: usize, input: &str) -> Result<()> {
        let staged = self.staged()?;
        let count = staged.material.nodes.len();
        if from >= count || to >= count {
            return Err(TexmatError::SinkError(format!(
                "link {} -> {} refers to a missing node",
                from, to
            )));
        }
        staged.material.links.push(HostLink {
            from,
            output: output.to_string(),
            to,
            input: input.to_string(),
        });
        Ok(())
    }

    fn register_texture(&mut self, texture: &StandaloneTexture) -> Result<()> {
        let existing: Vec<String> = self.textures.keys().cloned().collect();
        let staged = self.staged()?;
        let image = staged
            .image_names
            .get(&texture.image)
            .cloned()
            .ok_or_else(|| {
                TexmatError::SinkError(format!("image '{}' was not registered", texture.image))
            })?;
        let name = unique_name(&texture.name, |n| {
            existing.iter().any(|e| e == n) || staged.textures.iter().any(|t| t.name == n)
        });
        staged.textures.push(HostTexture { name, image });
        Ok(())
    }

    fn set_displacement_method(&mut self, method: DisplacementMethod) -> Result<()> {
        self.staged()?.material.displacement_method = Some(method);
        Ok(())
    }

    fn finish_material(&mut self) -> Result<()> {
        let mut staged = self
            .staged
            .take()
            .ok_or_else(|| TexmatError::SinkError("no material in progress".to_string()))?;
        if let Some(dir) = &self.pack_dir {
            Self::pack(dir, &mut staged.images)?;
        }
        for image in staged.images {
            self.images.insert(image.name.clone(), image);
        }
        for texture in staged.textures {
            self.textures.insert(texture.name.clone(), texture);
        }
        let name = staged.material.name.clone();
        tracing::debug!(material = %name, nodes = staged.material.nodes.len(), "material committed");
        self.materials.insert(name.clone(), staged.material);
        self.last_material = Some(name);
        Ok(())
    }

    fn abort_material(&mut self) {
        if let Some(staged) = self.staged.take() {
            tracing::debug!(material = %staged.material.name, "material discarded");
        }
    }
}
