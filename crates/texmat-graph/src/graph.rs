//! The material node graph value

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use texmat_core::{ContentHash, Result, TexmatError};

use crate::sink::GraphSink;

/// Index of a node within one [`NodeGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

/// 2-D editor placement. Cosmetic only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f32,
    pub y: f32,
}

impl Location {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Node kinds a material graph is built from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    TexCoord,
    Mapping,
    Reroute,
    ImageTexture {
        image: String,
    },
    /// Height to normal conversion, provided by the host renderer
    BumpToNormal,
    /// An instance of a node group from the library
    GroupReference {
        group: String,
        fingerprint: ContentHash,
        inputs: Vec<String>,
        outputs: Vec<String>,
    },
    PrincipledShader,
    MaterialOutput,
}

impl NodeKind {
    pub fn inputs(&self) -> Vec<&str> {
        match self {
            NodeKind::TexCoord => vec![],
            NodeKind::Mapping => vec!["Vector"],
            NodeKind::Reroute => vec!["Input"],
            NodeKind::ImageTexture { .. } => vec!["Vector"],
            NodeKind::BumpToNormal => vec!["Height"],
            NodeKind::GroupReference { inputs, .. } => inputs.iter().map(String::as_str).collect(),
            NodeKind::PrincipledShader => vec!["Base Color", "Specular", "Roughness", "Normal"],
            NodeKind::MaterialOutput => vec!["Surface", "Displacement"],
        }
    }

    pub fn outputs(&self) -> Vec<&str> {
        match self {
            NodeKind::TexCoord => vec!["UV"],
            NodeKind::Mapping => vec!["Vector"],
            NodeKind::Reroute => vec!["Output"],
            NodeKind::ImageTexture { .. } => vec!["Color"],
            NodeKind::BumpToNormal => vec!["Normal"],
            NodeKind::GroupReference { outputs, .. } => {
                outputs.iter().map(String::as_str).collect()
            }
            NodeKind::PrincipledShader => vec!["BSDF"],
            NodeKind::MaterialOutput => vec![],
        }
    }

    /// Short type name for logs and summaries
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::TexCoord => "tex_coord",
            NodeKind::Mapping => "mapping",
            NodeKind::Reroute => "reroute",
            NodeKind::ImageTexture { .. } => "image_texture",
            NodeKind::BumpToNormal => "bump_to_normal",
            NodeKind::GroupReference { .. } => "group_reference",
            NodeKind::PrincipledShader => "principled_shader",
            NodeKind::MaterialOutput => "material_output",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default)]
    pub label: Option<String>,
    pub location: Location,
}

/// A directed edge from an output socket to an input socket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub from: NodeId,
    pub output: String,
    pub to: NodeId,
    pub input: String,
}

/// How the host should interpret image pixel values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColourSpace {
    #[serde(rename = "sRGB")]
    Srgb,
    #[serde(rename = "Non-Color")]
    NonColor,
}

/// An image the host must load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResource {
    pub name: String,
    pub path: PathBuf,
    pub colour_space: ColourSpace,
}

/// A texture resource outside the node graph, for use by a displacement
/// modifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandaloneTexture {
    pub name: String,
    pub image: String,
}

/// Material-level displacement setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplacementMethod {
    Bump,
    Displacement,
    /// Bump mapping plus true displacement
    Both,
}

/// A complete description of one material, built before anything touches
/// the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGraph {
    pub material_name: String,
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    pub images: Vec<ImageResource>,
    pub textures: Vec<StandaloneTexture>,
    pub displacement_method: Option<DisplacementMethod>,
}

impl NodeGraph {
    pub fn new(material_name: impl Into<String>) -> Self {
        Self {
            material_name: material_name.into(),
            nodes: Vec::new(),
            links: Vec::new(),
            images: Vec::new(),
            textures: Vec::new(),
            displacement_method: None,
        }
    }

    pub fn add_node(&mut self, kind: NodeKind, label: Option<String>, location: Location) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id,
            kind,
            label,
            location,
        });
        id
    }

    pub fn link(&mut self, from: NodeId, output: &str, to: NodeId, input: &str) {
        self.links.push(Link {
            from,
            output: output.to_string(),
            to,
            input: input.to_string(),
        });
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Nodes matching a predicate on their kind
    pub fn nodes_where(&self, pred: impl Fn(&NodeKind) -> bool) -> Vec<&Node> {
        self.nodes.iter().filter(|n| pred(&n.kind)).collect()
    }

    /// First node of the given type name
    pub fn find(&self, type_name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.kind.type_name() == type_name)
    }

    /// Links arriving at one input socket
    pub fn links_into(&self, node: NodeId, input: &str) -> Vec<&Link> {
        self.links
            .iter()
            .filter(|l| l.to == node && l.input == input)
            .collect()
    }

    /// Check that every link joins existing sockets, that no input socket
    /// has more than one incoming link and that every image node refers to
    /// a registered image.
    pub fn check(&self) -> Result<()> {
        let mut used_inputs = HashSet::new();
        for link in &self.links {
            let from = self.node(link.from).ok_or_else(|| {
                TexmatError::SinkError(format!("link from missing node {}", link.from.0))
            })?;
            let to = self.node(link.to).ok_or_else(|| {
                TexmatError::SinkError(format!("link to missing node {}", link.to.0))
            })?;
            if !from.kind.outputs().contains(&link.output.as_str()) {
                return Err(TexmatError::SinkError(format!(
                    "{} has no output '{}'",
                    from.kind.type_name(),
                    link.output
                )));
            }
            if !to.kind.inputs().contains(&link.input.as_str()) {
                return Err(TexmatError::SinkError(format!(
                    "{} has no input '{}'",
                    to.kind.type_name(),
                    link.input
                )));
            }
            if !used_inputs.insert((link.to, link.input.as_str())) {
                return Err(TexmatError::SinkError(format!(
                    "input '{}' of {} linked twice",
                    link.input,
                    to.kind.type_name()
                )));
            }
        }
        for node in &self.nodes {
            if let NodeKind::ImageTexture { image } = &node.kind {
                if !self.images.iter().any(|i| &i.name == image) {
                    return Err(TexmatError::SinkError(format!(
                        "image texture refers to unknown image '{}'",
                        image
                    )));
                }
            }
        }
        for texture in &self.textures {
            if !self.images.iter().any(|i| i.name == texture.image) {
                return Err(TexmatError::SinkError(format!(
                    "texture '{}' refers to unknown image '{}'",
                    texture.name, texture.image
                )));
            }
        }
        Ok(())
    }

    /// Submit the whole graph to a sink in one pass.
    ///
    /// On any failure the sink is told to discard the material, so no half
    /// built material is left behind.
    pub fn apply<S: GraphSink>(&self, sink: &mut S) -> Result<()> {
        self.check()?;
        sink.begin_material(&self.material_name)?;
        match self.submit(sink) {
            Ok(()) => sink.finish_material(),
            Err(e) => {
                sink.abort_material();
                Err(e)
            }
        }
    }

    fn submit<S: GraphSink>(&self, sink: &mut S) -> Result<()> {
        for image in &self.images {
            sink.register_image(image)?;
        }
        let mut handles = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            handles.push(sink.create_node(&node.kind, node.label.as_deref(), node.location)?);
        }
        for link in &self.links {
            sink.connect(
                handles[link.from.0],
                &link.output,
                handles[link.to.0],
                &link.input,
            )?;
        }
        for texture in &self.textures {
            sink.register_texture(texture)?;
        }
        if let Some(method) = self.displacement_method {
            sink.set_displacement_method(method)?;
        }
        Ok(())
    }
}
