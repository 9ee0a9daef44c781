//! Reusable node group definitions
//!
//! A node group is a small named subgraph that materials reference instead
//! of duplicating. The only group texmat builds is the normal rotation
//! group, which turns a tangent-space normal sampled from a texture into a
//! normal aligned with the true surface:
//!
//! ```text
//! result = (g × n) × g_geom + (g · n) · g_geom
//! ```
//!
//! where `g` is unit Z, `n` is the group input and `g_geom` is the geometric
//! normal supplied by the shading environment.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use texmat_core::{ContentHash, Fingerprinter, Result, TexmatError, Vec3};

use crate::graph::Location;

/// Name the normal rotation group is created under (renamed by the library
/// if something else already has it)
pub const NORMAL_ROTATION_GROUP: &str = "NormalRotation";

/// Value type carried by a socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocketType {
    Vector,
    Float,
    Color,
}

impl SocketType {
    fn id(self) -> &'static str {
        match self {
            SocketType::Vector => "vector",
            SocketType::Float => "float",
            SocketType::Color => "color",
        }
    }
}

/// One entry of a group's interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSocket {
    pub name: String,
    #[serde(rename = "type")]
    pub socket_type: SocketType,
}

impl GroupSocket {
    pub fn new(name: &str, socket_type: SocketType) -> Self {
        Self {
            name: name.to_string(),
            socket_type,
        }
    }
}

/// Vector math operations available inside groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorOp {
    Cross,
    Dot,
    Scale,
    Add,
}

/// Node kinds that can appear inside a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GroupNodeKind {
    /// Exposes the group's inputs as outputs
    GroupInput,
    /// Collects the group's outputs as inputs
    GroupOutput,
    /// A constant vector
    Constant { value: [f32; 3] },
    /// The shading environment's geometric normal
    Geometry,
    VectorMath { op: VectorOp },
}

impl GroupNodeKind {
    fn fingerprint_into(&self, fp: &mut Fingerprinter) {
        match self {
            GroupNodeKind::GroupInput => {
                fp.field("group_input");
            }
            GroupNodeKind::GroupOutput => {
                fp.field("group_output");
            }
            GroupNodeKind::Constant { value } => {
                fp.field("constant");
                for c in value {
                    fp.number(u64::from(c.to_bits()));
                }
            }
            GroupNodeKind::Geometry => {
                fp.field("geometry");
            }
            GroupNodeKind::VectorMath { op } => {
                fp.field("vector_math").field(match op {
                    VectorOp::Cross => "cross",
                    VectorOp::Dot => "dot",
                    VectorOp::Scale => "scale",
                    VectorOp::Add => "add",
                });
            }
        }
    }
}

/// A node inside a group, addressed by its unique name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupNode {
    pub name: String,
    #[serde(flatten)]
    pub kind: GroupNodeKind,
    pub location: Location,
}

/// A link between two sockets inside a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupLink {
    pub from: String,
    pub output: String,
    pub to: String,
    pub input: String,
}

/// A reusable subgraph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGroupDef {
    pub name: String,
    pub inputs: Vec<GroupSocket>,
    pub outputs: Vec<GroupSocket>,
    pub nodes: Vec<GroupNode>,
    pub links: Vec<GroupLink>,
}

/// Value flowing through a group during evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
enum Value {
    Vector(Vec3),
    Scalar(f32),
}

impl Value {
    fn vector(self) -> Vec3 {
        match self {
            Value::Vector(v) => v,
            Value::Scalar(s) => Vec3::new(s, s, s),
        }
    }

    fn scalar(self) -> f32 {
        match self {
            Value::Vector(v) => (v.x + v.y + v.z) / 3.0,
            Value::Scalar(s) => s,
        }
    }
}

impl NodeGroupDef {
    /// Fingerprint of the group's shape: interface, nodes and links. The
    /// group's own name and node locations are left out.
    pub fn fingerprint(&self) -> ContentHash {
        let mut fp = Fingerprinter::new();
        fp.field("inputs").number(self.inputs.len() as u64);
        for socket in &self.inputs {
            fp.field(&socket.name).field(socket.socket_type.id());
        }
        fp.field("outputs").number(self.outputs.len() as u64);
        for socket in &self.outputs {
            fp.field(&socket.name).field(socket.socket_type.id());
        }
        fp.field("nodes").number(self.nodes.len() as u64);
        for node in &self.nodes {
            fp.field(&node.name);
            node.kind.fingerprint_into(&mut fp);
        }
        fp.field("links").number(self.links.len() as u64);
        for link in &self.links {
            fp.field(&link.from)
                .field(&link.output)
                .field(&link.to)
                .field(&link.input);
        }
        fp.finish()
    }

    /// Check that this definition still has the shape of `expected`.
    ///
    /// Fails with `MalformedGroupDefinition` when the interface arity or
    /// socket types differ, or when the inner structure was edited.
    pub fn validate_against(&self, expected: &NodeGroupDef) -> Result<()> {
        check_interface("input", &self.inputs, &expected.inputs)?;
        check_interface("output", &self.outputs, &expected.outputs)?;
        if self.fingerprint() != expected.fingerprint() {
            return Err(TexmatError::MalformedGroupDefinition(format!(
                "group '{}' has been modified",
                self.name
            )));
        }
        Ok(())
    }

    fn node(&self, name: &str) -> Result<&GroupNode> {
        self.nodes.iter().find(|n| n.name == name).ok_or_else(|| {
            TexmatError::MalformedGroupDefinition(format!(
                "group '{}' has no node '{}'",
                self.name, name
            ))
        })
    }

    fn source_of(&self, node: &str, input: &str) -> Result<&GroupLink> {
        self.links
            .iter()
            .find(|l| l.to == node && l.input == input)
            .ok_or_else(|| {
                TexmatError::MalformedGroupDefinition(format!(
                    "input '{}' of node '{}' is not connected",
                    input, node
                ))
            })
    }

    /// Evaluate the group's first output for one shading point.
    ///
    /// `inputs` binds the group inputs by name and `geometry_normal` is what
    /// Geometry nodes read.
    pub fn evaluate(&self, inputs: &HashMap<String, Vec3>, geometry_normal: Vec3) -> Result<Vec3> {
        let output_socket = self.outputs.first().ok_or_else(|| {
            TexmatError::MalformedGroupDefinition(format!("group '{}' has no outputs", self.name))
        })?;
        let sink = self
            .nodes
            .iter()
            .find(|n| n.kind == GroupNodeKind::GroupOutput)
            .ok_or_else(|| {
                TexmatError::MalformedGroupDefinition(format!(
                    "group '{}' has no output node",
                    self.name
                ))
            })?;
        let link = self.source_of(&sink.name, &output_socket.name)?;
        let mut cache = HashMap::new();
        let value = self.eval_socket(
            &link.from,
            &link.output,
            inputs,
            geometry_normal,
            &mut cache,
            0,
        )?;
        Ok(value.vector())
    }

    fn eval_input(
        &self,
        node: &str,
        input: &str,
        inputs: &HashMap<String, Vec3>,
        geometry_normal: Vec3,
        cache: &mut HashMap<(String, String), Value>,
        depth: usize,
    ) -> Result<Value> {
        let link = self.source_of(node, input)?;
        self.eval_socket(&link.from, &link.output, inputs, geometry_normal, cache, depth + 1)
    }

    fn eval_socket(
        &self,
        node_name: &str,
        output: &str,
        inputs: &HashMap<String, Vec3>,
        geometry_normal: Vec3,
        cache: &mut HashMap<(String, String), Value>,
        depth: usize,
    ) -> Result<Value> {
        if depth > self.nodes.len() {
            return Err(TexmatError::MalformedGroupDefinition(format!(
                "group '{}' contains a cycle",
                self.name
            )));
        }
        let key = (node_name.to_string(), output.to_string());
        if let Some(v) = cache.get(&key) {
            return Ok(*v);
        }

        let node = self.node(node_name)?;
        let value = match &node.kind {
            GroupNodeKind::GroupInput => {
                let v = inputs.get(output).ok_or_else(|| {
                    TexmatError::MalformedGroupDefinition(format!(
                        "no value bound for group input '{}'",
                        output
                    ))
                })?;
                Value::Vector(*v)
            }
            GroupNodeKind::GroupOutput => {
                return Err(TexmatError::MalformedGroupDefinition(
                    "group output node has no outputs".to_string(),
                ))
            }
            GroupNodeKind::Constant { value } => Value::Vector(Vec3::from_array(*value)),
            GroupNodeKind::Geometry => Value::Vector(geometry_normal),
            GroupNodeKind::VectorMath { op } => {
                let mut arg = |socket: &str| {
                    self.eval_input(node_name, socket, inputs, geometry_normal, cache, depth)
                };
                match op {
                    VectorOp::Cross => {
                        let a = arg("A")?.vector();
                        let b = arg("B")?.vector();
                        Value::Vector(a.cross(&b))
                    }
                    VectorOp::Dot => {
                        let a = arg("A")?.vector();
                        let b = arg("B")?.vector();
                        Value::Scalar(a.dot(&b))
                    }
                    VectorOp::Scale => {
                        let v = arg("Vector")?.vector();
                        let s = arg("Scale")?.scalar();
                        Value::Vector(v * s)
                    }
                    VectorOp::Add => {
                        let a = arg("A")?.vector();
                        let b = arg("B")?.vector();
                        Value::Vector(a + b)
                    }
                }
            }
        };
        cache.insert(key, value);
        Ok(value)
    }
}

fn check_interface(what: &str, actual: &[GroupSocket], expected: &[GroupSocket]) -> Result<()> {
    if actual.len() != expected.len() {
        return Err(TexmatError::MalformedGroupDefinition(format!(
            "expected {} {} socket(s), found {}",
            expected.len(),
            what,
            actual.len()
        )));
    }
    for (a, e) in actual.iter().zip(expected) {
        if a.socket_type != e.socket_type {
            return Err(TexmatError::MalformedGroupDefinition(format!(
                "{} '{}' should be {:?}, found {:?}",
                what, a.name, e.socket_type, a.socket_type
            )));
        }
    }
    Ok(())
}

fn link(from: &str, output: &str, to: &str, input: &str) -> GroupLink {
    GroupLink {
        from: from.to_string(),
        output: output.to_string(),
        to: to.to_string(),
        input: input.to_string(),
    }
}

fn node(name: &str, kind: GroupNodeKind, x: f32, y: f32) -> GroupNode {
    GroupNode {
        name: name.to_string(),
        kind,
        location: Location::new(x, y),
    }
}

/// The intended shape of the normal rotation group
pub fn normal_rotation_group() -> NodeGroupDef {
    let math = |op| GroupNodeKind::VectorMath { op };
    NodeGroupDef {
        name: NORMAL_ROTATION_GROUP.to_string(),
        inputs: vec![GroupSocket::new("Normal", SocketType::Vector)],
        outputs: vec![GroupSocket::new("Normal", SocketType::Vector)],
        nodes: vec![
            node("Group Input", GroupNodeKind::GroupInput, -600.0, 0.0),
            node(
                "Up",
                GroupNodeKind::Constant {
                    value: Vec3::Z.to_array(),
                },
                -600.0,
                200.0,
            ),
            node("Geometry", GroupNodeKind::Geometry, -600.0, -200.0),
            node("Cross Input", math(VectorOp::Cross), -300.0, 150.0),
            node("Dot", math(VectorOp::Dot), -300.0, -50.0),
            node("Cross Geometry", math(VectorOp::Cross), 0.0, 150.0),
            node("Scale", math(VectorOp::Scale), 0.0, -100.0),
            node("Add", math(VectorOp::Add), 300.0, 0.0),
            node("Group Output", GroupNodeKind::GroupOutput, 600.0, 0.0),
        ],
        links: vec![
            // g × n
            link("Up", "Vector", "Cross Input", "A"),
            link("Group Input", "Normal", "Cross Input", "B"),
            // (g × n) × g_geom
            link("Cross Input", "Vector", "Cross Geometry", "A"),
            link("Geometry", "Normal", "Cross Geometry", "B"),
            // g · n
            link("Up", "Vector", "Dot", "A"),
            link("Group Input", "Normal", "Dot", "B"),
            // (g · n) · g_geom
            link("Geometry", "Normal", "Scale", "Vector"),
            link("Dot", "Value", "Scale", "Scale"),
            link("Cross Geometry", "Vector", "Add", "A"),
            link("Scale", "Vector", "Add", "B"),
            link("Add", "Vector", "Group Output", "Normal"),
        ],
    }
}
