//! Texmat Graph - Shader node graph synthesis
//!
//! This crate turns a [`texmat_resolve::Resolution`] into an immutable
//! [`NodeGraph`] describing a principled material, then submits it in one
//! pass to any [`GraphSink`]. Reusable subgraphs are shared through a
//! [`NodeGroupLibrary`].

mod document;
mod graph;
mod group;
mod library;
mod naming;
mod sink;
mod synth;

pub use document::{HostDocument, HostImage, HostLink, HostMaterial, HostNode, HostTexture};
pub use graph::{
    ColourSpace, DisplacementMethod, ImageResource, Link, Location, Node, NodeGraph, NodeId,
    NodeKind, StandaloneTexture,
};
pub use group::{
    normal_rotation_group, GroupLink, GroupNode, GroupNodeKind, GroupSocket, NodeGroupDef,
    SocketType, VectorOp, NORMAL_ROTATION_GROUP,
};
pub use library::{GroupHandle, NodeGroupLibrary};
pub use naming::unique_name;
pub use sink::GraphSink;
pub use synth::synthesize;
