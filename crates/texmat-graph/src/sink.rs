//! The host side of graph application

use texmat_core::Result;

use crate::graph::{DisplacementMethod, ImageResource, Location, NodeKind, StandaloneTexture};

/// Anything that can receive a material: a live scene document, a file
/// writer, a test recorder.
///
/// Calls always arrive in the order `begin_material`, images, nodes, links,
/// standalone textures, displacement method, then `finish_material`, or
/// `abort_material` if anything failed in between.
pub trait GraphSink {
    /// Host handle for a created node
    type Node: Copy;

    fn begin_material(&mut self, name: &str) -> Result<()>;

    fn register_image(&mut self, image: &ImageResource) -> Result<()>;

    fn create_node(
        &mut self,
        kind: &NodeKind,
        label: Option<&str>,
        location: Location,
    ) -> Result<Self::Node>;

    fn connect(&mut self, from: Self::Node, output: &str, to: Self::Node, input: &str)
        -> Result<()>;

    fn register_texture(&mut self, texture: &StandaloneTexture) -> Result<()>;

    fn set_displacement_method(&mut self, method: DisplacementMethod) -> Result<()>;

    /// Make the staged material visible
    fn finish_material(&mut self) -> Result<()>;

    /// Drop everything staged since `begin_material`
    fn abort_material(&mut self);
}
