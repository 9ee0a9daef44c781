//! Material graph synthesis

use texmat_resolve::{
    DisplacementUsage, MapKind, MaterialSpec, Resolution, ResolvedComponent, ShaderTarget,
};

use crate::graph::{
    ColourSpace, DisplacementMethod, ImageResource, Location, NodeGraph, NodeId, NodeKind,
    StandaloneTexture,
};
use crate::group::normal_rotation_group;
use crate::library::NodeGroupLibrary;

/// Order of the principled shader's inputs. Wiring textures in this order
/// keeps the links from crossing.
const WIRING_ORDER: [MapKind; 5] = [
    MapKind::Diffuse,
    MapKind::Specular,
    MapKind::Roughness,
    MapKind::Normal,
    MapKind::Bump,
];

const TEXTURE_START: Location = Location::new(-100.0, 200.0);
const TEXTURE_STEP: f32 = -300.0;
const CONVERTER_OFFSET: f32 = 300.0;

/// Texture nodes stacked top to bottom, all sampling through the fanout
struct TextureColumn {
    fanout: NodeId,
    next: Location,
}

impl TextureColumn {
    fn add(
        &mut self,
        graph: &mut NodeGraph,
        component: &ResolvedComponent,
        material_name: &str,
    ) -> (NodeId, Location) {
        let image = register_image(graph, component, material_name);
        let location = self.next;
        let node = graph.add_node(
            NodeKind::ImageTexture {
                image: image.clone(),
            },
            Some(image),
            location,
        );
        graph.link(self.fanout, "Output", node, "Vector");
        self.next = location.offset(0.0, TEXTURE_STEP);
        (node, location)
    }
}

fn register_image(graph: &mut NodeGraph, component: &ResolvedComponent, material_name: &str) -> String {
    let name = format!("{}_{}", material_name, component.token);
    let colour_space = if component.kind.is_colour() {
        ColourSpace::Srgb
    } else {
        ColourSpace::NonColor
    };
    graph.images.push(ImageResource {
        name: name.clone(),
        path: component.source_path.clone(),
        colour_space,
    });
    name
}

/// Build the node graph for one resolved archive.
///
/// The only side effect is on `library`, which gains the normal rotation
/// group the first time a normal map is wired.
pub fn synthesize(
    resolution: &Resolution,
    spec: &MaterialSpec,
    material_name: &str,
    library: &NodeGroupLibrary,
) -> NodeGraph {
    let mut graph = NodeGraph::new(material_name);

    let tex_coords = graph.add_node(NodeKind::TexCoord, None, Location::new(-600.0, 0.0));
    let mapping = graph.add_node(NodeKind::Mapping, None, Location::new(-400.0, 0.0));
    graph.link(tex_coords, "UV", mapping, "Vector");
    // One place to change the coordinate source for every texture
    let fanout = graph.add_node(
        NodeKind::Reroute,
        Some("fanout".to_string()),
        Location::new(-200.0, -150.0),
    );
    graph.link(mapping, "Vector", fanout, "Input");

    let shader = graph.add_node(NodeKind::PrincipledShader, None, Location::new(500.0, 0.0));
    let output = graph.add_node(NodeKind::MaterialOutput, None, Location::new(850.0, 0.0));
    graph.link(shader, "BSDF", output, "Surface");

    let mut column = TextureColumn {
        fanout,
        next: TEXTURE_START,
    };

    for kind in WIRING_ORDER {
        if kind.is_relief() && resolution.relief != Some(kind) {
            continue;
        }
        let Some(component) = resolution.get(kind) else {
            continue;
        };

        let (texture, location) = column.add(&mut graph, component, material_name);
        let converter_at = location.offset(CONVERTER_OFFSET, 0.0);

        let (source, socket, input) = match kind.target() {
            ShaderTarget::Direct(input) => (texture, "Color".to_string(), input),
            ShaderTarget::ViaBumpConversion(input) => {
                let bump = graph.add_node(NodeKind::BumpToNormal, None, converter_at);
                graph.link(texture, "Color", bump, "Height");
                (bump, "Normal".to_string(), input)
            }
            ShaderTarget::ViaNormalRotation(input) => {
                let template = normal_rotation_group();
                let handle = library.find_or_create(&template);
                let group_input = template.inputs[0].name.clone();
                let group_output = template.outputs[0].name.clone();
                let rotate = graph.add_node(
                    NodeKind::GroupReference {
                        group: handle.name.clone(),
                        fingerprint: handle.fingerprint,
                        inputs: template.inputs.iter().map(|s| s.name.clone()).collect(),
                        outputs: template.outputs.iter().map(|s| s.name.clone()).collect(),
                    },
                    Some(handle.name),
                    converter_at,
                );
                graph.link(texture, "Color", rotate, &group_input);
                (rotate, group_output, input)
            }
            ShaderTarget::Displacement => continue,
        };
        graph.link(source, &socket, shader, input.socket());
        tracing::trace!(kind = %kind, input = input.socket(), "wired texture");
    }

    if let Some(component) = resolution.get(MapKind::Displacement) {
        match spec.displacement {
            DisplacementUsage::AsHeightInput => {
                let (texture, _) = column.add(&mut graph, component, material_name);
                graph.link(texture, "Color", output, "Displacement");
                graph.displacement_method = Some(DisplacementMethod::Both);
            }
            DisplacementUsage::AsStandaloneTexture => {
                let image = register_image(&mut graph, component, material_name);
                graph.textures.push(StandaloneTexture {
                    name: image.clone(),
                    image,
                });
            }
            DisplacementUsage::None => {}
        }
    }

    tracing::debug!(
        material = material_name,
        nodes = graph.nodes.len(),
        links = graph.links.len(),
        "synthesized material graph"
    );
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::HostDocument;
    use crate::group::NORMAL_ROTATION_GROUP;
    use std::path::{Path, PathBuf};
    use texmat_resolve::resolve;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| Path::new("/scratch").join(n)).collect()
    }

    fn build(names: &[&str], spec: &MaterialSpec, library: &NodeGroupLibrary) -> NodeGraph {
        let resolution = resolve(&paths(names), spec).unwrap();
        synthesize(&resolution, spec, "rock", library)
    }

    fn shader(graph: &NodeGraph) -> NodeId {
        graph.find("principled_shader").unwrap().id
    }

    fn material_output(graph: &NodeGraph) -> NodeId {
        graph.find("material_output").unwrap().id
    }

    fn image_textures(graph: &NodeGraph) -> usize {
        graph
            .nodes_where(|k| matches!(k, NodeKind::ImageTexture { .. }))
            .len()
    }

    /// Node feeding a socket, if any
    fn source_kind<'a>(graph: &'a NodeGraph, node: NodeId, input: &str) -> Option<&'a NodeKind> {
        let links = graph.links_into(node, input);
        assert!(links.len() <= 1);
        links.first().and_then(|l| graph.node(l.from)).map(|n| &n.kind)
    }

    #[test]
    fn test_rock_scenario() {
        let spec = MaterialSpec {
            specular: false,
            ..Default::default()
        };
        let library = NodeGroupLibrary::new();
        let graph = build(
            &["rock_diff_2k.jpg", "rock_nor_2k.jpg", "rock_rough_2k.jpg"],
            &spec,
            &library,
        );
        assert!(graph.check().is_ok());
        assert_eq!(image_textures(&graph), 3);
        assert_eq!(
            graph
                .nodes_where(|k| matches!(k, NodeKind::GroupReference { .. }))
                .len(),
            1
        );

        let shader = shader(&graph);
        assert!(matches!(
            source_kind(&graph, shader, "Base Color"),
            Some(NodeKind::ImageTexture { image }) if image == "rock_diff"
        ));
        assert!(matches!(
            source_kind(&graph, shader, "Roughness"),
            Some(NodeKind::ImageTexture { image }) if image == "rock_rough"
        ));
        assert!(matches!(
            source_kind(&graph, shader, "Normal"),
            Some(NodeKind::GroupReference { group, .. }) if group == NORMAL_ROTATION_GROUP
        ));
        assert!(source_kind(&graph, shader, "Specular").is_none());
        assert!(source_kind(&graph, material_output(&graph), "Displacement").is_none());
        assert_eq!(graph.displacement_method, None);
    }

    #[test]
    fn test_backbone() {
        let library = NodeGroupLibrary::new();
        let graph = build(&["rock_diff.jpg"], &MaterialSpec::default(), &library);
        let mapping = graph.find("mapping").unwrap().id;
        let fanout = graph.find("reroute").unwrap().id;
        assert!(matches!(
            source_kind(&graph, mapping, "Vector"),
            Some(NodeKind::TexCoord)
        ));
        assert!(matches!(
            source_kind(&graph, fanout, "Input"),
            Some(NodeKind::Mapping)
        ));
        assert!(matches!(
            source_kind(&graph, material_output(&graph), "Surface"),
            Some(NodeKind::PrincipledShader)
        ));
        let texture = graph.find("image_texture").unwrap().id;
        assert_eq!(graph.links_into(texture, "Vector")[0].from, fanout);
    }

    #[test]
    fn test_normal_preferred_over_bump() {
        let library = NodeGroupLibrary::new();
        let graph = build(
            &["a_diff.png", "a_nor.png", "a_bump.png"],
            &MaterialSpec::default(),
            &library,
        );
        assert!(matches!(
            source_kind(&graph, shader(&graph), "Normal"),
            Some(NodeKind::GroupReference { .. })
        ));
        assert!(graph.find("bump_to_normal").is_none());
        assert!(!graph.images.iter().any(|i| i.name == "rock_bump"));
        assert_eq!(image_textures(&graph), 2);
    }

    #[test]
    fn test_bump_converted() {
        let spec = MaterialSpec {
            relief_preference: "bump,normal".parse().unwrap(),
            ..Default::default()
        };
        let library = NodeGroupLibrary::new();
        let graph = build(&["a_nor.png", "a_bump.png"], &spec, &library);
        let bump = graph.find("bump_to_normal").unwrap();
        assert!(matches!(
            source_kind(&graph, bump.id, "Height"),
            Some(NodeKind::ImageTexture { image }) if image == "rock_bump"
        ));
        assert!(matches!(
            source_kind(&graph, shader(&graph), "Normal"),
            Some(NodeKind::BumpToNormal)
        ));
        assert!(library.is_empty());
    }

    #[test]
    fn test_colour_space_tagging() {
        let library = NodeGroupLibrary::new();
        let graph = build(
            &["a_diff.png", "a_spec.png", "a_rough.png", "a_nor.png"],
            &MaterialSpec::default(),
            &library,
        );
        for image in &graph.images {
            let expected = if image.name == "rock_diff" || image.name == "rock_spec" {
                ColourSpace::Srgb
            } else {
                ColourSpace::NonColor
            };
            assert_eq!(image.colour_space, expected, "image {}", image.name);
        }
    }

    #[test]
    fn test_textures_in_shader_input_order() {
        let library = NodeGroupLibrary::new();
        let graph = build(
            &["a_rough.png", "a_nor.png", "a_spec.png", "a_diff.png"],
            &MaterialSpec::default(),
            &library,
        );
        let order: Vec<&str> = graph
            .nodes
            .iter()
            .filter_map(|n| match &n.kind {
                NodeKind::ImageTexture { image } => Some(image.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(order, vec!["rock_diff", "rock_spec", "rock_rough", "rock_nor"]);

        let ys: Vec<f32> = graph
            .nodes_where(|k| matches!(k, NodeKind::ImageTexture { .. }))
            .iter()
            .map(|n| n.location.y)
            .collect();
        assert_eq!(ys, vec![200.0, -100.0, -400.0, -700.0]);
        let rotate = graph.find("group_reference").unwrap();
        assert_eq!(rotate.location, Location::new(200.0, -700.0));
    }

    #[test]
    fn test_displacement_as_height_input() {
        let library = NodeGroupLibrary::new();
        let graph = build(
            &["a_diff.png", "a_nor.png", "a_disp.png"],
            &MaterialSpec::default(),
            &library,
        );
        assert!(matches!(
            source_kind(&graph, material_output(&graph), "Displacement"),
            Some(NodeKind::ImageTexture { image }) if image == "rock_disp"
        ));
        assert_eq!(graph.displacement_method, Some(DisplacementMethod::Both));
        // Normal still owns the shader's relief input
        assert!(matches!(
            source_kind(&graph, shader(&graph), "Normal"),
            Some(NodeKind::GroupReference { .. })
        ));
    }

    #[test]
    fn test_displacement_standalone_texture() {
        let spec = MaterialSpec {
            displacement: DisplacementUsage::AsStandaloneTexture,
            ..Default::default()
        };
        let library = NodeGroupLibrary::new();
        let graph = build(&["x_disp_4k.png"], &spec, &library);
        assert_eq!(image_textures(&graph), 0);
        assert!(source_kind(&graph, material_output(&graph), "Displacement").is_none());
        assert_eq!(graph.displacement_method, None);
        assert_eq!(
            graph.textures,
            vec![StandaloneTexture {
                name: "rock_disp".to_string(),
                image: "rock_disp".to_string(),
            }]
        );
        assert_eq!(graph.images[0].colour_space, ColourSpace::NonColor);
        assert!(graph.check().is_ok());
    }

    #[test]
    fn test_synthesis_twice_creates_one_group() {
        let library = NodeGroupLibrary::new();
        let spec = MaterialSpec::default();
        let first = build(&["a_nor.png"], &spec, &library);
        let second = build(&["b_nor.png"], &spec, &library);
        assert_eq!(library.len(), 1);
        let group_of = |g: &NodeGraph| match &g.find("group_reference").unwrap().kind {
            NodeKind::GroupReference { group, .. } => group.clone(),
            _ => unreachable!(),
        };
        assert_eq!(group_of(&first), group_of(&second));
    }

    #[test]
    fn test_graph_applies_to_document() {
        let library = NodeGroupLibrary::new();
        let graph = build(
            &["a_diff.png", "a_nor.png", "a_disp.png"],
            &MaterialSpec::default(),
            &library,
        );
        let mut doc = HostDocument::new();
        graph.apply(&mut doc).unwrap();
        let material = doc.material("rock").unwrap();
        assert_eq!(material.nodes.len(), graph.nodes.len());
        assert_eq!(material.links.len(), graph.links.len());
        assert_eq!(material.displacement_method, Some(DisplacementMethod::Both));
        assert_eq!(doc.images.len(), 3);
    }
}
