//! Map kinds and their static behaviour table

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One kind of texture map an archive can contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapKind {
    Bump,
    #[serde(alias = "col", alias = "diff")]
    Diffuse,
    #[serde(alias = "disp")]
    Displacement,
    #[serde(alias = "nor", alias = "nrm")]
    Normal,
    #[serde(alias = "rgh", alias = "rough")]
    Roughness,
    #[serde(alias = "met", alias = "spec")]
    Specular,
}

/// Principled shader inputs a texture can feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderInput {
    BaseColor,
    Specular,
    Roughness,
    Normal,
}

impl ShaderInput {
    /// Socket name on the principled shader node
    pub fn socket(&self) -> &'static str {
        match self {
            ShaderInput::BaseColor => "Base Color",
            ShaderInput::Specular => "Specular",
            ShaderInput::Roughness => "Roughness",
            ShaderInput::Normal => "Normal",
        }
    }
}

/// Where a map kind ends up in the material
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderTarget {
    /// Texture colour goes straight into a shader input
    Direct(ShaderInput),
    /// Height data converted to a normal before reaching the shader
    ViaBumpConversion(ShaderInput),
    /// Tangent-space normals passed through the normal rotation group
    ViaNormalRotation(ShaderInput),
    /// The material output's displacement socket
    Displacement,
}

/// Static per-kind behaviour
#[derive(Debug)]
pub struct MapKindInfo {
    pub kind: MapKind,
    /// Filename tokens, lower case. The first is the canonical id.
    pub aliases: &'static [&'static str],
    /// Colour data (sRGB) rather than raw values
    pub is_colour: bool,
    pub target: ShaderTarget,
}

static MAP_KINDS: [MapKindInfo; 6] = [
    MapKindInfo {
        kind: MapKind::Bump,
        aliases: &["bump"],
        is_colour: false,
        target: ShaderTarget::ViaBumpConversion(ShaderInput::Normal),
    },
    MapKindInfo {
        kind: MapKind::Diffuse,
        aliases: &["col", "diff"],
        is_colour: true,
        target: ShaderTarget::Direct(ShaderInput::BaseColor),
    },
    MapKindInfo {
        kind: MapKind::Displacement,
        aliases: &["disp"],
        is_colour: false,
        target: ShaderTarget::Displacement,
    },
    MapKindInfo {
        kind: MapKind::Normal,
        aliases: &["nor", "normal", "nrm"],
        is_colour: false,
        target: ShaderTarget::ViaNormalRotation(ShaderInput::Normal),
    },
    MapKindInfo {
        kind: MapKind::Roughness,
        aliases: &["rgh", "rough", "roughness"],
        is_colour: false,
        target: ShaderTarget::Direct(ShaderInput::Roughness),
    },
    MapKindInfo {
        kind: MapKind::Specular,
        aliases: &["met", "spec"],
        is_colour: true,
        target: ShaderTarget::Direct(ShaderInput::Specular),
    },
];

impl MapKind {
    pub const ALL: [MapKind; 6] = [
        MapKind::Bump,
        MapKind::Diffuse,
        MapKind::Displacement,
        MapKind::Normal,
        MapKind::Roughness,
        MapKind::Specular,
    ];

    /// Kinds that compete for the shader's relief slot
    pub const RELIEF: [MapKind; 3] = [MapKind::Normal, MapKind::Bump, MapKind::Displacement];

    /// The behaviour table row for this kind
    pub fn info(self) -> &'static MapKindInfo {
        // Table rows are declared in variant order.
        &MAP_KINDS[self as usize]
    }

    pub fn aliases(self) -> &'static [&'static str] {
        self.info().aliases
    }

    pub fn is_colour(self) -> bool {
        self.info().is_colour
    }

    pub fn target(self) -> ShaderTarget {
        self.info().target
    }

    pub fn is_relief(self) -> bool {
        Self::RELIEF.contains(&self)
    }

    /// Canonical short id, as used in config files and image names
    pub fn id(self) -> &'static str {
        self.aliases()[0]
    }

    /// Look up a filename token (case-insensitive)
    pub fn from_token(token: &str) -> Option<MapKind> {
        let token = token.to_ascii_lowercase();
        MAP_KINDS
            .iter()
            .find(|info| info.aliases.contains(&token.as_str()))
            .map(|info| info.kind)
    }

    pub fn name(self) -> &'static str {
        match self {
            MapKind::Bump => "bump",
            MapKind::Diffuse => "diffuse",
            MapKind::Displacement => "displacement",
            MapKind::Normal => "normal",
            MapKind::Roughness => "roughness",
            MapKind::Specular => "specular",
        }
    }
}

impl fmt::Display for MapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for MapKind {
    type Err = String;

    /// Accepts either the kind's full name or any of its filename aliases
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        MapKind::ALL
            .into_iter()
            .find(|k| k.name() == lower)
            .or_else(|| MapKind::from_token(&lower))
            .ok_or_else(|| {
                format!(
                    "unknown map kind '{}'; valid values: bump, diffuse, displacement, normal, roughness, specular",
                    s
                )
            })
    }
}
