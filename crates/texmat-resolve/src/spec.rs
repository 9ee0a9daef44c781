//! User-facing material configuration

use crate::grammar::FilenameGrammar;
use crate::map_kind::MapKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use texmat_core::{Result, TexmatError};

/// How to use a displacement map, if the archive has one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplacementUsage {
    /// Don't use it
    #[serde(rename = "none", alias = "no")]
    None,
    /// Wire it into the material output's displacement socket
    #[default]
    #[serde(rename = "material")]
    AsHeightInput,
    /// Load it as a separate texture for a displacement modifier
    #[serde(rename = "texture")]
    AsStandaloneTexture,
}

impl DisplacementUsage {
    pub fn is_enabled(self) -> bool {
        self != DisplacementUsage::None
    }
}

impl fmt::Display for DisplacementUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DisplacementUsage::None => "none",
            DisplacementUsage::AsHeightInput => "material",
            DisplacementUsage::AsStandaloneTexture => "texture",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for DisplacementUsage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "no" => Ok(DisplacementUsage::None),
            "material" => Ok(DisplacementUsage::AsHeightInput),
            "texture" => Ok(DisplacementUsage::AsStandaloneTexture),
            _ => Err(format!(
                "unknown displacement usage '{}'; valid values: none, material, texture",
                s
            )),
        }
    }
}

/// Ordered preference among the relief maps (normal, bump, displacement).
///
/// Repeated kinds collapse to their first position, so the list never holds
/// more than three entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<MapKind>", into = "Vec<MapKind>")]
pub struct PreferenceList(Vec<MapKind>);

impl PreferenceList {
    pub fn new(kinds: impl IntoIterator<Item = MapKind>) -> Result<Self> {
        let mut list = Vec::with_capacity(MapKind::RELIEF.len());
        for kind in kinds {
            if !kind.is_relief() {
                return Err(TexmatError::InvalidPreference(format!(
                    "'{}' is not a relief map; only normal, bump and displacement can be ranked",
                    kind
                )));
            }
            if !list.contains(&kind) {
                list.push(kind);
            }
        }
        Ok(Self(list))
    }

    /// An empty list: no relief map is wanted
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn kinds(&self) -> &[MapKind] {
        &self.0
    }

    pub fn contains(&self, kind: MapKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries that are not disabled. Displacement is dropped when the
    /// displacement usage is `None`.
    pub fn effective(&self, usage: DisplacementUsage) -> impl Iterator<Item = MapKind> + '_ {
        self.0
            .iter()
            .copied()
            .filter(move |&k| k != MapKind::Displacement || usage.is_enabled())
    }

    /// The first effective entry for which `present` holds
    pub fn select(
        &self,
        usage: DisplacementUsage,
        present: impl Fn(MapKind) -> bool,
    ) -> Option<MapKind> {
        self.effective(usage).find(|&k| present(k))
    }
}

impl Default for PreferenceList {
    fn default() -> Self {
        Self(vec![MapKind::Normal, MapKind::Bump, MapKind::Displacement])
    }
}

impl TryFrom<Vec<MapKind>> for PreferenceList {
    type Error = TexmatError;

    fn try_from(kinds: Vec<MapKind>) -> Result<Self> {
        Self::new(kinds)
    }
}

impl From<PreferenceList> for Vec<MapKind> {
    fn from(list: PreferenceList) -> Self {
        list.0
    }
}

impl FromStr for PreferenceList {
    type Err = TexmatError;

    /// Parses a comma-separated list such as `normal,bump,disp`. `none`
    /// entries are skipped.
    fn from_str(s: &str) -> Result<Self> {
        let mut kinds = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if part.eq_ignore_ascii_case("none") {
                continue;
            }
            let kind = part
                .parse::<MapKind>()
                .map_err(TexmatError::InvalidPreference)?;
            kinds.push(kind);
        }
        Self::new(kinds)
    }
}

impl fmt::Display for PreferenceList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|k| k.name()).collect();
        write!(f, "{}", names.join(","))
    }
}

/// What to build from an archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialSpec {
    #[serde(default = "default_true")]
    pub diffuse: bool,
    #[serde(default = "default_true")]
    pub specular: bool,
    #[serde(default = "default_true")]
    pub roughness: bool,
    #[serde(default, rename = "prefer")]
    pub relief_preference: PreferenceList,
    #[serde(default)]
    pub displacement: DisplacementUsage,
    #[serde(default)]
    pub grammar: FilenameGrammar,
}

fn default_true() -> bool {
    true
}

impl Default for MaterialSpec {
    fn default() -> Self {
        Self {
            diffuse: true,
            specular: true,
            roughness: true,
            relief_preference: PreferenceList::default(),
            displacement: DisplacementUsage::default(),
            grammar: FilenameGrammar::default(),
        }
    }
}

impl MaterialSpec {
    /// Whether the user wants this kind loaded at all
    pub fn wants(&self, kind: MapKind) -> bool {
        match kind {
            MapKind::Diffuse => self.diffuse,
            MapKind::Specular => self.specular,
            MapKind::Roughness => self.roughness,
            MapKind::Normal | MapKind::Bump => self.relief_preference.contains(kind),
            // A standalone texture doesn't need to win the relief slot
            MapKind::Displacement => self.displacement.is_enabled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_rejects_non_relief() {
        let err = PreferenceList::new([MapKind::Normal, MapKind::Diffuse]).unwrap_err();
        assert!(matches!(err, TexmatError::InvalidPreference(_)));
    }

    #[test]
    fn test_preference_collapses_duplicates() {
        let list = PreferenceList::new([
            MapKind::Bump,
            MapKind::Normal,
            MapKind::Bump,
            MapKind::Normal,
        ])
        .unwrap();
        assert_eq!(list.kinds(), &[MapKind::Bump, MapKind::Normal]);
    }

    #[test]
    fn test_preference_from_str() {
        let list: PreferenceList = "disp, nor,none".parse().unwrap();
        assert_eq!(list.kinds(), &[MapKind::Displacement, MapKind::Normal]);
        assert!("none,none".parse::<PreferenceList>().unwrap().is_empty());
        assert!("normal,gloss".parse::<PreferenceList>().is_err());
        assert!("normal,diffuse".parse::<PreferenceList>().is_err());
    }

    #[test]
    fn test_select_skips_disabled_displacement() {
        let list: PreferenceList = "displacement,bump".parse().unwrap();
        let all = |_| true;
        assert_eq!(
            list.select(DisplacementUsage::AsHeightInput, all),
            Some(MapKind::Displacement)
        );
        assert_eq!(list.select(DisplacementUsage::None, all), Some(MapKind::Bump));
    }

    #[test]
    fn test_select_first_present() {
        let list = PreferenceList::default();
        let present = |k| k == MapKind::Bump || k == MapKind::Displacement;
        assert_eq!(
            list.select(DisplacementUsage::AsHeightInput, present),
            Some(MapKind::Bump)
        );
        assert_eq!(
            PreferenceList::empty().select(DisplacementUsage::AsHeightInput, |_| true),
            None
        );
    }

    #[test]
    fn test_wants() {
        let spec = MaterialSpec {
            specular: false,
            relief_preference: "bump".parse().unwrap(),
            displacement: DisplacementUsage::AsStandaloneTexture,
            ..Default::default()
        };
        assert!(spec.wants(MapKind::Diffuse));
        assert!(!spec.wants(MapKind::Specular));
        assert!(spec.wants(MapKind::Bump));
        assert!(!spec.wants(MapKind::Normal));
        // Wanted even though it is not in the preference list
        assert!(spec.wants(MapKind::Displacement));
    }

    #[test]
    fn test_spec_toml() {
        let spec: MaterialSpec = toml::from_str(
            r#"
specular = false
prefer = ["bump", "nor"]
displacement = "texture"
grammar = "bare"
"#,
        )
        .unwrap();
        assert!(spec.diffuse);
        assert!(!spec.specular);
        assert_eq!(spec.relief_preference.kinds(), &[MapKind::Bump, MapKind::Normal]);
        assert_eq!(spec.displacement, DisplacementUsage::AsStandaloneTexture);
        assert_eq!(spec.grammar, FilenameGrammar::Bare);

        let text = toml::to_string(&spec).unwrap();
        let back: MaterialSpec = toml::from_str(&text).unwrap();
        assert_eq!(back, spec);
    }

    #[test]
    fn test_spec_toml_rejects_bad_preference() {
        let result: std::result::Result<MaterialSpec, _> =
            toml::from_str(r#"prefer = ["roughness"]"#);
        assert!(result.is_err());
    }
}
