//! Layered configuration
//!
//! Config is loaded with four layers of precedence (highest wins):
//! 1. Command-line flags, applied by each command
//! 2. Environment variables: `TEXMAT_DISPLACEMENT`, `TEXMAT_PREFER`, `TEXMAT_GRAMMAR`
//! 3. Project-local: `.texmat/config.toml`
//! 4. Global: `~/.texmat/config.toml`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use texmat_core::{Result, TexmatError};
use texmat_resolve::{DisplacementUsage, FilenameGrammar, MaterialSpec, PreferenceList};

const PROJECT_DIR: &str = ".texmat";

/// `[material]` table. Unset keys fall through to the layer below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialConfig {
    #[serde(default)]
    pub diffuse: Option<bool>,
    #[serde(default)]
    pub specular: Option<bool>,
    #[serde(default)]
    pub roughness: Option<bool>,
    #[serde(default)]
    pub prefer: Option<PreferenceList>,
    #[serde(default)]
    pub displacement: Option<DisplacementUsage>,
    #[serde(default)]
    pub grammar: Option<FilenameGrammar>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Where the node group library is kept between runs
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory imported images are copied into. Defaults to
    /// `.texmat/textures`.
    #[serde(default)]
    pub pack_dir: Option<PathBuf>,
}

/// Top-level config file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TexmatConfigFile {
    #[serde(default)]
    pub material: MaterialConfig,
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Resolved configuration with environment overrides applied
#[derive(Debug, Clone, PartialEq)]
pub struct TexmatConfig {
    pub material: MaterialConfig,
    pub library_path: PathBuf,
    pub pack_dir: PathBuf,
}

impl TexmatConfig {
    /// Load config with layered precedence: global < project < env vars
    pub fn load() -> Result<Self> {
        let mut config = TexmatConfigFile::default();

        // Layer 1: Global config (~/.texmat/config.toml)
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global = Self::load_file(&global_path)?;
                Self::merge_into(&mut config, global);
            }
        }

        // Layer 2: Project-local config (.texmat/config.toml)
        let local_path = Path::new(PROJECT_DIR).join("config.toml");
        if local_path.exists() {
            let local = Self::load_file(&local_path)?;
            Self::merge_into(&mut config, local);
        }

        // Layer 3: Environment variable overrides
        Self::apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
        Ok(Self::resolve(config))
    }

    /// Load config from a specific file path only, plus env overrides
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let mut config = Self::load_file(path)?;
        Self::apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
        Ok(Self::resolve(config))
    }

    /// The material spec described by this config
    pub fn spec(&self) -> MaterialSpec {
        let defaults = MaterialSpec::default();
        let m = &self.material;
        MaterialSpec {
            diffuse: m.diffuse.unwrap_or(defaults.diffuse),
            specular: m.specular.unwrap_or(defaults.specular),
            roughness: m.roughness.unwrap_or(defaults.roughness),
            relief_preference: m.prefer.clone().unwrap_or(defaults.relief_preference),
            displacement: m.displacement.unwrap_or(defaults.displacement),
            grammar: m.grammar.unwrap_or(defaults.grammar),
        }
    }

    fn resolve(file: TexmatConfigFile) -> Self {
        TexmatConfig {
            material: file.material,
            library_path: file
                .library
                .path
                .unwrap_or_else(|| Path::new(PROJECT_DIR).join("library.toml")),
            pack_dir: file
                .output
                .pack_dir
                .unwrap_or_else(|| Path::new(PROJECT_DIR).join("textures")),
        }
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(PROJECT_DIR).join("config.toml"))
    }

    fn load_file(path: &Path) -> Result<TexmatConfigFile> {
        let content = std::fs::read_to_string(path)?;
        let config: TexmatConfigFile = toml::from_str(&content).map_err(|e| {
            TexmatError::ConfigError(format!("Failed to parse config {}: {}", path.display(), e))
        })?;
        Ok(config)
    }

    fn merge_into(base: &mut TexmatConfigFile, overlay: TexmatConfigFile) {
        let (b, o) = (&mut base.material, overlay.material);
        if o.diffuse.is_some() {
            b.diffuse = o.diffuse;
        }
        if o.specular.is_some() {
            b.specular = o.specular;
        }
        if o.roughness.is_some() {
            b.roughness = o.roughness;
        }
        if o.prefer.is_some() {
            b.prefer = o.prefer;
        }
        if o.displacement.is_some() {
            b.displacement = o.displacement;
        }
        if o.grammar.is_some() {
            b.grammar = o.grammar;
        }
        if overlay.library.path.is_some() {
            base.library.path = overlay.library.path;
        }
        if overlay.output.pack_dir.is_some() {
            base.output.pack_dir = overlay.output.pack_dir;
        }
    }

    fn apply_env_overrides(
        config: &mut TexmatConfigFile,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<()> {
        let invalid = |key: &str, e: &dyn std::fmt::Display| {
            TexmatError::ConfigError(format!("{}: {}", key, e))
        };

        if let Some(value) = var("TEXMAT_DISPLACEMENT") {
            let usage = value
                .parse::<DisplacementUsage>()
                .map_err(|e| invalid("TEXMAT_DISPLACEMENT", &e))?;
            config.material.displacement = Some(usage);
        }
        if let Some(value) = var("TEXMAT_PREFER") {
            let prefer = value
                .parse::<PreferenceList>()
                .map_err(|e| invalid("TEXMAT_PREFER", &e))?;
            config.material.prefer = Some(prefer);
        }
        if let Some(value) = var("TEXMAT_GRAMMAR") {
            let grammar = value
                .parse::<FilenameGrammar>()
                .map_err(|e| invalid("TEXMAT_GRAMMAR", &e))?;
            config.material.grammar = Some(grammar);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use texmat_resolve::MapKind;

    fn temp_config(content: &str) -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("texmat_config_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    fn cleanup(path: &Path) {
        std::fs::remove_file(path).ok();
        std::fs::remove_dir(path.parent().unwrap()).ok();
    }

    fn parse(content: &str) -> TexmatConfigFile {
        toml::from_str(content).unwrap()
    }

    #[test]
    fn test_load_config_from_file() {
        let path = temp_config(
            r#"
[material]
specular = false
prefer = ["bump", "normal"]
displacement = "texture"

[library]
path = "/tmp/groups.toml"
"#,
        );
        let mut file = TexmatConfig::load_file(&path).unwrap();
        TexmatConfig::apply_env_overrides(&mut file, |_| None).unwrap();
        let config = TexmatConfig::resolve(file);

        let spec = config.spec();
        assert!(spec.diffuse);
        assert!(!spec.specular);
        assert_eq!(
            spec.relief_preference.kinds(),
            &[MapKind::Bump, MapKind::Normal]
        );
        assert_eq!(spec.displacement, DisplacementUsage::AsStandaloneTexture);
        assert_eq!(config.library_path, PathBuf::from("/tmp/groups.toml"));
        assert_eq!(config.pack_dir, Path::new(PROJECT_DIR).join("textures"));

        cleanup(&path);
    }

    #[test]
    fn test_empty_config_gives_default_spec() {
        let config = TexmatConfig::resolve(TexmatConfigFile::default());
        assert_eq!(config.spec(), MaterialSpec::default());
        assert_eq!(
            config.library_path,
            Path::new(PROJECT_DIR).join("library.toml")
        );
        // Images always get a home outside the scratch directory
        assert_eq!(config.pack_dir, Path::new(PROJECT_DIR).join("textures"));
    }

    #[test]
    fn test_project_layer_overrides_global() {
        let mut base = parse(
            r#"
[material]
specular = false
grammar = "bare"

[output]
pack_dir = "global_textures"
"#,
        );
        let overlay = parse(
            r#"
[material]
grammar = "sized"
"#,
        );
        TexmatConfig::merge_into(&mut base, overlay);
        assert_eq!(base.material.specular, Some(false));
        assert_eq!(base.material.grammar, Some(FilenameGrammar::Sized));
        assert_eq!(base.output.pack_dir, Some(PathBuf::from("global_textures")));
    }

    #[test]
    fn test_env_var_override() {
        let mut file = parse(
            r#"
[material]
displacement = "none"
grammar = "bare"
"#,
        );
        let env: HashMap<&str, &str> = [
            ("TEXMAT_DISPLACEMENT", "material"),
            ("TEXMAT_PREFER", "disp,normal"),
        ]
        .into_iter()
        .collect();
        TexmatConfig::apply_env_overrides(&mut file, |k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(
            file.material.displacement,
            Some(DisplacementUsage::AsHeightInput)
        );
        assert_eq!(
            file.material.prefer.unwrap().kinds(),
            &[MapKind::Displacement, MapKind::Normal]
        );
        // Untouched by env
        assert_eq!(file.material.grammar, Some(FilenameGrammar::Bare));
    }

    #[test]
    fn test_invalid_env_value_rejected() {
        let mut file = TexmatConfigFile::default();
        let err = TexmatConfig::apply_env_overrides(&mut file, |k| {
            (k == "TEXMAT_PREFER").then(|| "normal,diffuse".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, TexmatError::ConfigError(_)));
        assert!(err.to_string().contains("TEXMAT_PREFER"));
    }

    #[test]
    fn test_invalid_preference_in_file_rejected() {
        let path = temp_config(
            r#"
[material]
prefer = ["roughness"]
"#,
        );
        assert!(TexmatConfig::load_file(&path).is_err());
        cleanup(&path);
    }
}
