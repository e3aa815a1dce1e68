//! rainbridge configuration
//!
//! Loaded from `rainbridge.yaml`. Every section has defaults, so an empty
//! file (or no file at all) describes a project whose core views live in
//! `view/` and whose plugins live in `plugins/`.

use crate::engine::LegacyFunction;
use crate::error::{Error, Result};
use crate::translate::{Target, DEFAULT_EXTENSION};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name looked up by [`Config::discover`]
pub const CONFIG_FILE: &str = "rainbridge.yaml";

/// Current config schema version
pub const CONFIG_VERSION: u32 = 1;

/// Root configuration (`rainbridge.yaml`)
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    /// Schema version for migrations
    #[serde(default = "default_version")]
    pub version: u32,

    /// Where templates are looked up
    #[serde(default)]
    pub views: ViewsConfig,

    /// Legacy translation settings
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Embedded render engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

/// Template directories
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ViewsConfig {
    /// Core view directory, always searched last
    #[serde(default = "default_core_dir")]
    pub core_dir: PathBuf,

    /// Optional theme directory, searched before every plugin
    #[serde(default)]
    pub theme_dir: Option<PathBuf>,

    /// Directory holding one sub-directory per plugin
    #[serde(default = "default_plugins_dir")]
    pub plugins_dir: PathBuf,

    /// Active plugins in declaration order. Later plugins take precedence.
    #[serde(default)]
    pub plugins: Vec<String>,

    /// View folder names tried inside each plugin directory
    #[serde(default = "default_view_folders")]
    pub folders: Vec<String>,
}

fn default_core_dir() -> PathBuf {
    PathBuf::from("view")
}

fn default_plugins_dir() -> PathBuf {
    PathBuf::from("plugins")
}

fn default_view_folders() -> Vec<String> {
    vec!["View".to_string(), "view".to_string()]
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            core_dir: default_core_dir(),
            theme_dir: None,
            plugins_dir: default_plugins_dir(),
            plugins: Vec::new(),
            folders: default_view_folders(),
        }
    }
}

/// Translation settings
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TranslationConfig {
    /// Dialect emitted by `rainbridge translate` when `--target` is absent
    #[serde(default)]
    pub target: Target,

    /// Extension of legacy templates, also appended to bare include names
    #[serde(default = "default_extension")]
    pub default_extension: String,
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            target: Target::default(),
            default_extension: default_extension(),
        }
    }
}

/// Render engine settings
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EngineConfig {
    /// Legacy helper functions made available to templates
    #[serde(default = "default_functions")]
    pub functions: Vec<String>,

    /// Values returned by `constant()` and `{#NAME#}`
    #[serde(default)]
    pub constants: BTreeMap<String, serde_json::Value>,
}

fn default_functions() -> Vec<String> {
    LegacyFunction::ALL
        .iter()
        .map(|f| f.name().to_string())
        .collect()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            functions: default_functions(),
            constants: BTreeMap::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            views: ViewsConfig::default(),
            translation: TranslationConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl Config {
    /// Parse a config document. Relative paths are left as written.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_norway::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, resolving relative directories against the
    /// directory the file lives in.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    /// Look for `rainbridge.yaml` in `dir`, falling back to defaults
    /// rooted at `dir`.
    pub fn discover(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if path.exists() {
            return Self::load(&path);
        }
        let mut config = Self::default();
        config.rebase(dir);
        Ok(config)
    }

    /// Make every relative directory relative to `base`
    pub fn rebase(&mut self, base: &Path) {
        let views = &mut self.views;
        views.core_dir = rebase_path(base, &views.core_dir);
        views.plugins_dir = rebase_path(base, &views.plugins_dir);
        views.theme_dir = views.theme_dir.as_deref().map(|p| rebase_path(base, p));
    }

    pub fn validate(&self) -> Result<()> {
        if self.version > CONFIG_VERSION {
            return Err(Error::Config(format!(
                "config version {} is newer than supported version {}",
                self.version, CONFIG_VERSION
            )));
        }
        if self.views.folders.is_empty() {
            return Err(Error::Config(
                "views.folders must name at least one folder".into(),
            ));
        }
        if self.translation.default_extension.trim_matches('.').is_empty() {
            return Err(Error::Config(
                "translation.default_extension must not be empty".into(),
            ));
        }
        if let Some(unknown) = self
            .engine
            .functions
            .iter()
            .find(|name| LegacyFunction::from_name(name).is_none())
        {
            return Err(Error::UnknownFunction(unknown.clone()));
        }
        Ok(())
    }
}

fn rebase_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() || base.as_os_str().is_empty() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
