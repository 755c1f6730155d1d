use crate::error::{HarvestError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILENAME: &str = "config.json";
pub const DEFAULT_METADATA_PREFIX: &str = "oai_dc";

/// How record identifiers are decomposed into sub-directories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubdirMode {
    /// Everything lands directly in the root; path separators are escaped.
    #[default]
    Off,
    /// Path separators already present in the identifier become directories.
    Separator,
    /// The marker character is turned into a path separator before escaping.
    Marker(char),
}

impl SubdirMode {
    /// Build a mode from a command-line style value: no value means
    /// [`SubdirMode::Separator`], a single character means a marker.
    pub fn from_marker(marker: Option<&str>) -> Result<Self> {
        let Some(marker) = marker else {
            return Ok(SubdirMode::Separator);
        };
        let mut chars = marker.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(SubdirMode::Marker(c)),
            _ => Err(HarvestError::Config(format!(
                "sub-directory marker must be a single character, got {:?}",
                marker
            ))),
        }
    }
}

/// Settings of a directory-backed record store. Fixed once the store is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub root: PathBuf,
    pub subdirs: SubdirMode,
    pub resolve_entities: bool,
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            subdirs: SubdirMode::Off,
            resolve_entities: true,
        }
    }

    pub fn with_subdirs(mut self, subdirs: SubdirMode) -> Self {
        self.subdirs = subdirs;
        self
    }

    pub fn with_resolve_entities(mut self, resolve: bool) -> Self {
        self.resolve_entities = resolve;
        self
    }
}

/// A named provider, so it can be harvested by name instead of by URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_prefix: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdirs: Option<SubdirMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolve_entities: Option<bool>,
}

impl ProviderConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            metadata_prefix: None,
            subdirs: None,
            resolve_entities: None,
        }
    }
}

/// Harvester configuration, stored as `config.json` in the config directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestConfig {
    #[serde(default = "default_metadata_prefix")]
    pub default_metadata_prefix: String,

    #[serde(default)]
    pub providers: BTreeMap<String, ProviderConfig>,
}

fn default_metadata_prefix() -> String {
    DEFAULT_METADATA_PREFIX.to_string()
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            default_metadata_prefix: default_metadata_prefix(),
            providers: BTreeMap::new(),
        }
    }
}

/// A provider reference after resolution against the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProvider {
    pub base_url: String,
    pub settings: Option<ProviderConfig>,
}

impl HarvestConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(&config_path).map_err(|e| HarvestError::io(&config_path, e))?;
        let config: HarvestConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save config to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();
        fs::create_dir_all(config_dir).map_err(|e| HarvestError::io(config_dir, e))?;

        let config_path = config_dir.join(CONFIG_FILENAME);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, content).map_err(|e| HarvestError::io(&config_path, e))?;
        Ok(())
    }

    /// Resolve a command-line provider reference. URLs and local paths pass
    /// through; anything else must name a configured provider.
    pub fn resolve(&self, reference: &str) -> Result<ResolvedProvider> {
        if is_direct_reference(reference) {
            return Ok(ResolvedProvider {
                base_url: reference.to_string(),
                settings: None,
            });
        }
        match self.providers.get(reference) {
            Some(provider) => Ok(ResolvedProvider {
                base_url: provider.base_url.clone(),
                settings: Some(provider.clone()),
            }),
            None => Err(HarvestError::Config(format!(
                "unknown provider {:?}: not a URL and not configured",
                reference
            ))),
        }
    }

    /// Pick the metadata prefix: explicit argument, then the provider's own
    /// setting, then the configured default.
    pub fn metadata_prefix_for(
        &self,
        explicit: Option<&str>,
        provider: &ResolvedProvider,
    ) -> String {
        explicit
            .map(str::to_string)
            .or_else(|| {
                provider
                    .settings
                    .as_ref()
                    .and_then(|p| p.metadata_prefix.clone())
            })
            .unwrap_or_else(|| self.default_metadata_prefix.clone())
    }
}

fn is_direct_reference(reference: &str) -> bool {
    reference.contains("://") || Path::new(reference).exists()
}
