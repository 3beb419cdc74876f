//! Service configuration loaded from YAML with environment overrides.

use anyhow::{Context, Result};
use rise_locations::DuplicatePolicy;
use rise_protocol::{FieldsMapping, DEFAULT_CATALOG_ITEM_HOST};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding [`RiseConfig::snapshot_dir`].
pub const SNAPSHOT_DIR_ENV: &str = "RISE_SNAPSHOT_DIR";

/// Configuration for the RISE EDR service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiseConfig {
    /// Directory holding previously fetched RISE responses.
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,

    /// Prefix for catalog item URLs.
    #[serde(default = "default_catalog_item_host")]
    pub catalog_item_host: String,

    /// What to do with a location that appears on two pages.
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,

    /// Endpoint name of the paged location listing.
    #[serde(default = "default_location_endpoint")]
    pub location_endpoint: String,

    /// Types of the properties clients may filter on.
    #[serde(default)]
    pub fields: FieldsMapping,
}

impl Default for RiseConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: default_snapshot_dir(),
            catalog_item_host: default_catalog_item_host(),
            duplicate_policy: DuplicatePolicy::default(),
            location_endpoint: default_location_endpoint(),
            fields: FieldsMapping::new(),
        }
    }
}

impl RiseConfig {
    /// Load from a YAML file, then apply environment overrides.
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {:?}", path))?;
            let config = Self::from_yaml_str(&content)
                .with_context(|| format!("Failed to parse config: {:?}", path))?;
            tracing::info!(
                "Loaded RISE config from {:?} ({} filterable fields)",
                path,
                config.fields.len()
            );
            config
        } else {
            tracing::warn!("Config file {:?} does not exist, using defaults", path);
            Self::default()
        };

        Ok(config.with_env_overrides())
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Apply `RISE_SNAPSHOT_DIR` if set and non-empty.
    pub fn with_env_overrides(self) -> Self {
        match std::env::var(SNAPSHOT_DIR_ENV) {
            Ok(dir) if !dir.trim().is_empty() => self.with_snapshot_dir(dir),
            _ => self,
        }
    }

    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = dir.into();
        self
    }
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from("snapshot")
}

fn default_catalog_item_host() -> String {
    DEFAULT_CATALOG_ITEM_HOST.to_string()
}

fn default_location_endpoint() -> String {
    "location".to_string()
}
