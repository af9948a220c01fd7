//! Config providers: where a [`UserConfig`] is loaded from.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized, Toml, Yaml},
};

use super::defaults::{CONFIG_FILES, ENV_PREFIX};
use super::{ConfigSource, UserConfig};
use crate::error::{Error, Result};

/// Loads user configuration from some source.
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    fn source(&self) -> ConfigSource;

    async fn load(&self) -> Result<UserConfig>;
}

/// Environment overrides merged over every source.
fn env_layer() -> Env {
    Env::prefixed(ENV_PREFIX).only(&["minify", "tsconfig"])
}

fn extract(figment: Figment, origin: &Path) -> Result<UserConfig> {
    let config: UserConfig = figment
        .merge(env_layer())
        .extract()
        .map_err(|e| Error::config_load(origin, e))?;
    let unknown = config.unknown_keys();
    if !unknown.is_empty() {
        return Err(Error::config_load(
            origin,
            format!("unknown keys: {}", unknown.join(", ")),
        ));
    }
    Ok(config)
}

/// A JSON, TOML or YAML config file, picked by extension.
#[derive(Debug, Clone)]
pub struct FileConfigProvider {
    path: PathBuf,
    from_cli: bool,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            from_cli: false,
        }
    }

    /// Mark the file as requested on the command line.
    pub fn from_cli(mut self) -> Self {
        self.from_cli = true;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigProvider for FileConfigProvider {
    fn source(&self) -> ConfigSource {
        if self.from_cli {
            ConfigSource::CliFile(self.path.clone())
        } else {
            ConfigSource::ConventionalFile(self.path.clone())
        }
    }

    async fn load(&self) -> Result<UserConfig> {
        match tokio::fs::try_exists(&self.path).await {
            Ok(true) => {}
            Ok(false) => return Err(Error::config_load(&self.path, "file does not exist")),
            Err(e) => return Err(Error::config_load(&self.path, e)),
        }

        let ext = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let figment = match ext.as_str() {
            "toml" => Figment::from(Toml::file(&self.path)),
            "json" => Figment::from(Json::file(&self.path)),
            "yaml" | "yml" => Figment::from(Yaml::file(&self.path)),
            other => {
                return Err(Error::config_load(
                    &self.path,
                    format!("unsupported config format '{other}' (expected toml, json or yaml)"),
                ));
            }
        };

        tracing::debug!(path = %self.path.display(), "Loading config file");
        extract(figment, &self.path)
    }
}

/// The `fobPack` field of `package.json`.
#[derive(Debug, Clone)]
pub struct ManifestConfigProvider {
    manifest_path: PathBuf,
    value: serde_json::Value,
}

impl ManifestConfigProvider {
    pub fn new(manifest_path: impl Into<PathBuf>, value: serde_json::Value) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            value,
        }
    }
}

#[async_trait]
impl ConfigProvider for ManifestConfigProvider {
    fn source(&self) -> ConfigSource {
        ConfigSource::Manifest
    }

    async fn load(&self) -> Result<UserConfig> {
        if !self.value.is_object() {
            return Err(Error::config_load(
                &self.manifest_path,
                "the \"fobPack\" field must be an object",
            ));
        }
        extract(
            Figment::from(Serialized::defaults(&self.value)),
            &self.manifest_path,
        )
    }
}

/// A ready-made configuration, for Rust callers.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigProvider {
    config: UserConfig,
}

impl StaticConfigProvider {
    pub fn new(config: UserConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ConfigProvider for StaticConfigProvider {
    fn source(&self) -> ConfigSource {
        ConfigSource::Programmatic
    }

    async fn load(&self) -> Result<UserConfig> {
        Ok(self.config.clone())
    }
}

/// Environment-only configuration for auto mode.
pub(crate) fn auto_config(root: &Path) -> Result<UserConfig> {
    extract(Figment::new(), root)
}

/// First conventional config file present in `root`.
pub async fn find_config_file(root: &Path) -> Option<PathBuf> {
    for name in CONFIG_FILES {
        let path = root.join(name);
        if matches!(tokio::fs::try_exists(&path).await, Ok(true)) {
            return Some(path);
        }
    }
    None
}
