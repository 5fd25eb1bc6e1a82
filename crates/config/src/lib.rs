//! Configuration loading and validation.
//!
//! Layers are merged in increasing order of precedence:
//!
//! 1. built-in defaults ([`Config::default`]),
//! 2. a config file: TOML, YAML or JSON, chosen by extension (defaults to
//!    `config.toml` in the platform config directory, if it exists),
//! 3. `MEDIAPACK_*` environment variables, with `__` separating nested keys
//!    (`MEDIAPACK_EXPORT__PAGE_SIZE=500`),
//! 4. command-line [`Overrides`].

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use mediapack_export::{Compression, DEFAULT_PAGE_SIZE};
use mediapack_storage::Layout;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "MEDIAPACK_";
const CONFIG_FILE_NAME: &str = "config.toml";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "mediapack")
}

fn data_dir() -> PathBuf {
    project_dirs().map(|dirs| dirs.data_dir().to_path_buf()).unwrap_or_else(|| PathBuf::from("."))
}

/// Location of the config file used when none is given explicitly.
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the SQLite cache database.
    pub database: PathBuf,
    pub media: MediaConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Directory holding on-disk media blobs.
    pub root: PathBuf,
    pub layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Number of media records fetched per query.
    pub page_size: u64,
    /// Compression method of each archive entry.
    pub compression: Compression,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = data_dir();
        Self {
            database: data_dir.join("cache.sqlite"),
            media: MediaConfig { root: data_dir.join("media"), layout: Layout::default() },
            export: ExportConfig::default(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Config::default().media
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { page_size: DEFAULT_PAGE_SIZE, compression: Compression::default() }
    }
}

/// Values given on the command line; `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub database: Option<PathBuf>,
    pub media_root: Option<PathBuf>,
    pub page_size: Option<u64>,
    pub compression: Option<Compression>,
}

impl Overrides {
    fn apply(&self, mut figment: Figment) -> Figment {
        if let Some(database) = &self.database {
            figment = figment.merge(Serialized::default("database", database));
        }
        if let Some(root) = &self.media_root {
            figment = figment.merge(Serialized::default("media.root", root));
        }
        if let Some(page_size) = self.page_size {
            figment = figment.merge(Serialized::default("export.page_size", page_size));
        }
        if let Some(compression) = self.compression {
            figment = figment.merge(Serialized::default("export.compression", compression));
        }
        figment
    }
}

impl Config {
    /// Load the layered configuration.
    ///
    /// An explicit `file` must exist; the default config file is optional.
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let figment = Self::figment(file)?;
        let config: Self = overrides.apply(figment).extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Defaults, file and environment layers, without command-line overrides.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        match file {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => figment = Self::merge_file(figment, path)?,
            None => {
                if let Some(path) = default_config_path().filter(|path| path.is_file()) {
                    figment = Self::merge_file(figment, &path)?;
                }
            },
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
        tracing::debug!(path = %path.display(), "reading config file");
        let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
        Ok(match extension.as_deref() {
            Some("toml") => figment.merge(Toml::file_exact(path)),
            Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
            Some("json") => figment.merge(Json::file_exact(path)),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
        })
    }

    /// Check values that deserialize fine but can't be used.
    pub fn validate(&self) -> Result<()> {
        if self.export.page_size == 0 {
            exn::bail!(ErrorKind::Invalid("export.page_size must be greater than zero".to_string()));
        }
        if self.database.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("database path must not be empty".to_string()));
        }
        if self.media.root.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("media.root must not be empty".to_string()));
        }
        Ok(())
    }
}
