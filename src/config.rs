use config::{Config, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{EtlError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "dl.cfg";

const ENV_PREFIX: &str = "ETL";

/// Storage access credentials. The secret never appears in `Debug` output.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub credential_id: String,
    pub credential_secret: String,
}

impl Credentials {
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            credential_id: id.into(),
            credential_secret: secret.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.credential_id.trim().is_empty() {
            return Err(EtlError::Config("credential_id is missing".to_string()));
        }
        if self.credential_secret.trim().is_empty() {
            return Err(EtlError::Config("credential_secret is missing".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("credential_id", &self.credential_id)
            .field("credential_secret", &"<redacted>")
            .finish()
    }
}

/// Dataset locations relative to the source URI
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetPaths {
    pub catalog_path: String,
    pub log_path: String,
}

impl DatasetPaths {
    pub fn new(catalog_path: impl Into<String>, log_path: impl Into<String>) -> Self {
        Self {
            catalog_path: catalog_path.into(),
            log_path: log_path.into(),
        }
    }
}

/// Run settings, loaded from an INI file (`dl.cfg` by default) and
/// overridden by `ETL__<SECTION>__<KEY>` environment variables:
///
/// ```ini
/// [credentials]
/// credential_id = AKIA...
/// credential_secret = ...
///
/// [paths]
/// catalog_path = song_data/*/*/*/*.json
/// log_path = log_data/*/*/*.json
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub credentials: Credentials,
    pub paths: DatasetPaths,
}

impl Settings {
    /// Load settings from `path` (or the default location) plus environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) if !p.exists() => {
                return Err(EtlError::Config(format!(
                    "config file not found: {}",
                    p.display()
                )));
            }
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path(),
        };

        let mut builder = Config::builder();
        if let Some(ref file) = file {
            info!(path = %file.display(), "loading settings");
            builder = builder.add_source(File::from(file.as_path()).format(FileFormat::Ini));
        }
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings from INI text, without environment overrides
    pub fn from_ini_str(ini: &str) -> Result<Self> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(ini, FileFormat::Ini))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.credentials.validate()?;
        if self.paths.catalog_path.trim().is_empty() {
            return Err(EtlError::Config("catalog_path is missing".to_string()));
        }
        if self.paths.log_path.trim().is_empty() {
            return Err(EtlError::Config("log_path is missing".to_string()));
        }
        Ok(())
    }
}

/// `dl.cfg` in the working directory, else in the platform config directory
fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    ProjectDirs::from("", "", "star-schema-etl")
        .map(|dirs| dirs.config_dir().join(DEFAULT_CONFIG_FILE))
        .filter(|p| p.exists())
}
