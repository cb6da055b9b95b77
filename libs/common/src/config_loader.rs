//! Layered configuration loading
//!
//! Priority (highest to lowest):
//! 1. Environment variables `{SERVICE}_SECTION__KEY`
//! 2. The explicit config file, or `config/{service}.yaml` when none is given
//! 3. `T::default()`

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Unsupported config file format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to load configuration: {0}")]
    Extract(#[from] Box<figment::Error>),
}

impl From<figment::Error> for ConfigLoadError {
    fn from(err: figment::Error) -> Self {
        ConfigLoadError::Extract(Box::new(err))
    }
}

/// Environment variable prefix for a service, e.g. `stovesrv` -> `STOVESRV_`
pub fn env_prefix(service_name: &str) -> String {
    format!("{}_", service_name.to_uppercase().replace('-', "_"))
}

fn file_provider(figment: Figment, path: &Path) -> Result<Figment, ConfigLoadError> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    match extension {
        "toml" => Ok(figment.merge(Toml::file(path))),
        "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
        "json" => Ok(figment.merge(Json::file(path))),
        other => Err(ConfigLoadError::UnsupportedFormat(other.to_string())),
    }
}

/// Load a service configuration
///
/// An explicit `path` must exist; the implicit `config/{service}.yaml` is optional.
pub fn load_config<T>(service_name: &str, path: Option<&Path>) -> Result<T, ConfigLoadError>
where
    T: DeserializeOwned + Serialize + Default,
{
    let mut figment = Figment::from(Serialized::defaults(T::default()));

    match path {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigLoadError::NotFound(path.to_path_buf()));
            }
            info!("Loading configuration from {}", path.display());
            figment = file_provider(figment, path)?;
        },
        None => {
            let default_path = PathBuf::from(format!("config/{}.yaml", service_name));
            if default_path.exists() {
                info!("Loading configuration from {}", default_path.display());
            } else {
                debug!("No config file at {}, using defaults", default_path.display());
            }
            figment = figment.merge(Yaml::file(default_path));
        },
    }

    let prefix = env_prefix(service_name);
    figment = figment.merge(Env::prefixed(&prefix).split("__"));

    Ok(figment.extract()?)
}
