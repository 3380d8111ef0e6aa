/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use connector::RequestConfig;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::{fmt, fs};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;
use serde::{Deserialize, Serialize};

pub const CONFIG_DIR_ENV: &str = "MINIJENKINS_CONFIG_DIR";

#[derive(Clone, Copy, Debug, EnumIter, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum ConfigKey {
    ProjectServer,
    ExecutionServer,
    AuthServer,
    SelectedProject,
}

impl ConfigKey {
    /// Environment variable that takes precedence over the stored value.
    pub fn env_var(self) -> Option<&'static str> {
        match self {
            ConfigKey::ProjectServer => Some("MINIJENKINS_PROJECT_SERVICE"),
            ConfigKey::ExecutionServer => Some("MINIJENKINS_EXECUTION_SERVICE"),
            ConfigKey::AuthServer => Some("MINIJENKINS_AUTH_SERVICE"),
            ConfigKey::SelectedProject => None,
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", format!("{:?}", self).to_lowercase())
    }
}

impl std::str::FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::iter()
            .find(|key| key.to_string() == s.to_lowercase())
            .ok_or_else(|| ConfigError::InvalidKey(s.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not find configuration directory")]
    NoConfigDir,
    #[error("invalid key: {0}\nvalid keys are: {keys}", keys = valid_keys())]
    InvalidKey(String),
    #[error("invalid url for {key}: {source}")]
    InvalidUrl {
        key: ConfigKey,
        #[source]
        source: url::ParseError,
    },
    #[error("{key} not set. Use `minijenkins config {key} <url>` to set it.")]
    Missing { key: ConfigKey },
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

fn valid_keys() -> String {
    ConfigKey::iter()
        .map(|key| key.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Config = HashMap<ConfigKey, Option<String>>;

pub fn config_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    let mut config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    config_dir.push("minijenkins");
    Ok(config_dir)
}

fn get_config_file() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let mut config: Config = if path.exists() {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents)?
    } else {
        HashMap::new()
    };

    for config_key in ConfigKey::iter() {
        config.entry(config_key).or_insert(None);
    }

    Ok(config)
}

pub fn save_config_to(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(config_dir) = path.parent() {
        fs::create_dir_all(config_dir).map_err(|source| ConfigError::Io {
            path: config_dir.to_path_buf(),
            source,
        })?;
    }

    let contents = toml::to_string_pretty(config)?;
    fs::write(path, contents).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&get_config_file()?)
}

pub fn save_config(config: &Config) -> Result<(), ConfigError> {
    save_config_to(&get_config_file()?, config)
}

/// Stored value of `key`, with the environment override applied.
pub fn get_value(config: &Config, key: ConfigKey) -> Option<String> {
    let from_env = key
        .env_var()
        .and_then(|var| std::env::var(var).ok())
        .filter(|value| !value.is_empty());

    from_env.or_else(|| config.get(&key).cloned().flatten())
}

pub fn set_get_value(
    key: ConfigKey,
    value: Option<String>,
    quiet: bool,
) -> Result<Option<String>, ConfigError> {
    let mut config = load_config()?;

    if let Some(value) = value {
        if key.env_var().is_some() {
            url::Url::parse(&value).map_err(|source| ConfigError::InvalidUrl { key, source })?;
        }

        config.insert(key, Some(value.clone()));
        save_config(&config)?;

        if !quiet {
            println!("{} set to \"{}\"", key, value);
        }

        return Ok(Some(value));
    }

    let value = get_value(&config, key);

    if !quiet {
        match &value {
            Some(value) => println!("{}", value),
            None => println!("[unset]"),
        }
    }

    Ok(value)
}

pub fn set_get_value_from_string(
    key: String,
    value: Option<String>,
    quiet: bool,
) -> Result<Option<String>, ConfigError> {
    set_get_value(key.parse()?, value, quiet)
}

pub fn unset_value(key: ConfigKey) -> Result<(), ConfigError> {
    let mut config = load_config()?;
    config.insert(key, None);
    save_config(&config)
}

pub fn get_request_config(config: &Config, token: Option<String>) -> Result<RequestConfig, ConfigError> {
    let required = |key: ConfigKey| get_value(config, key).ok_or(ConfigError::Missing { key });

    Ok(RequestConfig {
        project_url: required(ConfigKey::ProjectServer)?,
        execution_url: required(ConfigKey::ExecutionServer)?,
        auth_url: required(ConfigKey::AuthServer)?,
        token,
    })
}
