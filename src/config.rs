//! Ambient, process-wide scheduler settings (`dayLearnFirst`,
//! `newSpread`, `collapseTime`, `lastUnburied`), file-backed as an
//! XDG-located TOML document with default-and-write-if-missing semantics.

use std::fs::{create_dir_all, read_to_string, write};
use std::path::PathBuf;

use etcetera::{AppStrategy, AppStrategyArgs, choose_app_strategy};
use serde::{Deserialize, Serialize};
use toml_edit::DocumentMut;

use crate::store::ConfigStore;
use crate::{Error, LibraryError};

#[allow(clippy::missing_panics_doc)]
pub fn get_config_dir() -> PathBuf {
    let crate_name = env!("CARGO_PKG_NAME");
    if cfg!(feature = "testing") {
        let mut tmp_dir = PathBuf::from("/tmp");
        tmp_dir.push(crate_name);
        tmp_dir.push("config");
        create_dir_all(&tmp_dir).unwrap();
        return tmp_dir;
    }
    let strategy: etcetera::app_strategy::Xdg = choose_app_strategy(AppStrategyArgs {
        top_level_domain: "org".to_string(),
        author: crate_name.to_string(),
        app_name: crate_name.to_string(),
    })
    .unwrap();
    strategy.config_dir().push(crate_name);
    create_dir_all(strategy.config_dir()).unwrap();
    strategy.config_dir()
}

#[allow(clippy::missing_panics_doc)]
pub fn get_cache_dir() -> PathBuf {
    let crate_name = env!("CARGO_PKG_NAME");
    if cfg!(feature = "testing") {
        let mut tmp_dir = PathBuf::from("/tmp");
        tmp_dir.push(crate_name);
        tmp_dir.push("cache");
        create_dir_all(&tmp_dir).unwrap();
        return tmp_dir;
    }
    let strategy: etcetera::app_strategy::Xdg = choose_app_strategy(AppStrategyArgs {
        top_level_domain: "org".to_string(),
        author: crate_name.to_string(),
        app_name: crate_name.to_string(),
    })
    .unwrap();
    strategy.cache_dir().push(crate_name);
    create_dir_all(strategy.cache_dir()).unwrap();
    strategy.cache_dir()
}

#[allow(clippy::missing_panics_doc)]
pub fn get_data_dir() -> PathBuf {
    let crate_name = env!("CARGO_PKG_NAME");
    if cfg!(feature = "testing") {
        let mut tmp_dir = PathBuf::from("/tmp");
        tmp_dir.push(crate_name);
        tmp_dir.push("data");
        create_dir_all(&tmp_dir).unwrap();
        return tmp_dir;
    }
    let strategy: etcetera::app_strategy::Xdg = choose_app_strategy(AppStrategyArgs {
        top_level_domain: "org".to_string(),
        author: crate_name.to_string(),
        app_name: crate_name.to_string(),
    })
    .unwrap();
    strategy.data_dir().push(crate_name);
    create_dir_all(strategy.data_dir()).unwrap();
    strategy.data_dir()
}

/// How new cards are interleaved with reviews within a session.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum NewSpread {
    #[default]
    Distribute,
    Last,
    First,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerRuntimeConfig {
    pub day_learn_first: bool,
    pub new_spread: NewSpread,
    pub collapse_time_secs: i64,
    /// Day index of the last global unbury of sibling-buried cards.
    pub last_unburied: i32,
}

impl Default for SchedulerRuntimeConfig {
    fn default() -> Self {
        Self {
            day_learn_first: false,
            new_spread: NewSpread::Distribute,
            collapse_time_secs: 1200,
            last_unburied: 0,
        }
    }
}

fn get_runtime_config_file() -> PathBuf {
    let mut config_file_path = get_data_dir();
    config_file_path.push("scheduler_config.toml");
    config_file_path
}

fn read_runtime_config() -> Result<SchedulerRuntimeConfig, Error> {
    let config_file_path = get_runtime_config_file();
    if !config_file_path.exists() {
        let config = SchedulerRuntimeConfig::default();
        write_runtime_config(&config)?;
        return Ok(config);
    }
    let file_contents = read_to_string(&config_file_path).map_err(|e| Error::Io {
        description: format!("Failed to read {}.", &config_file_path.display()),
        source: e,
    })?;
    let doc = file_contents
        .parse::<DocumentMut>()
        .map_err(|e| Error::Library(LibraryError::StoreError(e.to_string())))?;
    let config: SchedulerRuntimeConfig = toml_edit::de::from_document(doc)
        .map_err(|e| Error::Library(LibraryError::StoreError(e.to_string())))?;
    Ok(config)
}

fn write_runtime_config(config: &SchedulerRuntimeConfig) -> Result<(), Error> {
    let config_file_path = get_runtime_config_file();
    let config_string = toml_edit::ser::to_string_pretty(&config).map_err(|e| {
        Error::Library(LibraryError::StoreError(format!(
            "Failed to serialize config: {}",
            e
        )))
    })?;
    write(&config_file_path, config_string).map_err(|e| Error::Io {
        description: "Failed to write config".to_string(),
        source: e,
    })?;
    Ok(())
}

/// File-backed `ConfigStore`. Reads lazily and rewrites the whole document on
/// every `set_*` call rather than diffing individual keys.
#[derive(Debug, Default)]
pub struct TomlConfigStore;

impl ConfigStore for TomlConfigStore {
    fn get(&self) -> Result<SchedulerRuntimeConfig, Error> {
        read_runtime_config()
    }

    fn set(&self, config: &SchedulerRuntimeConfig) -> Result<(), Error> {
        write_runtime_config(config)
    }
}
