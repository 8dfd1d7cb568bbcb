use std::path::PathBuf;

use lodestone_utils::error::{FileSystemError, PathError, UtilsError};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML serialization error: {0}")]
    #[diagnostic(
        code(lodestone_config::toml_serialize),
        help("Check your configuration structure for invalid values")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(lodestone_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Configuration file already exists")]
    #[diagnostic(
        code(lodestone_config::already_exists),
        help("Remove the existing config file or use a different location")
    )]
    ConfigAlreadyExists,

    #[error("Invalid duration for `{field}`: {value}")]
    #[diagnostic(
        code(lodestone_config::invalid_duration),
        help("Use a duration such as `10s`, `30m`, `1h` or `1d2h`")
    )]
    InvalidDuration { field: &'static str, value: String },

    #[error("Invalid server URL: {0}")]
    #[diagnostic(
        code(lodestone_config::invalid_server_url),
        help("The server URL must start with http:// or https://")
    )]
    InvalidServerUrl(String),

    #[error("Failed to parse state file {}: {source}", path.display())]
    #[diagnostic(
        code(lodestone_config::state),
        help("The state file is corrupted. Fix or remove it to start from a fresh state")
    )]
    StateParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize state: {0}")]
    #[diagnostic(code(lodestone_config::state_serialize))]
    StateSerialize(#[source] serde_json::Error),

    #[error("IO error: {0}")]
    #[diagnostic(code(lodestone_config::io))]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(code(lodestone_config::utils))]
    Utils(#[from] UtilsError),

    #[error("Failed to parse TOML: {0}")]
    #[diagnostic(code(lodestone_config::toml))]
    Toml(#[from] toml_edit::TomlError),

    #[error("Encountered unexpected TOML item: {0}")]
    #[diagnostic(code(lodestone_config::unexpected_toml_item))]
    UnexpectedTomlItem(String),
}

impl From<PathError> for ConfigError {
    fn from(err: PathError) -> Self {
        Self::Utils(UtilsError::Path(err))
    }
}

impl From<FileSystemError> for ConfigError {
    fn from(err: FileSystemError) -> Self {
        Self::Utils(UtilsError::FileSystem(err))
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
