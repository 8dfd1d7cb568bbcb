use std::{
    fs,
    path::PathBuf,
    sync::{LazyLock, PoisonError, RwLock},
    time::Duration,
};

use documented::{Documented, DocumentedFields};
use lodestone_utils::{
    fs::write_atomic,
    path::{resolve_path, xdg_config_home, xdg_data_home},
    time::parse_duration,
};
use serde::{Deserialize, Serialize};
use toml_edit::DocumentMut;
use tracing::info;

use crate::{
    annotations::annotate_toml_table,
    error::{ConfigError, Result},
};

const DEFAULT_SERVER_URL: &str = "http://localhost:5000";
const DEFAULT_REQUEST_TIMEOUT: &str = "10s";
const DEFAULT_STALE_AFTER: &str = "1h";

/// Lodestone configuration
#[derive(Debug, Clone, Deserialize, Serialize, Documented, DocumentedFields)]
pub struct Config {
    /// Root directory for all lodestone data.
    /// Default: $XDG_DATA_HOME/lodestone
    pub root_path: Option<String>,

    /// Path of the key-value state file holding the repository registry.
    /// Default: $LODESTONE_ROOT/state.json
    pub state_path: Option<String>,

    /// Directory holding the per-repository listing snapshots.
    /// Default: $LODESTONE_ROOT/cache/repositories
    pub cache_path: Option<String>,

    /// Default directory for downloaded artifacts and icons.
    /// Default: $LODESTONE_ROOT/downloads
    pub downloads_path: Option<String>,

    /// URL of the repository registered on first run.
    /// Default: http://localhost:5000
    pub server_url: Option<String>,

    /// Timeout for listing, detail and icon requests (e.g. 10s, 1m).
    /// Default: 10s
    pub request_timeout: Option<String>,

    /// Age after which a repository's listing is considered stale.
    /// Default: 1h
    pub stale_after: Option<String>,

    /// If true, a checksum mismatch deletes the download and fails it.
    /// Otherwise the mismatch is only reported.
    /// Default: false
    pub strict_checksum: Option<bool>,

    /// If true, repositories are synchronized in parallel.
    /// Default: true
    pub parallel: Option<bool>,
}

pub static CONFIG: LazyLock<RwLock<Option<Config>>> = LazyLock::new(|| RwLock::new(None));

pub static CONFIG_PATH: LazyLock<RwLock<PathBuf>> = LazyLock::new(|| {
    RwLock::new(match std::env::var("LODESTONE_CONFIG") {
        Ok(path_str) => PathBuf::from(path_str),
        Err(_) => xdg_config_home().join("lodestone").join("config.toml"),
    })
});

pub fn init() -> Result<()> {
    let config = Config::new()?;
    let mut global_config = CONFIG.write().unwrap_or_else(PoisonError::into_inner);
    *global_config = Some(config);
    Ok(())
}

pub fn set_config_path(path: PathBuf) {
    *CONFIG_PATH.write().unwrap_or_else(PoisonError::into_inner) = path;
}

pub fn config_path() -> PathBuf {
    CONFIG_PATH
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .to_path_buf()
}

/// Returns the loaded configuration, falling back to defaults before [`init`].
pub fn get_config() -> Config {
    let mut guard = CONFIG.write().unwrap_or_else(PoisonError::into_inner);
    guard.get_or_insert_with(Config::default_config).clone()
}

fn root_default() -> String {
    std::env::var("LODESTONE_ROOT")
        .unwrap_or_else(|_| format!("{}/lodestone", xdg_data_home().display()))
}

impl Config {
    pub fn default_config() -> Self {
        let root = root_default();

        Self {
            state_path: Some(format!("{root}/state.json")),
            cache_path: Some(format!("{root}/cache/repositories")),
            downloads_path: Some(format!("{root}/downloads")),
            root_path: Some(root),

            server_url: Some(DEFAULT_SERVER_URL.to_string()),
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT.to_string()),
            stale_after: Some(DEFAULT_STALE_AFTER.to_string()),
            strict_checksum: Some(false),
            parallel: Some(true),
        }
    }

    /// Loads the configuration file, using defaults when it does not exist.
    pub fn new() -> Result<Self> {
        let config_path = config_path();

        let mut config = match fs::read_to_string(&config_path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default_config(),
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.resolve()?;

        Ok(config)
    }

    /// Validates the loaded values and fills in defaults for omitted fields.
    pub fn resolve(&mut self) -> Result<()> {
        self.server_url
            .get_or_insert_with(|| DEFAULT_SERVER_URL.to_string());
        self.request_timeout
            .get_or_insert_with(|| DEFAULT_REQUEST_TIMEOUT.to_string());
        self.stale_after
            .get_or_insert_with(|| DEFAULT_STALE_AFTER.to_string());
        self.strict_checksum.get_or_insert(false);
        self.parallel.get_or_insert(true);

        if let Some(server_url) = &self.server_url {
            let lower = server_url.to_ascii_lowercase();
            if !(lower.starts_with("http://") || lower.starts_with("https://")) {
                return Err(ConfigError::InvalidServerUrl(server_url.clone()));
            }
        }

        for (field, value) in [
            ("request_timeout", &self.request_timeout),
            ("stale_after", &self.stale_after),
        ] {
            if let Some(value) = value {
                if parse_duration(value).is_none() {
                    return Err(ConfigError::InvalidDuration {
                        field,
                        value: value.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn get_root_path(&self) -> Result<PathBuf> {
        if let Ok(env_path) = std::env::var("LODESTONE_ROOT") {
            return Ok(resolve_path(&env_path)?);
        }
        match &self.root_path {
            Some(root) => Ok(resolve_path(root)?),
            None => Ok(resolve_path(&root_default())?),
        }
    }

    pub fn get_state_path(&self) -> Result<PathBuf> {
        if let Ok(env_path) = std::env::var("LODESTONE_STATE") {
            return Ok(resolve_path(&env_path)?);
        }
        if let Some(state_path) = &self.state_path {
            return Ok(resolve_path(state_path)?);
        }
        Ok(self.get_root_path()?.join("state.json"))
    }

    pub fn get_cache_path(&self) -> Result<PathBuf> {
        if let Ok(env_path) = std::env::var("LODESTONE_CACHE") {
            return Ok(resolve_path(&env_path)?);
        }
        if let Some(cache_path) = &self.cache_path {
            return Ok(resolve_path(cache_path)?);
        }
        Ok(self.get_root_path()?.join("cache").join("repositories"))
    }

    pub fn get_downloads_path(&self) -> Result<PathBuf> {
        if let Some(downloads_path) = &self.downloads_path {
            return Ok(resolve_path(downloads_path)?);
        }
        Ok(self.get_root_path()?.join("downloads"))
    }

    pub fn server_url(&self) -> &str {
        self.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
            .as_deref()
            .and_then(parse_duration)
            .unwrap_or(Duration::from_secs(10))
    }

    /// Staleness threshold in whole seconds.
    pub fn stale_after_secs(&self) -> u64 {
        self.stale_after
            .as_deref()
            .and_then(parse_duration)
            .map_or(3_600, |d| d.as_secs())
    }

    pub fn strict_checksum(&self) -> bool {
        self.strict_checksum.unwrap_or(false)
    }

    pub fn parallel(&self) -> bool {
        self.parallel.unwrap_or(true)
    }

    pub fn to_annotated_document(&self) -> Result<DocumentMut> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut doc = toml_string.parse::<DocumentMut>()?;

        annotate_toml_table::<Config>(doc.as_table_mut(), true)?;

        Ok(doc)
    }
}

/// Writes the default configuration, annotated with field documentation.
///
/// Refuses to overwrite an existing file.
pub fn generate_default_config() -> Result<PathBuf> {
    let config_path = config_path();

    if config_path.exists() {
        return Err(ConfigError::ConfigAlreadyExists);
    }

    let annotated_doc = Config::default_config().to_annotated_document()?;

    write_atomic(&config_path, annotated_doc.to_string().as_bytes())?;
    info!(
        "Default configuration file generated with documentation at: {}",
        config_path.display()
    );
    Ok(config_path)
}
