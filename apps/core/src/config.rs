use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dispatch::DEFAULT_LAST_RESORT_ID;

pub const APP_DIR_NAME: &str = "linkroute";
pub const CONFIG_FILE_NAME: &str = "config.toml";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to encode config: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip)]
    pub config_path: PathBuf,
    pub store_db_path: PathBuf,
    pub reference_scheme: String,
    pub self_destination_id: String,
    pub last_resort_destination_id: String,
    pub application_dirs: Vec<PathBuf>,
    pub mimeapps_paths: Vec<PathBuf>,
    pub profile_home: PathBuf,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        let base = stable_app_data_dir();
        Self {
            config_path: base.join(CONFIG_FILE_NAME),
            store_db_path: base.join("routing.sqlite3"),
            reference_scheme: "https".to_string(),
            self_destination_id: "linkroute.desktop".to_string(),
            last_resort_destination_id: DEFAULT_LAST_RESORT_ID.to_string(),
            application_dirs: default_application_dirs(),
            mimeapps_paths: default_mimeapps_paths(),
            profile_home: home_dir().unwrap_or_else(std::env::temp_dir),
            log_level: "info".to_string(),
        }
    }
}

pub fn validate(cfg: &Config) -> Result<(), String> {
    let scheme = cfg.reference_scheme.trim();
    if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c)) {
        return Err("reference_scheme must be a URL scheme such as 'https'".into());
    }

    if cfg.store_db_path.as_os_str().is_empty() {
        return Err("store_db_path is required".into());
    }

    if cfg.self_destination_id.trim().is_empty() {
        return Err("self_destination_id is required".into());
    }

    if !LOG_LEVELS.contains(&cfg.log_level.to_ascii_lowercase().as_str()) {
        return Err(format!(
            "log_level must be one of {}",
            LOG_LEVELS.join(", ")
        ));
    }

    Ok(())
}

/// Loads `path` (or the default config path). A missing file yields defaults.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| stable_app_data_dir().join(CONFIG_FILE_NAME));

    let mut cfg = if config_path.exists() {
        let raw = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Io {
            path: config_path.clone(),
            source,
        })?;
        toml::from_str::<Config>(&raw).map_err(|source| ConfigError::Parse {
            path: config_path.clone(),
            source,
        })?
    } else {
        Config::default()
    };
    cfg.config_path = config_path;

    validate(&cfg).map_err(ConfigError::Invalid)?;
    Ok(cfg)
}

pub fn save(cfg: &Config) -> Result<(), ConfigError> {
    validate(cfg).map_err(ConfigError::Invalid)?;
    if let Some(parent) = cfg.config_path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let encoded = toml::to_string_pretty(cfg)?;
    std::fs::write(&cfg.config_path, encoded).map_err(|source| ConfigError::Io {
        path: cfg.config_path.clone(),
        source,
    })
}

/// `$XDG_DATA_HOME/linkroute`, else `~/.local/share/linkroute`.
pub fn stable_app_data_dir() -> PathBuf {
    data_home()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
}

fn home_dir() -> Option<PathBuf> {
    env_path("HOME")
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn data_home() -> Option<PathBuf> {
    env_path("XDG_DATA_HOME").or_else(|| home_dir().map(|home| home.join(".local/share")))
}

fn config_home() -> Option<PathBuf> {
    env_path("XDG_CONFIG_HOME").or_else(|| home_dir().map(|home| home.join(".config")))
}

fn data_dirs() -> Vec<PathBuf> {
    let raw = std::env::var("XDG_DATA_DIRS")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "/usr/local/share:/usr/share".to_string());
    raw.split(':')
        .filter(|part| !part.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// User entries first so they shadow system entries with the same id.
fn default_application_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(home) = data_home() {
        dirs.push(home.join("applications"));
    }
    dirs.extend(data_dirs().into_iter().map(|dir| dir.join("applications")));
    dirs
}

fn default_mimeapps_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(config) = config_home() {
        paths.push(config.join("mimeapps.list"));
    }
    if let Some(home) = data_home() {
        paths.push(home.join("applications").join("mimeapps.list"));
    }
    paths.push(PathBuf::from("/etc/xdg/mimeapps.list"));
    paths.extend(
        data_dirs()
            .into_iter()
            .map(|dir| dir.join("applications").join("mimeapps.list")),
    );
    paths
}
