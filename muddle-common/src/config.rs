//! Configuration loading and data folder resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, warn};

/// Default HTTP port when neither CLI, environment nor config file set one
pub const DEFAULT_PORT: u16 = 8787;

/// Environment variable overriding the data folder location
pub const ENV_DATA_FOLDER: &str = "MUDDLE_DATA_FOLDER";

/// Storage backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Key-value table in a SQLite database
    #[default]
    Sqlite,
    /// Single JSON document owned by a writer task
    Json,
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StorageKind::Sqlite),
            "json" => Ok(StorageKind::Json),
            other => Err(Error::Config(format!(
                "Unknown storage backend '{}' (expected 'sqlite' or 'json')",
                other
            ))),
        }
    }
}

impl std::fmt::Display for StorageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageKind::Sqlite => write!(f, "sqlite"),
            StorageKind::Json => write!(f, "json"),
        }
    }
}

/// Optional TOML configuration file (`muddle/config.toml` under the
/// platform config directory). Every field may be omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the persistent store
    #[serde(default)]
    pub data_folder: Option<PathBuf>,
    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,
    /// Storage backend ("sqlite" or "json")
    #[serde(default)]
    pub storage: Option<StorageKind>,
    /// Gemini model used for summaries
    #[serde(default)]
    pub gemini_model: Option<String>,
}

/// Compiled per-platform defaults used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub data_folder: PathBuf,
    pub log_level: &'static str,
}

impl CompiledDefaults {
    /// Get OS-dependent defaults
    pub fn for_current_platform() -> Self {
        let data_folder = if cfg!(target_os = "linux") {
            // ~/.local/share/muddle (or /var/lib/muddle for system-wide)
            dirs::data_local_dir()
                .map(|d| d.join("muddle"))
                .unwrap_or_else(|| PathBuf::from("/var/lib/muddle"))
        } else if cfg!(target_os = "macos") {
            // ~/Library/Application Support/muddle
            dirs::data_dir()
                .map(|d| d.join("muddle"))
                .unwrap_or_else(|| PathBuf::from("/Library/Application Support/muddle"))
        } else if cfg!(target_os = "windows") {
            // %LOCALAPPDATA%\muddle
            dirs::data_local_dir()
                .map(|d| d.join("muddle"))
                .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\muddle"))
        } else {
            PathBuf::from("./muddle_data")
        };

        Self {
            data_folder,
            log_level: "info",
        }
    }
}

/// Data folder resolution, priority order:
/// 1. Command-line argument (handled by the caller)
/// 2. `MUDDLE_DATA_FOLDER` environment variable
/// 3. TOML config file `data_folder` key
/// 4. OS-dependent compiled default (fallback)
#[derive(Debug, Clone, Default)]
pub struct DataFolderResolver;

impl DataFolderResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve the data folder. Never fails: missing configuration falls
    /// through to the compiled default.
    pub fn resolve(&self) -> PathBuf {
        if let Ok(path) = std::env::var(ENV_DATA_FOLDER) {
            if !path.trim().is_empty() {
                debug!("Data folder from {}: {}", ENV_DATA_FOLDER, path);
                return PathBuf::from(path);
            }
        }

        if let Some(config) = load_toml_config() {
            if let Some(folder) = config.data_folder {
                debug!("Data folder from config file: {}", folder.display());
                return folder;
            }
        }

        CompiledDefaults::for_current_platform().data_folder
    }
}

/// Creates the resolved data folder and derives the paths stored inside it
#[derive(Debug, Clone)]
pub struct DataFolderInitializer {
    data_folder: PathBuf,
}

impl DataFolderInitializer {
    pub fn new(data_folder: PathBuf) -> Self {
        Self { data_folder }
    }

    /// Create the data folder if missing; safe to call repeatedly
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_folder)?;
        Ok(())
    }

    /// SQLite database path inside the data folder
    pub fn database_path(&self) -> PathBuf {
        self.data_folder.join("muddle.db")
    }

    /// JSON store document path inside the data folder
    pub fn store_file_path(&self) -> PathBuf {
        self.data_folder.join("store.json")
    }
}

/// Get the configuration file path for the platform, if one exists
fn config_file_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("muddle").join("config.toml"));

    if cfg!(target_os = "linux") {
        // Try ~/.config/muddle/config.toml first, then /etc/muddle/config.toml
        if let Some(path) = user_config {
            if path.exists() {
                return Some(path);
            }
        }
        let system_config = PathBuf::from("/etc/muddle/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
        None
    } else {
        user_config.filter(|p| p.exists())
    }
}

/// Load the optional TOML config file. A missing file is not an error;
/// malformed TOML is reported and ignored.
pub fn load_toml_config() -> Option<TomlConfig> {
    let path = config_file_path()?;

    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return None;
        }
    };

    match toml::from_str::<TomlConfig>(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!("Failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}

/// Gemini credential from the environment: `GEMINI_API_KEY`, falling back
/// to `GOOGLE_API_KEY`
pub fn gemini_api_key_from_env() -> Option<String> {
    ["GEMINI_API_KEY", "GOOGLE_API_KEY"]
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|key| !key.trim().is_empty()))
}
