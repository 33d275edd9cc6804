//! Configuration loading and root folder resolution
//!
//! Root folder resolution follows a fixed priority order:
//! 1. Command-line argument (highest priority)
//! 2. `ABIBUCH_ROOT_FOLDER` environment variable
//! 3. `root_folder` in the TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing config file is not an error: the server starts with defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "ABIBUCH_ROOT_FOLDER";

/// Environment variable overriding the config file location
pub const CONFIG_FILE_ENV: &str = "ABIBUCH_CONFIG";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "abibuch.db";

/// Upload directory name inside the root folder
pub const UPLOADS_DIR: &str = "uploads";

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5780";
const DEFAULT_SESSION_TTL_HOURS: i64 = 72;
const DEFAULT_ALIAS_TTL_MINUTES: i64 = 120;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_MAX_FREE_PHOTOS: i64 = 5;
const DEFAULT_AUDIT_GROUP_WINDOW_MINUTES: i64 = 10;

/// Logging section of the TOML config
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "abibuch_server=debug")
    pub level: Option<String>,
    /// Optional log file path (stdout when absent)
    pub file: Option<PathBuf>,
}

/// TOML configuration file contents
///
/// Every field is optional. Use the accessor methods for effective values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind_address: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub session_ttl_hours: Option<i64>,
    pub alias_ttl_minutes: Option<i64>,
    pub max_upload_bytes: Option<usize>,
    pub max_free_photos: Option<i64>,
    pub audit_group_window_minutes: Option<i64>,
    /// Secret used to derive the cookie signing key.
    /// When absent a random key is generated per process.
    pub cookie_secret: Option<String>,
}

impl TomlConfig {
    /// Parse config from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file
    ///
    /// A missing file yields defaults with a warning; a malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Config file not found: {} (using defaults)", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        info!("Loaded config file: {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let positive = [
            ("session_ttl_hours", self.session_ttl_hours),
            ("alias_ttl_minutes", self.alias_ttl_minutes),
            ("audit_group_window_minutes", self.audit_group_window_minutes),
        ];
        for (key, value) in positive {
            if let Some(v) = value {
                if v <= 0 {
                    return Err(Error::Config(format!("{} must be positive, got {}", key, v)));
                }
            }
        }
        if let Some(0) = self.max_upload_bytes {
            return Err(Error::Config("max_upload_bytes must be positive".to_string()));
        }
        if let Some(v) = self.max_free_photos {
            if v < 0 {
                return Err(Error::Config(format!("max_free_photos must not be negative, got {}", v)));
            }
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        self.bind_address
            .clone()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string())
    }

    pub fn log_level(&self) -> String {
        self.logging
            .level
            .clone()
            .unwrap_or_else(|| CompiledDefaults::for_current_platform().log_level)
    }

    pub fn session_ttl_hours(&self) -> i64 {
        self.session_ttl_hours.unwrap_or(DEFAULT_SESSION_TTL_HOURS)
    }

    pub fn alias_ttl_minutes(&self) -> i64 {
        self.alias_ttl_minutes.unwrap_or(DEFAULT_ALIAS_TTL_MINUTES)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES)
    }

    pub fn max_free_photos(&self) -> i64 {
        self.max_free_photos.unwrap_or(DEFAULT_MAX_FREE_PHOTOS)
    }

    pub fn audit_group_window_minutes(&self) -> i64 {
        self.audit_group_window_minutes
            .unwrap_or(DEFAULT_AUDIT_GROUP_WINDOW_MINUTES)
    }
}

/// Locate the config file
///
/// Priority: explicit path, then `ABIBUCH_CONFIG`, then the per-user config dir.
pub fn config_file_path(cli_arg: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs::config_dir()
        .map(|d| d.join("abibuch").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("abibuch.toml"))
}

/// Compiled defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .map(|d| d.join("abibuch"))
                .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\abibuch"))
        } else if cfg!(target_os = "macos") {
            dirs::data_dir()
                .map(|d| d.join("abibuch"))
                .unwrap_or_else(|| PathBuf::from("/Library/Application Support/abibuch"))
        } else {
            dirs::data_local_dir()
                .map(|d| d.join("abibuch"))
                .unwrap_or_else(|| PathBuf::from("/var/lib/abibuch"))
        };

        Self {
            root_folder,
            log_level: "info".to_string(),
        }
    }
}

/// Resolves the root folder from CLI, environment, TOML and defaults
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>, config: &TomlConfig) -> Self {
        Self {
            cli_arg,
            toml_root: config.root_folder.clone(),
        }
    }

    pub fn resolve(&self) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        // Priority 3: TOML config file
        if let Some(path) = &self.toml_root {
            return path.clone();
        }

        // Priority 4: OS-dependent compiled default
        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder layout and hands out file locations inside it
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create the root folder and the uploads directory (idempotent)
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        std::fs::create_dir_all(self.uploads_path())?;
        Ok(())
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    pub fn uploads_path(&self) -> PathBuf {
        self.root_folder.join(UPLOADS_DIR)
    }
}
