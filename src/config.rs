// src/config.rs
//
// Static host configuration (casement.toml) and the directories the host
// writes to. Runtime-editable settings live in the config store instead.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "Casement";
const CONFIG_FILE_NAME: &str = "casement.toml";

/// Directories used by the host.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Per-window geometry files
    pub state_dir: PathBuf,
    /// Root for files referenced through the internal file scheme
    pub storage_root: PathBuf,
    /// Isolated webview data directories, one per storage partition
    pub partitions_dir: PathBuf,
}

impl AppPaths {
    /// Resolve the platform directories, falling back to the working directory
    /// when the platform reports none (headless CI).
    pub fn resolve() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME);
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME);
        Self::under(config_dir, data_dir)
    }

    /// Lay out every directory below the given config and data roots.
    pub fn under(config_dir: PathBuf, data_dir: PathBuf) -> Self {
        Self {
            log_dir: data_dir.join("logs"),
            state_dir: data_dir.join("window-state"),
            storage_root: data_dir.join("files"),
            partitions_dir: data_dir.join("partitions"),
            config_dir,
            data_dir,
        }
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    /// Data directory for a storage partition. `persist:` prefixes are
    /// dropped and anything outside `[A-Za-z0-9_-]` becomes `_`.
    pub fn partition_dir(&self, partition: &str) -> PathBuf {
        let name: String = partition
            .trim_start_matches("persist:")
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.partitions_dir.join(name)
    }

    pub fn ensure(&self) -> Result<(), String> {
        for dir in [
            &self.config_dir,
            &self.data_dir,
            &self.log_dir,
            &self.state_dir,
            &self.storage_root,
            &self.partitions_dir,
        ] {
            fs::create_dir_all(dir)
                .map_err(|e| format!("Failed to create {}: {}", dir.display(), e))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShellConfig {
    /// Origin of the frontend dev server; in-place navigation to it is allowed
    #[serde(default = "default_dev_server_url")]
    pub dev_server_url: String,
    /// Extra hosts treated as authentication providers (`*.` wildcards allowed)
    #[serde(default)]
    pub auth_hosts: Vec<String>,
    /// Overrides `AppPaths::storage_root`
    #[serde(default)]
    pub storage_root: Option<PathBuf>,
    /// Ping visible windows to detect a dead content process
    #[serde(default = "default_health_check")]
    pub health_check: bool,
}

fn default_dev_server_url() -> String {
    "http://localhost:1420".to_string()
}

fn default_health_check() -> bool {
    true
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            dev_server_url: default_dev_server_url(),
            auth_hosts: Vec::new(),
            storage_root: None,
            health_check: default_health_check(),
        }
    }
}

impl ShellConfig {
    pub fn parse(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| format!("Failed to parse {}: {}", CONFIG_FILE_NAME, e))
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::parse(&text)
    }
}
