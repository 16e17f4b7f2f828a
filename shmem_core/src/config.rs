/// Configuration file support for shmem
///
/// Defaults for new segments (permissions, access, failure discipline) can be
/// loaded from TOML or YAML. Supports auto-detection of file format, the
/// `SHMEM_CONFIG` environment variable and multiple search paths.
use crate::error::{ShmError, ShmResult};
use crate::memory::platform::DEFAULT_PERMISSIONS;
use crate::memory::types::{AccessMode, Discipline};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SHMEM_CONFIG";

/// Segment defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShmConfig {
    /// POSIX mode bits for new identities, before umask. Ignored on Windows.
    pub permissions: u32,

    /// Access mode for new mappings
    pub access: AccessMode,

    /// How construction failures are reported
    pub discipline: Discipline,

    /// Warn about names that exceed the portable length
    pub warn_non_portable_names: bool,
}

impl Default for ShmConfig {
    fn default() -> Self {
        Self {
            permissions: DEFAULT_PERMISSIONS,
            access: AccessMode::ReadWrite,
            discipline: Discipline::FailFast,
            warn_non_portable_names: true,
        }
    }
}

impl ShmConfig {
    /// Load config from a file (auto-detect format)
    pub fn from_file<P: AsRef<Path>>(path: P) -> ShmResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ShmError::config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        // Auto-detect format based on extension
        let extension = path.extension().and_then(|s| s.to_str());
        let config = match extension {
            Some("toml") => Self::from_toml(&contents),
            Some("yaml") | Some("yml") => Self::from_yaml(&contents),
            _ => Self::from_toml(&contents).or_else(|_| Self::from_yaml(&contents)),
        }?;

        log::debug!("loaded shmem config from {}", path.display());
        Ok(config)
    }

    /// Parse config from TOML string
    pub fn from_toml(contents: &str) -> ShmResult<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| ShmError::config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()
    }

    /// Parse config from YAML string
    pub fn from_yaml(contents: &str) -> ShmResult<Self> {
        let config: Self = serde_yaml::from_str(contents)
            .map_err(|e| ShmError::config(format!("Failed to parse YAML: {}", e)))?;
        config.validate()
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> ShmResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ShmError::config(format!("Failed to serialize TOML: {}", e)))
    }

    fn validate(self) -> ShmResult<Self> {
        if self.permissions & !0o777 != 0 {
            return Err(ShmError::config(format!(
                "permissions {:#o} contain bits outside 0o777",
                self.permissions
            )));
        }
        Ok(self)
    }

    /// Find and load config file from standard search paths
    ///
    /// Search order:
    /// 1. `$SHMEM_CONFIG`
    /// 2. ./shmem.toml or ./shmem.yaml
    /// 3. ~/.shmem/config.toml or ~/.shmem/config.yaml
    /// 4. /etc/shmem/config.toml or /etc/shmem/config.yaml
    pub fn find_and_load() -> ShmResult<Self> {
        if let Ok(explicit) = std::env::var(CONFIG_ENV_VAR) {
            return Self::from_file(explicit);
        }

        for path in Self::get_search_paths() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(ShmError::config(
            "No config file found in standard locations",
        ))
    }

    /// Like [`find_and_load`](Self::find_and_load), falling back to defaults
    /// when no file is present. A file that exists but does not parse is
    /// still an error.
    pub fn load() -> ShmResult<Self> {
        let explicit = std::env::var_os(CONFIG_ENV_VAR).is_some();
        if explicit || Self::get_search_paths().iter().any(|p| p.exists()) {
            return Self::find_and_load();
        }
        Ok(Self::default())
    }

    /// Get standard config file search paths
    pub fn get_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // Current directory
        paths.push(PathBuf::from("shmem.toml"));
        paths.push(PathBuf::from("shmem.yaml"));
        paths.push(PathBuf::from("shmem.yml"));

        // User config directory (~/.shmem/)
        if let Some(home) = dirs::home_dir() {
            let shmem_dir = home.join(".shmem");
            paths.push(shmem_dir.join("config.toml"));
            paths.push(shmem_dir.join("config.yaml"));
            paths.push(shmem_dir.join("config.yml"));
        }

        // System config directory (/etc/shmem/)
        paths.push(PathBuf::from("/etc/shmem/config.toml"));
        paths.push(PathBuf::from("/etc/shmem/config.yaml"));

        paths
    }
}
