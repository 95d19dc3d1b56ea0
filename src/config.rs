use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::system::refresh::{ProcessRefreshConfig, RefreshMode};

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub processes: ProcessesConfig,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Refresh the CPU table when the engine is constructed.
    pub prime_cpu_on_init: bool,
    /// Refresh memory counters when the engine is constructed.
    pub prime_memory_on_init: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            prime_cpu_on_init: true,
            prime_memory_on_init: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProcessesConfig {
    /// Used when a process refresh does not say whether to prune dead PIDs.
    pub remove_dead_by_default: bool,
    pub full_refresh: Option<ProcessRefreshConfig>,
    pub specific_refresh: Option<ProcessRefreshConfig>,
}

impl Default for ProcessesConfig {
    fn default() -> Self {
        ProcessesConfig {
            remove_dead_by_default: true,
            full_refresh: None,
            specific_refresh: None,
        }
    }
}

impl Config {
    /// The configured default for a refresh mode, if any.
    pub fn mode_default(&self, mode: RefreshMode) -> Option<ProcessRefreshConfig> {
        match mode {
            RefreshMode::Full => self.processes.full_refresh,
            RefreshMode::Specific => self.processes.specific_refresh,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sysnap").join("config.toml"))
}

pub fn load_config() -> Config {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Config::default(),
    }
}

/// Loads `path`, falling back to defaults when it is missing or invalid.
pub fn load_config_from_path(path: &Path) -> Config {
    match load_config_strict(path) {
        Ok(config) => config,
        Err(ConfigError::Read { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            Config::default()
        }
        Err(err) => {
            warn!(error = %err, "using default config");
            Config::default()
        }
    }
}

/// Loads `path`, reporting any read or parse failure.
pub fn load_config_strict(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = Config::default();
        assert!(config.general.prime_cpu_on_init);
        assert!(!config.general.prime_memory_on_init);
        assert!(config.processes.remove_dead_by_default);
        assert!(config.processes.full_refresh.is_none());
        assert!(config.mode_default(RefreshMode::Specific).is_none());
    }

    #[test]
    fn parse_partial_toml() {
        let toml_str = r#"
[general]
prime_memory_on_init = true
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.general.prime_memory_on_init);
        // Other fields should be defaults
        assert!(config.general.prime_cpu_on_init);
        assert!(config.processes.remove_dead_by_default);
    }

    #[test]
    fn parse_full_toml() {
        let toml_str = r#"
[general]
prime_cpu_on_init = false
prime_memory_on_init = true

[processes]
remove_dead_by_default = false

[processes.full_refresh]
environ = false
cmd = false

[processes.specific_refresh]
environ = true
tasks = true
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(!config.general.prime_cpu_on_init);
        assert!(!config.processes.remove_dead_by_default);

        let full = config.mode_default(RefreshMode::Full).unwrap();
        assert!(!full.cmd);
        assert!(!full.environ);
        assert!(full.memory);

        let specific = config.mode_default(RefreshMode::Specific).unwrap();
        assert!(specific.environ);
        assert!(specific.tasks);
        assert!(!specific.root);
    }

    #[test]
    fn missing_file_returns_default() {
        let config = load_config_from_path(Path::new("/nonexistent/path/config.toml"));
        assert!(config.general.prime_cpu_on_init);
    }

    #[test]
    fn invalid_toml_returns_default() {
        let temp = std::env::temp_dir().join("sysnap_test_invalid.toml");
        std::fs::write(&temp, "this is not valid toml {{{{").unwrap();
        let config = load_config_from_path(&temp);
        assert!(config.processes.remove_dead_by_default);
        let _ = std::fs::remove_file(&temp);
    }

    #[test]
    fn strict_loading_reports_parse_errors() {
        let temp = std::env::temp_dir().join("sysnap_test_strict.toml");
        std::fs::write(&temp, "[processes]\nremove_dead_by_default = \"yes\"").unwrap();
        let err = load_config_strict(&temp).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        let _ = std::fs::remove_file(&temp);
    }

    #[test]
    fn strict_loading_reports_missing_file() {
        let err = load_config_strict(Path::new("/nonexistent/path/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
