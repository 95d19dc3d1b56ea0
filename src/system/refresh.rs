use serde::{Deserialize, Serialize};

/// Which optional process attributes a refresh populates.
///
/// Disabling a toggle saves syscalls and `/proc` reads. It never clears a
/// value captured by an earlier refresh.
///
/// `Default` is the global default, every toggle enabled. A table deserialized
/// with some keys omitted fills them from [`ProcessRefreshConfig::lightweight`]
/// instead, which leaves the heaviest attributes off.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default = "ProcessRefreshConfig::lightweight")]
pub struct ProcessRefreshConfig {
    pub memory: bool,
    pub cpu: bool,
    pub disk_usage: bool,
    pub exe: bool,
    pub cmd: bool,
    pub environ: bool,
    pub cwd: bool,
    pub root: bool,
    pub user: bool,
    pub tasks: bool,
}

impl Default for ProcessRefreshConfig {
    fn default() -> Self {
        Self::everything()
    }
}

impl ProcessRefreshConfig {
    pub fn everything() -> Self {
        Self {
            memory: true,
            cpu: true,
            disk_usage: true,
            exe: true,
            cmd: true,
            environ: true,
            cwd: true,
            root: true,
            user: true,
            tasks: true,
        }
    }

    /// Only identity and scheduling fields.
    pub fn nothing() -> Self {
        Self {
            memory: false,
            cpu: false,
            disk_usage: false,
            exe: false,
            cmd: false,
            environ: false,
            cwd: false,
            root: false,
            user: false,
            tasks: false,
        }
    }

    /// Everything except `environ`, `root` and `tasks`.
    pub fn lightweight() -> Self {
        Self {
            environ: false,
            root: false,
            tasks: false,
            ..Self::everything()
        }
    }

    /// Picks the effective configuration for one refresh call: an explicit
    /// per-call value wins over the refresh-mode default, which wins over
    /// [`ProcessRefreshConfig::everything`].
    pub fn resolve(explicit: Option<Self>, mode_default: Option<Self>) -> Self {
        explicit.or(mode_default).unwrap_or_else(Self::everything)
    }
}

/// The kind of process refresh being resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshMode {
    /// Every process the platform can see.
    Full,
    /// A caller-supplied PID set.
    Specific,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_wins_over_mode_default() {
        let explicit = ProcessRefreshConfig {
            cmd: false,
            ..ProcessRefreshConfig::everything()
        };
        let resolved =
            ProcessRefreshConfig::resolve(Some(explicit), Some(ProcessRefreshConfig::nothing()));
        assert_eq!(resolved, explicit);
    }

    #[test]
    fn mode_default_wins_over_global() {
        let resolved = ProcessRefreshConfig::resolve(None, Some(ProcessRefreshConfig::nothing()));
        assert_eq!(resolved, ProcessRefreshConfig::nothing());
    }

    #[test]
    fn global_default_enables_everything() {
        let resolved = ProcessRefreshConfig::resolve(None, None);
        assert_eq!(resolved, ProcessRefreshConfig::everything());
        assert_eq!(ProcessRefreshConfig::default(), ProcessRefreshConfig::everything());
    }

    #[test]
    fn partial_table_disables_heavy_fields() {
        let config: ProcessRefreshConfig = toml::from_str("cmd = false").unwrap();
        assert!(!config.cmd);
        assert!(config.memory);
        assert!(config.exe);
        assert!(!config.environ);
        assert!(!config.tasks);
        assert!(!config.root);
    }

    #[test]
    fn explicit_keys_override_lightweight_defaults() {
        let config: ProcessRefreshConfig = toml::from_str("environ = true\nmemory = false").unwrap();
        assert!(config.environ);
        assert!(!config.memory);
    }
}
