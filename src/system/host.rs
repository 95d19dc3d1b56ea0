use serde::Serialize;

/// Host identity strings, read once when a [`SysInfo`](super::facade::SysInfo)
/// is constructed. Each field is `None` when the platform cannot supply it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HostIdentity {
    pub system_name: Option<String>,
    pub os_version: Option<String>,
    pub long_os_version: Option<String>,
    pub host_name: Option<String>,
    pub kernel_version: Option<String>,
    /// Distribution id such as `ubuntu` or `macos`.
    pub distribution: String,
    /// Boot time in seconds since the Unix epoch.
    pub boot_time: u64,
    pub cpu_arch: String,
}
