//! Point-in-time system information snapshots.
//!
//! [`SysInfo`] owns a CPU table, a memory snapshot and a process registry, and
//! refreshes each of them only when asked. All OS access goes through a
//! [`PlatformProbe`]; [`SysinfoProbe`] is the production implementation.
//!
//! ```no_run
//! use sysnap::SysInfo;
//!
//! let mut sys = SysInfo::new()?;
//! sys.refresh_memory()?;
//! sys.refresh_processes(Some(true))?;
//! println!("{} of {} bytes used", sys.used_memory(), sys.total_memory());
//! if let Some(me) = sys.process_by_pid(std::process::id()) {
//!     println!("{} uses {} bytes", me.name(), me.memory());
//! }
//! # Ok::<(), sysnap::ProbeError>(())
//! ```

pub mod config;
pub mod format;
pub mod render;
pub mod system;

pub use config::Config;
pub use system::cpu::{Cpu, CpuTable};
pub use system::facade::SysInfo;
pub use system::host::HostIdentity;
pub use system::kill::{KillResult, Signal};
pub use system::memory::{LoadAvg, MemorySnapshot, MemoryStats};
pub use system::platform::{CpuFeatureFlags, CpuFeatures, detect_cpu_features};
pub use system::probe::{PlatformProbe, ProbeError, ProbeResult};
pub use system::process::{DiskUsage, Process, ProcessStatus};
pub use system::refresh::{ProcessRefreshConfig, RefreshMode};
pub use system::registry::{ProcessRegistry, RefreshReport};
pub use system::sysinfo_probe::SysinfoProbe;
