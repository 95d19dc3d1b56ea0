//! Platform probe port.
//!
//! The snapshot engine never talks to the OS directly. Every primitive query
//! goes through [`PlatformProbe`], implemented by
//! [`SysinfoProbe`](super::sysinfo_probe::SysinfoProbe) on real hosts and by
//! [`MockProbe`](super::mock::MockProbe) in tests.
//!
//! Missing data is not an error here. A field the platform cannot supply, or
//! one the caller lacks permission to read, comes back as
//! [`Probed::Unavailable`]. Only a broken platform layer yields a
//! [`ProbeError`].

use std::collections::BTreeMap;

use thiserror::Error;

use super::cpu::CpuReadings;
use super::host::HostIdentity;
use super::kill::{Signal, SignalOutcome};
use super::memory::{LoadAvg, MemoryStats};
use super::platform::{CpuFeatures, detect_cpu_features};
use super::process::{DiskUsage, ProcessStatus};
use super::refresh::ProcessRefreshConfig;

/// Errors raised when the platform layer itself fails.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    /// The running OS is not supported by the probe.
    #[error("system information is not supported on {0}")]
    Unsupported(String),

    /// An OS query failed outright.
    #[error("failed to query {what}: {reason}")]
    Query { what: &'static str, reason: String },
}

/// Result type for probe operations.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Outcome of reading one optional process attribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Probed<T> {
    /// The attribute was not requested by the active refresh configuration.
    #[default]
    Skipped,
    /// The attribute was requested but the platform could not supply it.
    Unavailable,
    /// The attribute was read.
    Value(T),
}

impl<T> Probed<T> {
    /// Reads the attribute only when `enabled`, mapping `None` to
    /// [`Probed::Unavailable`].
    pub fn when(enabled: bool, read: impl FnOnce() -> Option<T>) -> Self {
        if !enabled {
            return Probed::Skipped;
        }
        match read() {
            Some(value) => Probed::Value(value),
            None => Probed::Unavailable,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Probed::Skipped)
    }

    pub fn value(self) -> Option<T> {
        match self {
            Probed::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Downgrades a value to [`Probed::Skipped`] when `enabled` is false.
    pub fn masked(self, enabled: bool) -> Self {
        if enabled { self } else { Probed::Skipped }
    }
}

/// One row of a process enumeration.
///
/// Identity and cheap scheduling fields are always present. Every attribute
/// governed by a [`ProcessRefreshConfig`] toggle is a [`Probed`] value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessRecord {
    pub pid: u32,
    pub name: String,
    pub parent: Option<u32>,
    pub status: ProcessStatus,
    pub start_time: u64,
    pub run_time: u64,
    pub session_id: Option<u32>,
    pub memory: Probed<u64>,
    pub virtual_memory: Probed<u64>,
    pub cpu_usage: Probed<f32>,
    pub disk_usage: Probed<DiskUsage>,
    pub exe: Probed<String>,
    pub cwd: Probed<String>,
    pub root: Probed<String>,
    pub cmd: Probed<Vec<String>>,
    pub environ: Probed<BTreeMap<String, String>>,
    pub user_id: Probed<String>,
    pub effective_user_id: Probed<String>,
    pub group_id: Probed<String>,
    pub effective_group_id: Probed<String>,
    pub tasks: Probed<Vec<u32>>,
}

impl ProcessRecord {
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
            ..Self::default()
        }
    }

    /// Drops every attribute the configuration did not ask for.
    pub fn masked(self, fields: &ProcessRefreshConfig) -> Self {
        Self {
            memory: self.memory.masked(fields.memory),
            virtual_memory: self.virtual_memory.masked(fields.memory),
            cpu_usage: self.cpu_usage.masked(fields.cpu),
            disk_usage: self.disk_usage.masked(fields.disk_usage),
            exe: self.exe.masked(fields.exe),
            cwd: self.cwd.masked(fields.cwd),
            root: self.root.masked(fields.root),
            cmd: self.cmd.masked(fields.cmd),
            environ: self.environ.masked(fields.environ),
            user_id: self.user_id.masked(fields.user),
            effective_user_id: self.effective_user_id.masked(fields.user),
            group_id: self.group_id.masked(fields.user),
            effective_group_id: self.effective_group_id.masked(fields.user),
            tasks: self.tasks.masked(fields.tasks),
            ..self
        }
    }
}

/// Port for per-OS primitive queries.
///
/// Methods that refresh OS-side sampling state take `&mut self`; pure reads
/// take `&self`.
pub trait PlatformProbe {
    /// Enumerates every logical core, in OS order, plus the aggregate usage.
    fn enumerate_cpus(&mut self) -> ProbeResult<CpuReadings>;

    /// Enumerates processes, restricted to `filter` when given.
    ///
    /// PIDs in `filter` that no longer exist are simply absent from the
    /// result.
    fn enumerate_processes(
        &mut self,
        filter: Option<&[u32]>,
        fields: &ProcessRefreshConfig,
    ) -> ProbeResult<Vec<ProcessRecord>>;

    /// Reads all memory and swap counters as one group.
    fn read_memory(&mut self) -> ProbeResult<MemoryStats>;

    fn read_host_identity(&self) -> HostIdentity;

    /// Seconds since boot.
    fn uptime(&self) -> u64;

    fn read_load_average(&self) -> LoadAvg;

    fn detect_cpu_features(&self) -> CpuFeatures {
        detect_cpu_features()
    }

    /// Sends `signal` to `pid`. Returns `None` when no such process exists.
    fn send_signal(&mut self, pid: u32, signal: Signal) -> Option<SignalOutcome>;
}
