use std::collections::BTreeMap;

use serde::Serialize;

/// Scheduling state of a process.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum ProcessStatus {
    Idle,
    Run,
    Sleep,
    Stop,
    Zombie,
    Tracing,
    Dead,
    Wakekill,
    Waking,
    Parked,
    LockBlocked,
    UninterruptibleDiskSleep,
    #[default]
    Unknown,
}

impl ProcessStatus {
    pub fn label(self) -> &'static str {
        match self {
            ProcessStatus::Idle => "idle",
            ProcessStatus::Run => "running",
            ProcessStatus::Sleep => "sleeping",
            ProcessStatus::Stop => "stopped",
            ProcessStatus::Zombie => "zombie",
            ProcessStatus::Tracing => "tracing",
            ProcessStatus::Dead => "dead",
            ProcessStatus::Wakekill => "wakekill",
            ProcessStatus::Waking => "waking",
            ProcessStatus::Parked => "parked",
            ProcessStatus::LockBlocked => "lock-blocked",
            ProcessStatus::UninterruptibleDiskSleep => "disk-sleep",
            ProcessStatus::Unknown => "unknown",
        }
    }
}

/// Disk I/O of a process, in bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DiskUsage {
    /// Read since the previous refresh.
    pub read_bytes: u64,
    /// Written since the previous refresh.
    pub written_bytes: u64,
    pub total_read_bytes: u64,
    pub total_written_bytes: u64,
}

/// A process as last seen by the [`ProcessRegistry`](super::registry::ProcessRegistry).
///
/// Attributes excluded from a refresh keep the value of the last refresh that
/// included them.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Process {
    pub(crate) pid: u32,
    pub(crate) name: String,
    pub(crate) parent: Option<u32>,
    pub(crate) status: ProcessStatus,
    pub(crate) start_time: u64,
    pub(crate) run_time: u64,
    pub(crate) session_id: Option<u32>,
    pub(crate) memory: u64,
    pub(crate) virtual_memory: u64,
    pub(crate) cpu_usage: f32,
    pub(crate) disk_usage: DiskUsage,
    pub(crate) exe: Option<String>,
    pub(crate) cwd: Option<String>,
    pub(crate) root: Option<String>,
    pub(crate) cmd: Vec<String>,
    pub(crate) environ: BTreeMap<String, String>,
    pub(crate) user_id: Option<String>,
    pub(crate) effective_user_id: Option<String>,
    pub(crate) group_id: Option<String>,
    pub(crate) effective_group_id: Option<String>,
    pub(crate) tasks: Option<Vec<u32>>,
}

impl Process {
    pub(crate) fn new(pid: u32) -> Self {
        Self {
            pid,
            ..Self::default()
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent PID; `None` for root and orphaned processes.
    pub fn parent(&self) -> Option<u32> {
        self.parent
    }

    pub fn status(&self) -> ProcessStatus {
        self.status
    }

    /// Start time in seconds since the Unix epoch.
    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    /// Seconds the process has been running.
    pub fn run_time(&self) -> u64 {
        self.run_time
    }

    pub fn session_id(&self) -> Option<u32> {
        self.session_id
    }

    /// Resident memory in bytes.
    pub fn memory(&self) -> u64 {
        self.memory
    }

    pub fn virtual_memory(&self) -> u64 {
        self.virtual_memory
    }

    /// CPU usage in percent. May exceed 100 on multi-core hosts.
    pub fn cpu_usage(&self) -> f32 {
        self.cpu_usage
    }

    pub fn disk_usage(&self) -> DiskUsage {
        self.disk_usage
    }

    /// Executable path; `None` for kernel tasks or when access is denied.
    pub fn exe(&self) -> Option<&str> {
        self.exe.as_deref()
    }

    pub fn cwd(&self) -> Option<&str> {
        self.cwd.as_deref()
    }

    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    pub fn cmd(&self) -> &[String] {
        &self.cmd
    }

    pub fn environ(&self) -> &BTreeMap<String, String> {
        &self.environ
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn effective_user_id(&self) -> Option<&str> {
        self.effective_user_id.as_deref()
    }

    pub fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }

    pub fn effective_group_id(&self) -> Option<&str> {
        self.effective_group_id.as_deref()
    }

    /// Thread ids, where the platform lists them.
    pub fn tasks(&self) -> Option<&[u32]> {
        self.tasks.as_deref()
    }
}
