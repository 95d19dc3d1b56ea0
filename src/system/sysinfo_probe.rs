//! [`PlatformProbe`] backed by the `sysinfo` crate.

use std::collections::BTreeMap;

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tracing::trace;

use super::cpu::{Cpu, CpuReadings};
use super::host::HostIdentity;
use super::kill::{Signal, SignalOutcome};
use super::memory::{LoadAvg, MemoryStats};
use super::probe::{PlatformProbe, ProbeError, ProbeResult, Probed, ProcessRecord};
use super::process::{DiskUsage, ProcessStatus};
use super::refresh::ProcessRefreshConfig;

pub struct SysinfoProbe {
    sys: System,
}

impl SysinfoProbe {
    /// Creates an empty probe. Nothing is read until the first query.
    pub fn new() -> ProbeResult<Self> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(ProbeError::Unsupported(std::env::consts::OS.to_string()));
        }
        Ok(SysinfoProbe { sys: System::new() })
    }

    pub fn system(&self) -> &System {
        &self.sys
    }
}

impl std::fmt::Debug for SysinfoProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SysinfoProbe")
            .field("processes", &self.sys.processes().len())
            .field("cpus", &self.sys.cpus().len())
            .finish()
    }
}

fn refresh_kind(fields: &ProcessRefreshConfig) -> ProcessRefreshKind {
    let mut kind = ProcessRefreshKind::nothing();
    if fields.memory {
        kind = kind.with_memory();
    }
    if fields.cpu {
        kind = kind.with_cpu();
    }
    if fields.disk_usage {
        kind = kind.with_disk_usage();
    }
    if fields.exe {
        kind = kind.with_exe(UpdateKind::OnlyIfNotSet);
    }
    if fields.cmd {
        kind = kind.with_cmd(UpdateKind::Always);
    }
    if fields.environ {
        kind = kind.with_environ(UpdateKind::Always);
    }
    if fields.cwd {
        kind = kind.with_cwd(UpdateKind::Always);
    }
    if fields.root {
        kind = kind.with_root(UpdateKind::OnlyIfNotSet);
    }
    if fields.user {
        kind = kind.with_user(UpdateKind::OnlyIfNotSet);
    }
    if fields.tasks {
        kind = kind.with_tasks();
    }
    kind
}

fn record_from(process: &sysinfo::Process, fields: &ProcessRefreshConfig) -> ProcessRecord {
    let path = |p: Option<&std::path::Path>| p.map(|p| p.to_string_lossy().to_string());

    ProcessRecord {
        pid: process.pid().as_u32(),
        name: process.name().to_string_lossy().to_string(),
        parent: process.parent().map(|p| p.as_u32()),
        status: process.status().into(),
        start_time: process.start_time(),
        run_time: process.run_time(),
        session_id: process.session_id().map(|p| p.as_u32()),
        memory: Probed::when(fields.memory, || Some(process.memory())),
        virtual_memory: Probed::when(fields.memory, || Some(process.virtual_memory())),
        cpu_usage: Probed::when(fields.cpu, || Some(process.cpu_usage())),
        disk_usage: Probed::when(fields.disk_usage, || Some(process.disk_usage().into())),
        exe: Probed::when(fields.exe, || path(process.exe())),
        cwd: Probed::when(fields.cwd, || path(process.cwd())),
        root: Probed::when(fields.root, || path(process.root())),
        // An empty list usually means access was denied, not that it is empty.
        cmd: Probed::when(fields.cmd, || {
            let cmd: Vec<String> = process
                .cmd()
                .iter()
                .map(|s| s.to_string_lossy().to_string())
                .collect();
            (!cmd.is_empty()).then_some(cmd)
        }),
        environ: Probed::when(fields.environ, || {
            let environ = parse_environ(process.environ());
            (!environ.is_empty()).then_some(environ)
        }),
        user_id: Probed::when(fields.user, || {
            process.user_id().map(id_string)
        }),
        effective_user_id: Probed::when(fields.user, || {
            process.effective_user_id().map(id_string)
        }),
        group_id: Probed::when(fields.user, || {
            process.group_id().map(|id| id_string(&id))
        }),
        effective_group_id: Probed::when(fields.user, || {
            process.effective_group_id().map(|id| id_string(&id))
        }),
        tasks: Probed::when(fields.tasks, || {
            process.tasks().map(|tasks| {
                let mut tids: Vec<u32> = tasks.iter().map(|t| t.as_u32()).collect();
                tids.sort_unstable();
                tids
            })
        }),
    }
}

/// Splits `KEY=value` entries. Entries without `=` map to an empty value.
/// Numeric form of a user or group id, e.g. `"1000"`.
fn id_string<T>(id: &T) -> String
where
    T: std::ops::Deref,
    T::Target: ToString,
{
    (**id).to_string()
}

fn parse_environ(entries: &[std::ffi::OsString]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|entry| {
            let entry = entry.to_string_lossy();
            match entry.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (entry.to_string(), String::new()),
            }
        })
        .collect()
}

impl From<sysinfo::ProcessStatus> for ProcessStatus {
    fn from(status: sysinfo::ProcessStatus) -> Self {
        match status {
            sysinfo::ProcessStatus::Idle => ProcessStatus::Idle,
            sysinfo::ProcessStatus::Run => ProcessStatus::Run,
            sysinfo::ProcessStatus::Sleep => ProcessStatus::Sleep,
            sysinfo::ProcessStatus::Stop => ProcessStatus::Stop,
            sysinfo::ProcessStatus::Zombie => ProcessStatus::Zombie,
            sysinfo::ProcessStatus::Tracing => ProcessStatus::Tracing,
            sysinfo::ProcessStatus::Dead => ProcessStatus::Dead,
            sysinfo::ProcessStatus::Wakekill => ProcessStatus::Wakekill,
            sysinfo::ProcessStatus::Waking => ProcessStatus::Waking,
            sysinfo::ProcessStatus::Parked => ProcessStatus::Parked,
            sysinfo::ProcessStatus::LockBlocked => ProcessStatus::LockBlocked,
            sysinfo::ProcessStatus::UninterruptibleDiskSleep => {
                ProcessStatus::UninterruptibleDiskSleep
            }
            _ => ProcessStatus::Unknown,
        }
    }
}

impl From<sysinfo::DiskUsage> for DiskUsage {
    fn from(usage: sysinfo::DiskUsage) -> Self {
        DiskUsage {
            read_bytes: usage.read_bytes,
            written_bytes: usage.written_bytes,
            total_read_bytes: usage.total_read_bytes,
            total_written_bytes: usage.total_written_bytes,
        }
    }
}

fn to_sysinfo_signal(signal: Signal) -> sysinfo::Signal {
    match signal {
        Signal::Hangup => sysinfo::Signal::Hangup,
        Signal::Interrupt => sysinfo::Signal::Interrupt,
        Signal::Quit => sysinfo::Signal::Quit,
        Signal::Illegal => sysinfo::Signal::Illegal,
        Signal::Trap => sysinfo::Signal::Trap,
        Signal::Abort => sysinfo::Signal::Abort,
        Signal::IOT => sysinfo::Signal::IOT,
        Signal::Bus => sysinfo::Signal::Bus,
        Signal::FloatingPointException => sysinfo::Signal::FloatingPointException,
        Signal::Kill => sysinfo::Signal::Kill,
        Signal::User1 => sysinfo::Signal::User1,
        Signal::Segv => sysinfo::Signal::Segv,
        Signal::User2 => sysinfo::Signal::User2,
        Signal::Pipe => sysinfo::Signal::Pipe,
        Signal::Alarm => sysinfo::Signal::Alarm,
        Signal::Term => sysinfo::Signal::Term,
        Signal::Child => sysinfo::Signal::Child,
        Signal::Continue => sysinfo::Signal::Continue,
        Signal::Stop => sysinfo::Signal::Stop,
        Signal::TSTP => sysinfo::Signal::TSTP,
        Signal::TTIN => sysinfo::Signal::TTIN,
        Signal::TTOU => sysinfo::Signal::TTOU,
        Signal::Urgent => sysinfo::Signal::Urgent,
        Signal::XCPU => sysinfo::Signal::XCPU,
        Signal::XFSZ => sysinfo::Signal::XFSZ,
        Signal::VirtualAlarm => sysinfo::Signal::VirtualAlarm,
        Signal::Profiling => sysinfo::Signal::Profiling,
        Signal::Winch => sysinfo::Signal::Winch,
        Signal::IO => sysinfo::Signal::IO,
        Signal::Poll => sysinfo::Signal::Poll,
        Signal::Power => sysinfo::Signal::Power,
        Signal::Sys => sysinfo::Signal::Sys,
    }
}

impl PlatformProbe for SysinfoProbe {
    fn enumerate_cpus(&mut self) -> ProbeResult<CpuReadings> {
        self.sys.refresh_cpu_all();
        let cores = self
            .sys
            .cpus()
            .iter()
            .map(|cpu| {
                Cpu::new(cpu.name(), cpu.vendor_id(), cpu.brand())
                    .with_usage(cpu.cpu_usage())
                    .with_frequency(cpu.frequency())
            })
            .collect();
        Ok(CpuReadings {
            cores,
            global_usage: self.sys.global_cpu_usage(),
        })
    }

    fn enumerate_processes(
        &mut self,
        filter: Option<&[u32]>,
        fields: &ProcessRefreshConfig,
    ) -> ProbeResult<Vec<ProcessRecord>> {
        let kind = refresh_kind(fields);
        let records: Vec<ProcessRecord> = match filter {
            None => {
                self.sys
                    .refresh_processes_specifics(ProcessesToUpdate::All, true, kind);
                self.sys
                    .processes()
                    .values()
                    .map(|process| record_from(process, fields))
                    .collect()
            }
            Some(pids) => {
                let pids: Vec<Pid> = pids.iter().copied().map(Pid::from_u32).collect();
                self.sys
                    .refresh_processes_specifics(ProcessesToUpdate::Some(&pids), true, kind);
                pids.iter()
                    .filter_map(|pid| self.sys.process(*pid))
                    .map(|process| record_from(process, fields))
                    .collect()
            }
        };
        trace!(count = records.len(), filtered = filter.is_some(), "enumerated processes");
        Ok(records)
    }

    fn read_memory(&mut self) -> ProbeResult<MemoryStats> {
        self.sys.refresh_memory();
        Ok(MemoryStats {
            total: self.sys.total_memory(),
            free: self.sys.free_memory(),
            available: self.sys.available_memory(),
            used: self.sys.used_memory(),
            total_swap: self.sys.total_swap(),
            free_swap: self.sys.free_swap(),
            used_swap: self.sys.used_swap(),
        })
    }

    fn read_host_identity(&self) -> HostIdentity {
        HostIdentity {
            system_name: System::name(),
            os_version: System::os_version(),
            long_os_version: System::long_os_version(),
            host_name: System::host_name(),
            kernel_version: System::kernel_version(),
            distribution: System::distribution_id(),
            boot_time: System::boot_time(),
            cpu_arch: std::env::consts::ARCH.to_string(),
        }
    }

    fn uptime(&self) -> u64 {
        System::uptime()
    }

    fn read_load_average(&self) -> LoadAvg {
        let load = System::load_average();
        LoadAvg {
            one: load.one,
            five: load.five,
            fifteen: load.fifteen,
        }
    }

    fn send_signal(&mut self, pid: u32, signal: Signal) -> Option<SignalOutcome> {
        let sysinfo_pid = Pid::from_u32(pid);
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[sysinfo_pid]),
            true,
            ProcessRefreshKind::nothing(),
        );
        let process = self.sys.process(sysinfo_pid)?;
        Some(match process.kill_with(to_sysinfo_signal(signal)) {
            Some(true) => SignalOutcome::Delivered,
            Some(false) => SignalOutcome::Refused,
            None => SignalOutcome::Unsupported,
        })
    }
}
