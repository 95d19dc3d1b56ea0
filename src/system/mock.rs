//! Scripted in-memory probe for tests and benchmarks.
//!
//! The mock keeps a fully populated [`ProcessRecord`] per PID and masks it
//! with the requested [`ProcessRefreshConfig`] on every enumeration, the same
//! way a real probe skips attributes it was not asked for.

use std::collections::{BTreeMap, BTreeSet};

use super::cpu::{Cpu, CpuReadings};
use super::host::HostIdentity;
use super::kill::{Signal, SignalOutcome};
use super::memory::{LoadAvg, MemoryStats};
use super::probe::{PlatformProbe, ProbeError, ProbeResult, Probed, ProcessRecord};
use super::process::{DiskUsage, ProcessStatus};
use super::refresh::ProcessRefreshConfig;

const GIB: u64 = 1024 * 1024 * 1024;

/// A record with every attribute populated, derived deterministically from
/// `pid`.
pub fn full_record(pid: u32, parent: Option<u32>, name: &str) -> ProcessRecord {
    let base = u64::from(pid);
    ProcessRecord {
        pid,
        name: name.to_string(),
        parent,
        status: ProcessStatus::Sleep,
        start_time: 1_700_000_000 + base,
        run_time: 3600 + base,
        session_id: Some(pid),
        memory: Probed::Value(base * 4096),
        virtual_memory: Probed::Value(base * 16_384),
        cpu_usage: Probed::Value((pid % 10) as f32),
        disk_usage: Probed::Value(DiskUsage {
            read_bytes: base,
            written_bytes: base * 2,
            total_read_bytes: base * 100,
            total_written_bytes: base * 200,
        }),
        exe: Probed::Value(format!("/usr/bin/{name}")),
        cwd: Probed::Value("/".to_string()),
        root: Probed::Value("/".to_string()),
        cmd: Probed::Value(vec![name.to_string(), "--daemon".to_string()]),
        environ: Probed::Value(BTreeMap::from([
            ("HOME".to_string(), "/root".to_string()),
            ("PATH".to_string(), "/usr/bin".to_string()),
        ])),
        user_id: Probed::Value("1000".to_string()),
        effective_user_id: Probed::Value("1000".to_string()),
        group_id: Probed::Value("1000".to_string()),
        effective_group_id: Probed::Value("1000".to_string()),
        tasks: Probed::Value(vec![pid]),
    }
}

#[derive(Debug, Default)]
pub struct MockProbe {
    cpus: Vec<Cpu>,
    global_usage: f32,
    memory: MemoryStats,
    host: HostIdentity,
    load: LoadAvg,
    uptime: u64,
    processes: BTreeMap<u32, ProcessRecord>,
    extra_rows: Vec<ProcessRecord>,
    failure: Option<ProbeError>,
    enumerate_calls: usize,
    last_fields: Option<ProcessRefreshConfig>,
    last_filter: Option<Vec<u32>>,
    supported_signals: Option<Vec<Signal>>,
    protected: BTreeSet<u32>,
    signals_sent: Vec<(u32, Signal)>,
}

impl MockProbe {
    /// An empty host: no CPUs, no memory, no processes.
    pub fn new() -> Self {
        Self::default()
    }

    /// A small, fully described host with four cores and a handful of
    /// processes.
    pub fn typical_system() -> Self {
        let cores = (0..4)
            .map(|i| {
                Cpu::new(format!("cpu{i}"), "GenuineIntel", "Mock Xeon @ 3.00GHz")
                    .with_usage(10.0 * (i + 1) as f32)
                    .with_frequency(3000)
            })
            .collect();

        let mut probe = Self::new().with_cpus(cores, 25.0);
        probe.memory = MemoryStats {
            total: 16 * GIB,
            free: 6 * GIB,
            available: 10 * GIB,
            used: 6 * GIB,
            total_swap: 4 * GIB,
            free_swap: 3 * GIB,
            used_swap: GIB,
        };
        probe.host = HostIdentity {
            system_name: Some("MockOS".to_string()),
            os_version: Some("1.0".to_string()),
            long_os_version: Some("MockOS 1.0 (Test)".to_string()),
            host_name: Some("mock-host".to_string()),
            kernel_version: Some("6.1.0-mock".to_string()),
            distribution: "mockos".to_string(),
            boot_time: 1_700_000_000,
            cpu_arch: "x86_64".to_string(),
        };
        probe.load = LoadAvg {
            one: 0.5,
            five: 0.25,
            fifteen: 0.1,
        };
        probe.uptime = 93_784;

        probe.spawn(full_record(1, None, "init"));
        probe.spawn(full_record(120, Some(1), "sshd"));
        probe.spawn(full_record(450, Some(120), "bash"));
        probe.spawn(full_record(451, Some(450), "postgres"));
        probe.spawn(full_record(452, Some(451), "postgres: writer"));
        probe
    }

    pub fn with_cpus(mut self, cores: Vec<Cpu>, global_usage: f32) -> Self {
        self.set_cpus(cores, global_usage);
        self
    }

    pub fn set_cpus(&mut self, cores: Vec<Cpu>, global_usage: f32) {
        self.cpus = cores;
        self.global_usage = global_usage;
    }

    pub fn set_memory(&mut self, memory: MemoryStats) {
        self.memory = memory;
    }

    pub fn set_host(&mut self, host: HostIdentity) {
        self.host = host;
    }

    /// Adds or replaces a process.
    pub fn spawn(&mut self, record: ProcessRecord) {
        self.processes.insert(record.pid, record);
    }

    pub fn exit(&mut self, pid: u32) {
        self.processes.remove(&pid);
    }

    pub fn update(&mut self, pid: u32, change: impl FnOnce(&mut ProcessRecord)) {
        if let Some(record) = self.processes.get_mut(&pid) {
            change(record);
        }
    }

    /// Appends a raw row to the next enumeration, after the regular rows.
    pub fn push_extra_row(&mut self, record: ProcessRecord) {
        self.extra_rows.push(record);
    }

    /// Makes the next fallible probe call return `error`.
    pub fn fail_next(&mut self, error: ProbeError) {
        self.failure = Some(error);
    }

    pub fn set_supported_signals(&mut self, signals: Vec<Signal>) {
        self.supported_signals = Some(signals);
    }

    /// Makes every signal sent to `pid` fail.
    pub fn protect(&mut self, pid: u32) {
        self.protected.insert(pid);
    }

    pub fn enumerate_calls(&self) -> usize {
        self.enumerate_calls
    }

    pub fn last_fields(&self) -> Option<ProcessRefreshConfig> {
        self.last_fields
    }

    pub fn last_filter(&self) -> Option<&[u32]> {
        self.last_filter.as_deref()
    }

    pub fn signals_sent(&self) -> &[(u32, Signal)] {
        &self.signals_sent
    }

    fn check_failure(&mut self) -> ProbeResult<()> {
        match self.failure.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl PlatformProbe for MockProbe {
    fn enumerate_cpus(&mut self) -> ProbeResult<CpuReadings> {
        self.check_failure()?;
        Ok(CpuReadings {
            cores: self.cpus.clone(),
            global_usage: self.global_usage,
        })
    }

    fn enumerate_processes(
        &mut self,
        filter: Option<&[u32]>,
        fields: &ProcessRefreshConfig,
    ) -> ProbeResult<Vec<ProcessRecord>> {
        self.check_failure()?;
        self.enumerate_calls += 1;
        self.last_fields = Some(*fields);
        self.last_filter = filter.map(<[u32]>::to_vec);

        let mut rows: Vec<ProcessRecord> = match filter {
            None => self.processes.values().cloned().collect(),
            Some(pids) => pids
                .iter()
                .filter_map(|pid| self.processes.get(pid).cloned())
                .collect(),
        };
        rows.append(&mut self.extra_rows);
        Ok(rows.into_iter().map(|row| row.masked(fields)).collect())
    }

    fn read_memory(&mut self) -> ProbeResult<MemoryStats> {
        self.check_failure()?;
        Ok(self.memory)
    }

    fn read_host_identity(&self) -> HostIdentity {
        self.host.clone()
    }

    fn uptime(&self) -> u64 {
        self.uptime
    }

    fn read_load_average(&self) -> LoadAvg {
        self.load
    }

    fn send_signal(&mut self, pid: u32, signal: Signal) -> Option<SignalOutcome> {
        if !self.processes.contains_key(&pid) {
            return None;
        }
        if let Some(supported) = &self.supported_signals
            && !supported.contains(&signal)
        {
            return Some(SignalOutcome::Unsupported);
        }
        if self.protected.contains(&pid) {
            return Some(SignalOutcome::Refused);
        }
        self.signals_sent.push((pid, signal));
        Some(SignalOutcome::Delivered)
    }
}
