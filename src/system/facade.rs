//! The public entry point tying the snapshot components together.

use tracing::{debug, warn};

use super::cpu::{Cpu, CpuTable};
use super::host::HostIdentity;
use super::kill::{self, KillResult, Signal};
use super::memory::{LoadAvg, MemorySnapshot, MemoryStats};
use super::platform::CpuFeatures;
use super::probe::{PlatformProbe, ProbeResult};
use super::process::Process;
use super::refresh::{ProcessRefreshConfig, RefreshMode};
use super::registry::{ProcessRegistry, RefreshReport};
use super::sysinfo_probe::SysinfoProbe;
use crate::config::Config;

/// Point-in-time view of the host.
///
/// Nothing is re-read behind the caller's back: every accessor returns the
/// state captured by the last matching `refresh_*` call. Host identity is
/// read once at construction; [`uptime`](SysInfo::uptime) and
/// [`load_average`](SysInfo::load_average) are read live.
///
/// Refreshes take `&mut self`, so a refresh can never race a read. Wrap the
/// value in a `Mutex` or `RwLock` to share it between threads.
#[derive(Debug)]
pub struct SysInfo<P: PlatformProbe = SysinfoProbe> {
    probe: P,
    config: Config,
    host: HostIdentity,
    cpus: CpuTable,
    memory: MemorySnapshot,
    registry: ProcessRegistry,
    last_report: RefreshReport,
}

impl SysInfo<SysinfoProbe> {
    /// Creates an engine over the live OS with the default configuration.
    pub fn new() -> ProbeResult<Self> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> ProbeResult<Self> {
        Self::with_probe(SysinfoProbe::new()?, config)
    }
}

impl<P: PlatformProbe> SysInfo<P> {
    /// Creates an engine over `probe`, priming CPU and memory as configured.
    pub fn with_probe(probe: P, config: Config) -> ProbeResult<Self> {
        let host = probe.read_host_identity();
        let mut sys = SysInfo {
            probe,
            config,
            host,
            cpus: CpuTable::new(),
            memory: MemorySnapshot::new(),
            registry: ProcessRegistry::new(),
            last_report: RefreshReport::default(),
        };
        if sys.config.general.prime_cpu_on_init {
            sys.refresh_cpu()?;
        }
        if sys.config.general.prime_memory_on_init {
            sys.refresh_memory()?;
        }
        debug!(
            host = sys.host.host_name.as_deref().unwrap_or("unknown"),
            arch = %sys.host.cpu_arch,
            "system snapshot engine ready"
        );
        Ok(sys)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    pub fn probe_mut(&mut self) -> &mut P {
        &mut self.probe
    }

    pub fn refresh_cpu(&mut self) -> ProbeResult<()> {
        self.cpus.refresh(&mut self.probe).inspect_err(|err| {
            warn!(error = %err, "cpu refresh failed");
        })
    }

    pub fn refresh_memory(&mut self) -> ProbeResult<()> {
        self.memory.refresh(&mut self.probe).inspect_err(|err| {
            warn!(error = %err, "memory refresh failed");
        })
    }

    /// Refreshes CPU, memory and every process with the configured defaults.
    pub fn refresh_all(&mut self) -> ProbeResult<()> {
        self.refresh_cpu()?;
        self.refresh_memory()?;
        self.refresh_processes(None)?;
        Ok(())
    }

    pub fn cpus(&self) -> &[Cpu] {
        self.cpus.cores()
    }

    pub fn global_cpu_info(&self) -> &Cpu {
        self.cpus.global_info()
    }

    /// Detects CPU capabilities. When the detector cannot name the CPU, the
    /// brand of the last CPU refresh is used.
    pub fn cpu_features(&self) -> CpuFeatures {
        let mut features = self.probe.detect_cpu_features();
        if features.brand.is_none() {
            let brand = self.cpus.global_info().brand();
            if !brand.is_empty() {
                features.brand = Some(brand.to_string());
            }
        }
        features
    }

    pub fn memory_stats(&self) -> MemoryStats {
        self.memory.stats()
    }

    pub fn total_memory(&self) -> u64 {
        self.memory.total_memory()
    }

    pub fn free_memory(&self) -> u64 {
        self.memory.free_memory()
    }

    pub fn available_memory(&self) -> u64 {
        self.memory.available_memory()
    }

    pub fn used_memory(&self) -> u64 {
        self.memory.used_memory()
    }

    pub fn total_swap(&self) -> u64 {
        self.memory.total_swap()
    }

    pub fn free_swap(&self) -> u64 {
        self.memory.free_swap()
    }

    pub fn used_swap(&self) -> u64 {
        self.memory.used_swap()
    }

    /// Seconds since boot, read from the OS on every call.
    pub fn uptime(&self) -> u64 {
        self.probe.uptime()
    }

    pub fn boot_time(&self) -> u64 {
        self.host.boot_time
    }

    pub fn system_name(&self) -> Option<&str> {
        self.host.system_name.as_deref()
    }

    pub fn os_version(&self) -> Option<&str> {
        self.host.os_version.as_deref()
    }

    pub fn long_os_version(&self) -> Option<&str> {
        self.host.long_os_version.as_deref()
    }

    pub fn host_name(&self) -> Option<&str> {
        self.host.host_name.as_deref()
    }

    pub fn kernel_version(&self) -> Option<&str> {
        self.host.kernel_version.as_deref()
    }

    pub fn distribution(&self) -> &str {
        &self.host.distribution
    }

    pub fn cpu_arch(&self) -> &str {
        &self.host.cpu_arch
    }

    pub fn host_identity(&self) -> &HostIdentity {
        &self.host
    }

    /// Load averages, read from the OS on every call.
    pub fn load_average(&self) -> LoadAvg {
        self.probe.read_load_average()
    }

    /// Refreshes every process and returns how many were observed.
    ///
    /// `remove_dead` falls back to `processes.remove_dead_by_default`.
    pub fn refresh_processes(&mut self, remove_dead: Option<bool>) -> ProbeResult<usize> {
        let remove_dead = self.remove_dead(remove_dead);
        let fields = ProcessRefreshConfig::resolve(None, self.config.mode_default(RefreshMode::Full));
        let report = self
            .registry
            .refresh_all(&mut self.probe, remove_dead, &fields)
            .inspect_err(|err| warn!(error = %err, "process refresh failed"))?;
        Ok(self.record(report))
    }

    /// Refreshes only `pids` and returns how many of them were observed.
    ///
    /// `fields` overrides the configured default for PID-filtered refreshes.
    pub fn refresh_processes_specifics(
        &mut self,
        pids: &[u32],
        remove_dead: Option<bool>,
        fields: Option<ProcessRefreshConfig>,
    ) -> ProbeResult<usize> {
        let remove_dead = self.remove_dead(remove_dead);
        let fields =
            ProcessRefreshConfig::resolve(fields, self.config.mode_default(RefreshMode::Specific));
        let report = self
            .registry
            .refresh_specific(&mut self.probe, pids, remove_dead, &fields)
            .inspect_err(|err| warn!(error = %err, "process refresh failed"))?;
        Ok(self.record(report))
    }

    /// Every known process, sorted by PID.
    pub fn processes(&self) -> Vec<&Process> {
        self.registry.processes()
    }

    pub fn process_by_pid(&self, pid: u32) -> Option<&Process> {
        self.registry.get(pid)
    }

    /// Processes whose name contains `pattern` (case-sensitive), sorted by PID.
    pub fn processes_by_name(&self, pattern: &str) -> Vec<&Process> {
        self.registry.by_name(pattern)
    }

    /// What the most recent process refresh changed.
    pub fn last_refresh_report(&self) -> &RefreshReport {
        &self.last_report
    }

    /// Sends `signal` to a process known from the last process refresh.
    pub fn kill_process(&mut self, pid: u32, signal: Signal) -> KillResult {
        if self.registry.get(pid).is_none() {
            return KillResult::NotFound(pid);
        }
        let result = kill::kill_process(&mut self.probe, pid, signal);
        debug!(pid, signal = signal.name(), ?result, "signal sent");
        result
    }

    fn remove_dead(&self, explicit: Option<bool>) -> bool {
        explicit.unwrap_or(self.config.processes.remove_dead_by_default)
    }

    fn record(&mut self, report: RefreshReport) -> usize {
        let observed = report.observed;
        self.last_report = report;
        observed
    }
}
