//! Plain-text and JSON views of a snapshot, used by the `sysnap` binary.

use std::cmp::Ordering;
use std::fmt::Write;

use serde::Serialize;

use crate::format::{format_bytes, format_duration, pad_unicode};
use crate::system::cpu::Cpu;
use crate::system::facade::SysInfo;
use crate::system::host::HostIdentity;
use crate::system::memory::{LoadAvg, MemoryStats};
use crate::system::platform::CpuFeatures;
use crate::system::probe::PlatformProbe;
use crate::system::process::Process;
use crate::system::registry::RefreshReport;

const PID_WIDTH: usize = 7;
const NAME_WIDTH: usize = 20;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortKey {
    Pid,
    #[default]
    Memory,
    Cpu,
    Name,
}

impl SortKey {
    pub fn label(self) -> &'static str {
        match self {
            SortKey::Pid => "pid",
            SortKey::Memory => "memory",
            SortKey::Cpu => "cpu",
            SortKey::Name => "name",
        }
    }

    pub fn from_str_config(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pid" => SortKey::Pid,
            "cpu" => SortKey::Cpu,
            "name" => SortKey::Name,
            _ => SortKey::Memory,
        }
    }
}

/// Orders processes for display. Ties fall back to ascending PID.
pub fn sort_processes(processes: &mut [&Process], key: SortKey) {
    processes.sort_by(|a, b| {
        let primary = match key {
            SortKey::Pid => Ordering::Equal,
            SortKey::Memory => b.memory().cmp(&a.memory()),
            SortKey::Cpu => b.cpu_usage().total_cmp(&a.cpu_usage()),
            SortKey::Name => a.name().cmp(b.name()),
        };
        primary.then_with(|| a.pid().cmp(&b.pid()))
    });
}

/// Everything the binary prints, in one serializable value.
#[derive(Debug, Serialize)]
pub struct SnapshotReport<'a> {
    pub host: &'a HostIdentity,
    pub uptime: u64,
    pub load_average: LoadAvg,
    pub memory: MemoryStats,
    pub global_cpu: &'a Cpu,
    pub cpus: &'a [Cpu],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<CpuFeatures>,
    pub processes: Vec<&'a Process>,
    pub last_refresh: &'a RefreshReport,
}

impl<'a> SnapshotReport<'a> {
    pub fn collect<P: PlatformProbe>(
        sys: &'a SysInfo<P>,
        processes: Vec<&'a Process>,
        features: Option<CpuFeatures>,
    ) -> Self {
        SnapshotReport {
            host: sys.host_identity(),
            uptime: sys.uptime(),
            load_average: sys.load_average(),
            memory: sys.memory_stats(),
            global_cpu: sys.global_cpu_info(),
            cpus: sys.cpus(),
            features,
            processes,
            last_refresh: sys.last_refresh_report(),
        }
    }
}

pub fn render_summary(report: &SnapshotReport<'_>) -> String {
    let host = report.host;
    let unknown = "unknown";
    let mut lines = vec![
        field(
            "Host",
            format!(
                "{} ({})",
                host.host_name.as_deref().unwrap_or(unknown),
                host.long_os_version.as_deref().unwrap_or(unknown)
            ),
        ),
        field("Kernel", host.kernel_version.as_deref().unwrap_or(unknown)),
        field("Arch", &host.cpu_arch),
        field("Uptime", format_duration(report.uptime)),
        field(
            "Load",
            format!(
                "{:.2} {:.2} {:.2}",
                report.load_average.one, report.load_average.five, report.load_average.fifteen
            ),
        ),
        field(
            "CPU",
            format!(
                "{:.1}% across {} cores @ {} MHz",
                report.global_cpu.usage(),
                report.cpus.len(),
                report.global_cpu.frequency()
            ),
        ),
        field(
            "Memory",
            format!(
                "{} / {} (available {})",
                format_bytes(report.memory.used),
                format_bytes(report.memory.total),
                format_bytes(report.memory.available)
            ),
        ),
        field(
            "Swap",
            format!(
                "{} / {}",
                format_bytes(report.memory.used_swap),
                format_bytes(report.memory.total_swap)
            ),
        ),
    ];

    let refresh = report.last_refresh;
    lines.push(field(
        "Processes",
        format!(
            "{} (+{} -{} ~{})",
            refresh.observed,
            refresh.added.len(),
            refresh.removed.len(),
            refresh.updated.len()
        ),
    ));
    lines.join("\n")
}

fn field(label: &str, value: impl AsRef<str>) -> String {
    format!("{:<10} {}", format!("{label}:"), value.as_ref())
}

/// Renders up to `limit` processes as an aligned table.
pub fn render_process_table(processes: &[&Process], limit: usize) -> String {
    let mut out = row("PID", "NAME", "CPU%", "MEM", "STATUS");
    for process in processes.iter().take(limit) {
        out.push('\n');
        out.push_str(&row(
            &process.pid().to_string(),
            process.name(),
            &format!("{:.1}", process.cpu_usage()),
            &format_bytes(process.memory()),
            process.status().label(),
        ));
    }
    if processes.len() > limit {
        let _ = write!(out, "\n... {} more", processes.len() - limit);
    }
    out
}

fn row(pid: &str, name: &str, cpu: &str, mem: &str, status: &str) -> String {
    format!(
        "{pid:<PID_WIDTH$} {} {cpu:>6} {mem:>10} {status}",
        pad_unicode(name, NAME_WIDTH)
    )
}

pub fn render_features(features: &CpuFeatures) -> String {
    let optional = |value: Option<u32>| value.map_or_else(|| "-".to_string(), |v| v.to_string());
    let enabled = features.enabled_flags();
    let flags = if enabled.is_empty() {
        "none".to_string()
    } else {
        enabled.join(" ")
    };
    [
        field("Arch", &features.arch),
        field("Brand", features.brand.as_deref().unwrap_or("unknown")),
        field(
            "Signature",
            format!(
                "family {} model {} stepping {}",
                optional(features.family),
                optional(features.model),
                optional(features.stepping_id)
            ),
        ),
        field("Flags", flags),
    ]
    .join("\n")
}
