use serde::Serialize;
use tracing::debug;

use super::probe::{PlatformProbe, ProbeResult};

/// RAM and swap counters, in bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    pub total: u64,
    pub free: u64,
    pub available: u64,
    pub used: u64,
    pub total_swap: u64,
    pub free_swap: u64,
    pub used_swap: u64,
}

/// System load average.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct LoadAvg {
    /// Average load within one minute.
    pub one: f64,
    /// Average load within five minutes.
    pub five: f64,
    /// Average load within fifteen minutes.
    pub fifteen: f64,
}

/// Memory counters as of the last [`MemorySnapshot::refresh`].
///
/// Reads never refresh implicitly; every accessor returns zero until the
/// first refresh.
#[derive(Debug, Default)]
pub struct MemorySnapshot {
    stats: MemoryStats,
}

impl MemorySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh<P: PlatformProbe + ?Sized>(&mut self, probe: &mut P) -> ProbeResult<()> {
        let _span = tracing::debug_span!("memory.refresh").entered();

        self.stats = probe.read_memory()?;
        debug!(
            total = self.stats.total,
            used = self.stats.used,
            used_swap = self.stats.used_swap,
            "memory refreshed"
        );
        Ok(())
    }

    pub fn stats(&self) -> MemoryStats {
        self.stats
    }

    pub fn total_memory(&self) -> u64 {
        self.stats.total
    }

    pub fn free_memory(&self) -> u64 {
        self.stats.free
    }

    pub fn available_memory(&self) -> u64 {
        self.stats.available
    }

    pub fn used_memory(&self) -> u64 {
        self.stats.used
    }

    pub fn total_swap(&self) -> u64 {
        self.stats.total_swap
    }

    pub fn free_swap(&self) -> u64 {
        self.stats.free_swap
    }

    pub fn used_swap(&self) -> u64 {
        self.stats.used_swap
    }
}
