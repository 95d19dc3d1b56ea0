use serde::Serialize;
use tracing::debug;

use super::probe::{PlatformProbe, ProbeResult};

/// Name given to the aggregate pseudo-core.
pub const GLOBAL_CPU_NAME: &str = "global";

/// One logical core, or the aggregate of all of them.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Cpu {
    name: String,
    usage: f32,
    frequency: u64,
    vendor_id: String,
    brand: String,
}

impl Cpu {
    pub fn new(
        name: impl Into<String>,
        vendor_id: impl Into<String>,
        brand: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            vendor_id: vendor_id.into(),
            brand: brand.into(),
            ..Self::default()
        }
    }

    pub fn with_usage(mut self, usage: f32) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_frequency(mut self, frequency: u64) -> Self {
        self.frequency = frequency;
        self
    }

    /// Usage in percent since the previous CPU refresh.
    pub fn usage(&self) -> f32 {
        self.usage
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Frequency in MHz.
    pub fn frequency(&self) -> u64 {
        self.frequency
    }

    pub fn vendor_id(&self) -> &str {
        &self.vendor_id
    }

    pub fn brand(&self) -> &str {
        &self.brand
    }
}

/// Raw result of a CPU enumeration.
#[derive(Clone, Debug, Default)]
pub struct CpuReadings {
    pub cores: Vec<Cpu>,
    pub global_usage: f32,
}

/// Per-core and aggregate CPU snapshot.
///
/// Every refresh rebuilds the table from scratch, so core count changes on
/// hot-plug or virtualized hosts show up on the next refresh.
#[derive(Debug, Default)]
pub struct CpuTable {
    cores: Vec<Cpu>,
    global: Cpu,
}

impl CpuTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh<P: PlatformProbe + ?Sized>(&mut self, probe: &mut P) -> ProbeResult<()> {
        let _span = tracing::debug_span!("cpu.refresh").entered();

        let readings = probe.enumerate_cpus()?;
        self.global = aggregate(&readings);
        self.cores = readings.cores;

        debug!(
            cores = self.cores.len(),
            usage = self.global.usage,
            "cpu table refreshed"
        );
        Ok(())
    }

    /// Cores as of the last refresh, in OS order. Empty before the first one.
    pub fn cores(&self) -> &[Cpu] {
        &self.cores
    }

    pub fn global_info(&self) -> &Cpu {
        &self.global
    }

    pub fn len(&self) -> usize {
        self.cores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cores.is_empty()
    }
}

fn aggregate(readings: &CpuReadings) -> Cpu {
    let first = readings.cores.first();
    let frequency = if readings.cores.is_empty() {
        0
    } else {
        let total: u64 = readings.cores.iter().map(|cpu| cpu.frequency).sum();
        total / readings.cores.len() as u64
    };

    Cpu {
        name: GLOBAL_CPU_NAME.to_string(),
        usage: readings.global_usage,
        frequency,
        vendor_id: first.map(|cpu| cpu.vendor_id.clone()).unwrap_or_default(),
        brand: first.map(|cpu| cpu.brand.clone()).unwrap_or_default(),
    }
}
