pub mod cpu;
pub mod facade;
pub mod host;
pub mod kill;
pub mod memory;
pub mod mock;
pub mod platform;
pub mod probe;
pub mod process;
pub mod refresh;
pub mod registry;
pub mod sysinfo_probe;
