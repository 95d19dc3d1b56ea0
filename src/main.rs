mod logging;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use sysnap::config::{self, Config, load_config, load_config_from_path};
use sysnap::render::{
    SnapshotReport, SortKey, render_features, render_process_table, render_summary,
    sort_processes,
};
use sysnap::{Process, SysInfo};

#[derive(Parser)]
#[command(
    name = "sysnap",
    about = "Print a point-in-time snapshot of CPU, memory and processes"
)]
struct Cli {
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit the snapshot as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Print the process table
    #[arg(long, short = 'p', default_value_t = false)]
    processes: bool,

    /// Only show processes whose name contains this text
    #[arg(long)]
    name: Option<String>,

    /// Only refresh and show these PIDs
    #[arg(long = "pid", value_name = "PID")]
    pids: Vec<u32>,

    /// Maximum number of table rows
    #[arg(long, default_value_t = 15)]
    limit: usize,

    /// Sort order: memory, cpu, pid, name
    #[arg(long, default_value = "memory")]
    sort: String,

    /// Include detected CPU features
    #[arg(long, default_value_t = false)]
    features: bool,

    /// Delay between the two CPU samples used to compute usage
    #[arg(long, default_value_t = 200)]
    sample_ms: u64,

    /// Keep processes that have exited since the previous refresh
    #[arg(long, default_value_t = false)]
    keep_dead: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log as JSON lines on stderr
    #[arg(long, default_value_t = false)]
    log_json: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_json)?;
    let config = load_config_for_cli(&cli);

    let mut sys = SysInfo::with_config(config)?;
    // Per-process CPU usage is a delta, so it needs a sample on each side
    // of the delay.
    if cli.sample_ms > 0 {
        refresh_processes(&mut sys, &cli)?;
        std::thread::sleep(Duration::from_millis(cli.sample_ms));
        sys.refresh_cpu()?;
    }
    sys.refresh_memory()?;
    refresh_processes(&mut sys, &cli)?;

    let mut processes = select_processes(&sys, &cli)?;
    sort_processes(&mut processes, SortKey::from_str_config(&cli.sort));

    let features = cli.features.then(|| sys.cpu_features());
    let show_table = cli.processes || cli.name.is_some() || !cli.pids.is_empty();

    if cli.json {
        let report = SnapshotReport::collect(&sys, processes, features);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let table = show_table.then(|| render_process_table(&processes, cli.limit));
    let report = SnapshotReport::collect(&sys, processes, None);
    println!("{}", render_summary(&report));
    if let Some(features) = &features {
        println!();
        println!("{}", render_features(features));
    }
    if let Some(table) = table {
        println!();
        println!("{table}");
    }
    Ok(())
}

fn refresh_processes(sys: &mut SysInfo, cli: &Cli) -> Result<usize> {
    let observed = if cli.pids.is_empty() {
        sys.refresh_processes(None)?
    } else {
        sys.refresh_processes_specifics(&cli.pids, None, None)?
    };
    Ok(observed)
}

fn select_processes<'a>(sys: &'a SysInfo, cli: &Cli) -> Result<Vec<&'a Process>> {
    let mut selected = match &cli.name {
        Some(pattern) => sys.processes_by_name(pattern),
        None => sys.processes(),
    };
    if !cli.pids.is_empty() {
        selected.retain(|p| cli.pids.contains(&p.pid()));
        if selected.is_empty() && cli.name.is_none() {
            return Err(eyre!("none of the requested PIDs are running"));
        }
    }
    Ok(selected)
}

fn load_config_for_cli(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };

    if cli.keep_dead {
        config.processes.remove_dead_by_default = false;
    }
    if cli.sample_ms > 0 {
        config.general.prime_cpu_on_init = true;
    }

    tracing::debug!(path = ?cli.config.clone().or_else(config::config_path), "config loaded");
    config
}
