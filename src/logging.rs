use color_eyre::eyre::{Result, eyre};
use tracing_subscriber::EnvFilter;

fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Installs the global subscriber, writing to stderr. `RUST_LOG` wins over
/// the verbosity count.
pub fn init(verbosity: u8, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sysnap={}", level_for(verbosity))));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = if json {
        builder.with_ansi(false).json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| eyre!("failed to set tracing subscriber: {e}"))
}
