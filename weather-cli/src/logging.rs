use anyhow::anyhow;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "weather_core=info,weather_cli=info,warn";
const VERBOSE_FILTER: &str = "weather_core=debug,weather_cli=debug,warn";

/// Install the global subscriber. `RUST_LOG` wins over both defaults.
///
/// Logs go to stderr; stdout carries rendered weather only.
pub fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let default = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {e}"))
}
