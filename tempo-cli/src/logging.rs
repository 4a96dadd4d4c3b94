//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Filter priority:
//! 1. `--log-level` flag
//! 2. `TEMPO_LOG` environment variable, as `EnvFilter` directives
//!    (e.g. "info", "tempo_core::allocator=debug")
//! 3. `warn`
//!
//! Logs go to stderr so stdout stays clean for JSON output.

use anyhow::Result;
use clap::ValueEnum;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_ENV: &str = "TEMPO_LOG";
const DEFAULT_DIRECTIVE: &str = "warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();

    fmt()
        .with_env_filter(filter_for(cli_level, env.as_deref()))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("init logging: {e}"))?;

    Ok(())
}

/// Unparseable or blank `TEMPO_LOG` values fall back to the default.
fn filter_for(cli_level: Option<LogLevel>, env: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(level.directive());
    }
    env.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}
