//! escalog - emit a single record through the escalating logger.
//!
//! Useful from shell scripts and cron jobs that want the same console, file,
//! chat and email treatment as the services that link the library.

use anyhow::Result;
use clap::Parser;
use escalog::{
    cli::{Cli, Level},
    config::Config,
    Logger,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = Config::load(&cli)?;

    // Initialize logging. Diagnostics go to stderr, records keep stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let logger = Logger::builder(config).build()?;
    let correlation_id = cli.correlation_id.as_deref();

    match cli.level {
        Level::Info => logger.info(cli.message, correlation_id),
        Level::Warn => logger.warn(cli.message, correlation_id),
        Level::Error => {
            let report = logger.error(cli.message, correlation_id);
            debug!(?report, "Dispatch finished");
        }
    }

    Ok(())
}
