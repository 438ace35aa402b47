//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the `escalog` binary
//! using the `clap` crate. These arguments are parsed at startup and then
//! merged over the configuration from the TOML file and environment variables.

use clap::{Parser, ValueEnum};
use figment::{
    value::{Dict, Map, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Emit one record through the escalating logger.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Module tag written at the start of the record.
    #[arg(short, long, value_name = "TAG")]
    pub module: Option<String>,

    /// How long to wait for notifications, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Correlation id attached to the record.
    #[arg(long, value_name = "ID")]
    pub correlation_id: Option<String>,

    /// Severity of the record.
    #[arg(value_enum, default_value_t = Level::Error)]
    pub level: Level,

    /// The message to log.
    #[arg(default_value = "")]
    pub message: String,
}

/// Severities that can be emitted from the command line.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    #[default]
    Error,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(module) = &self.module {
            dict.insert("module_tag".into(), Value::from(module.clone()));
        }

        if let Some(timeout) = self.timeout_ms {
            dict.insert("dispatch_timeout_ms".into(), Value::from(timeout));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
