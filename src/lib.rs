//! escalog - a process-local logger that escalates errors
//!
//! Every record is printed on the console and appended to a local log file.
//! Errors are additionally pushed to a Telegram chat and an email inbox, with
//! all three deliveries running concurrently and the caller blocked only until
//! they finish or a deadline passes.
pub mod cli;
pub mod config;
pub mod context;
pub mod core;
pub mod dispatcher;
pub mod error;
pub mod formatting;
pub mod logger;
pub mod notification;
pub mod sink;
pub mod task_manager;

// Re-export core types for convenience
pub use crate::core::*;
pub use crate::error::{MetaError, NotifyError};
pub use crate::logger::{Logger, LoggerBuilder};
