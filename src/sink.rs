//! The durable sink: a local append-only log file.

use crate::context::LoggerContext;
use crate::core::{Channel, ChannelOutcome, RenderedText};
use crate::error::{MetaError, NotifyError};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument};

/// The file operations the sink needs.
pub trait Filesystem: Send + Sync {
    /// Appends `data` to `path`, creating the file if absent, and flushes it
    /// to the device before returning.
    fn append(&self, path: &Path, data: &[u8]) -> io::Result<()>;
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFilesystem;

impl Filesystem for OsFilesystem {
    fn append(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(data)?;
        file.sync_data()
    }
}

/// Appends rendered records to the configured file.
#[derive(Clone)]
pub struct SinkWriter {
    path: Option<PathBuf>,
    fs: Arc<dyn Filesystem>,
}

impl SinkWriter {
    pub fn new(path: Option<PathBuf>, fs: Arc<dyn Filesystem>) -> Self {
        Self { path, fs }
    }

    /// A sink that never touches the filesystem.
    pub fn disabled() -> Self {
        Self::new(None, Arc::new(OsFilesystem))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Appends the text, returning `Skipped` when no file is configured.
    pub fn append(&self, text: &RenderedText) -> Result<ChannelOutcome, NotifyError> {
        let Some(path) = &self.path else {
            return Ok(ChannelOutcome::Skipped);
        };
        self.fs.append(path, text.as_str().as_bytes())?;
        Ok(ChannelOutcome::Delivered)
    }

    /// Appends the text and reports any failure on the console instead of
    /// returning it.
    #[instrument(skip_all, fields(path = ?self.path))]
    pub fn append_to_sink(
        &self,
        text: &RenderedText,
        context: &LoggerContext,
        correlation_id: Option<&str>,
    ) -> ChannelOutcome {
        match self.append(text) {
            Ok(outcome) => {
                debug!(?outcome, "Sink append finished");
                outcome
            }
            Err(source) => {
                context.report(
                    &MetaError::Transport {
                        channel: Channel::Sink,
                        source,
                    },
                    correlation_id,
                );
                ChannelOutcome::Failed
            }
        }
    }
}
