//! The logging facade used by application code.

use crate::{
    config::Config,
    context::LoggerContext,
    core::{Alert, Console, DispatchReport, Message, Severity, SharedConsole, StdConsole},
    dispatcher::Dispatcher,
    error::NotifyError,
    notification::{
        mail::{MailNotifier, MailTransport},
        telegram::TelegramNotifier,
        Notifier, NotifierSlot,
    },
    sink::{Filesystem, OsFilesystem, SinkWriter},
};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// A logger that writes every record locally and escalates errors to the
/// configured notification channels.
///
/// Construct it once at process start and share it with `Arc`. No method
/// ever fails or panics because of a channel problem.
pub struct Logger {
    context: Arc<LoggerContext>,
    dispatcher: Dispatcher,
}

impl Logger {
    /// Creates a new `LoggerBuilder` to construct a `Logger`.
    pub fn builder(config: Config) -> LoggerBuilder {
        LoggerBuilder::new(config)
    }

    /// Builds a logger from environment variables alone.
    pub fn from_env() -> Result<Self> {
        Self::builder(Config::from_env()?).build()
    }

    /// Sets the tag written at the start of every subsequent record.
    pub fn set_module_tag(&self, name: &str) {
        self.context.set_module_tag(name);
    }

    pub fn module_tag(&self) -> Arc<String> {
        self.context.module_tag()
    }

    /// Sets how long subsequent `error` calls wait for the notification fan-out.
    pub fn set_dispatch_timeout(&self, timeout: Duration) {
        self.context.set_dispatch_timeout(timeout);
    }

    pub fn dispatch_timeout(&self) -> Duration {
        self.context.dispatch_timeout()
    }

    /// Prints an informational record and appends it to the sink.
    pub fn info(&self, message: impl Into<Message>, correlation_id: Option<&str>) {
        self.log_local(Severity::Info, message.into(), correlation_id);
    }

    /// Prints a warning and appends it to the sink.
    pub fn warn(&self, message: impl Into<Message>, correlation_id: Option<&str>) {
        self.log_local(Severity::Warn, message.into(), correlation_id);
    }

    /// Prints an error, then writes it to the sink and every notification
    /// channel concurrently.
    ///
    /// Blocks until every channel finished or the dispatch timeout elapsed,
    /// so callers about to exit do not lose the alert.
    #[instrument(skip_all)]
    pub fn error(&self, message: impl Into<Message>, correlation_id: Option<&str>) -> DispatchReport {
        let record = self
            .context
            .record(Severity::Error, message.into(), correlation_id);
        let alert = Alert::from_record(&record);
        self.context.console().err(alert.text.as_str());
        self.dispatcher.dispatch(alert)
    }

    fn log_local(&self, severity: Severity, message: Message, correlation_id: Option<&str>) {
        let text = self.context.record(severity, message, correlation_id).render();
        self.context.console().out(text.as_str());
        self.dispatcher
            .sink()
            .append_to_sink(&text, &self.context, correlation_id);
    }
}

/// Builder for the logger.
///
/// Allows the console, the filesystem and the remote channels to be
/// replaced, which is how the tests observe the logger from outside.
pub struct LoggerBuilder {
    config: Config,
    console_override: Option<SharedConsole>,
    filesystem_override: Option<Arc<dyn Filesystem>>,
    chat_override: Option<Arc<dyn Notifier>>,
    mail_override: Option<Arc<dyn Notifier>>,
    mail_transport_override: Option<Arc<dyn MailTransport>>,
}

impl LoggerBuilder {
    /// Creates a new `LoggerBuilder` with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            console_override: None,
            filesystem_override: None,
            chat_override: None,
            mail_override: None,
            mail_transport_override: None,
        }
    }

    /// Overrides where records and meta-errors are printed.
    pub fn console_override(mut self, console: Arc<dyn Console>) -> Self {
        self.console_override = Some(console);
        self
    }

    /// Overrides the filesystem used by the sink.
    pub fn filesystem_override(mut self, fs: Arc<dyn Filesystem>) -> Self {
        self.filesystem_override = Some(fs);
        self
    }

    /// Overrides the chat channel, regardless of its configuration.
    pub fn chat_override(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.chat_override = Some(notifier);
        self
    }

    /// Overrides the mail channel, regardless of its configuration.
    pub fn mail_override(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.mail_override = Some(notifier);
        self
    }

    /// Keeps the configured mail channel but delivers through `transport`.
    pub fn mail_transport_override(mut self, transport: Arc<dyn MailTransport>) -> Self {
        self.mail_transport_override = Some(transport);
        self
    }

    /// Resolves the configuration and builds the logger.
    pub fn build(self) -> Result<Logger> {
        let config = self.config;
        let console = self
            .console_override
            .unwrap_or_else(|| Arc::new(StdConsole));
        let context = Arc::new(LoggerContext::new(
            &config.module_tag,
            config.dispatch_timeout(),
            console,
        ));

        let fs = self
            .filesystem_override
            .unwrap_or_else(|| Arc::new(OsFilesystem));
        let sink = SinkWriter::new(config.sink.resolve(), fs);

        let chat = match self.chat_override {
            Some(notifier) => NotifierSlot::Active(notifier),
            None => NotifierSlot::from_settings(config.telegram.resolve(), |target| {
                Ok::<_, NotifyError>(Arc::new(TelegramNotifier::new(target)?) as Arc<dyn Notifier>)
            })?,
        };

        let mail_transport = self.mail_transport_override;
        let mail = match self.mail_override {
            Some(notifier) => NotifierSlot::Active(notifier),
            None => NotifierSlot::from_settings(config.mail.resolve(), |relay| {
                let notifier = match mail_transport {
                    Some(transport) => MailNotifier::with_transport(&relay, transport),
                    None => MailNotifier::new(&relay)?,
                };
                Ok::<_, NotifyError>(Arc::new(notifier) as Arc<dyn Notifier>)
            })?,
        };

        for (name, slot) in [("chat", &chat), ("mail", &mail)] {
            if let NotifierSlot::Misconfigured { missing } = slot {
                warn!(channel = name, ?missing, "Channel is partially configured");
            }
        }
        info!(
            module_tag = %config.module_tag,
            timeout_ms = config.dispatch_timeout_ms,
            sink = ?sink.path(),
            chat = chat.is_active(),
            mail = mail.is_active(),
            "Logger configured"
        );

        Ok(Logger {
            dispatcher: Dispatcher::new(context.clone(), sink, chat, mail),
            context,
        })
    }
}
