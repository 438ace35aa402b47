//! The escalation dispatcher: fans an error record out to every channel and
//! waits for the attempts under a deadline.
//!
//! The fan-out runs on a runtime owned by the dispatcher, so the calling
//! thread can block on the result whether or not it is itself inside an async
//! runtime. The caller only ever waits on a std channel.

use crate::context::LoggerContext;
use crate::core::{Alert, Channel, ChannelOutcome, DispatchReport, DispatchState};
use crate::error::MetaError;
use crate::notification::NotifierSlot;
use crate::sink::SinkWriter;
use crate::task_manager::{JoinOutcome, TaskManager};
use std::sync::{mpsc, Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, error, info, instrument, warn};

/// Extra time the caller allows the join itself to report back.
const JOIN_GRACE: Duration = Duration::from_millis(250);

const WORKER_THREADS: usize = 2;

pub struct Dispatcher {
    context: Arc<LoggerContext>,
    sink: SinkWriter,
    chat: NotifierSlot,
    mail: NotifierSlot,
    runtime: OnceLock<Result<Runtime, String>>,
}

impl Dispatcher {
    pub fn new(
        context: Arc<LoggerContext>,
        sink: SinkWriter,
        chat: NotifierSlot,
        mail: NotifierSlot,
    ) -> Self {
        Self {
            context,
            sink,
            chat,
            mail,
            runtime: OnceLock::new(),
        }
    }

    pub fn sink(&self) -> &SinkWriter {
        &self.sink
    }

    /// The background runtime, started on first use.
    fn runtime(&self) -> Result<&Runtime, MetaError> {
        self.runtime
            .get_or_init(|| {
                Builder::new_multi_thread()
                    .worker_threads(WORKER_THREADS)
                    .thread_name("escalog-dispatch")
                    .enable_all()
                    .build()
                    .map_err(|e| e.to_string())
            })
            .as_ref()
            .map_err(|e| MetaError::Dispatch(format!("can't start dispatch runtime: {}", e)))
    }

    /// Runs the sink, chat and mail attempts concurrently and blocks until
    /// all of them finished or the dispatch timeout elapsed.
    ///
    /// The sink append runs alongside the remote channels, under the same
    /// deadline, so a stuck disk cannot hold the caller past the timeout.
    ///
    /// Never fails: every problem is reported on the console.
    #[instrument(skip_all, fields(correlation_id = ?alert.correlation_id))]
    pub fn dispatch(&self, alert: Alert) -> DispatchReport {
        let timeout = self.context.dispatch_timeout();
        let started = Instant::now();
        let alert = Arc::new(alert);

        let runtime = match self.runtime() {
            Ok(runtime) => runtime,
            Err(e) => return self.dispatch_inline(&alert, e),
        };

        let mut tasks = TaskManager::new(runtime.handle().clone());
        {
            let sink = self.sink.clone();
            let context = self.context.clone();
            let alert = alert.clone();
            tasks.spawn_blocking(Channel::Sink, move || {
                sink.append_to_sink(&alert.text, &context, alert.correlation_id.as_deref())
            });
        }
        for (channel, slot) in [(Channel::Chat, &self.chat), (Channel::Mail, &self.mail)] {
            let slot = slot.clone();
            let context = self.context.clone();
            let alert = alert.clone();
            tasks.spawn(channel, async move {
                slot.notify(channel, &alert, &context).await
            });
        }

        let (tx, rx) = mpsc::sync_channel(1);
        let deadline = tokio::time::Instant::from_std(started + timeout);
        let context = self.context.clone();
        let correlation_id = alert.correlation_id.clone();
        runtime.spawn(async move {
            let joined = tasks.join_until(deadline).await;
            let report = into_report(joined, &context, correlation_id.as_deref());
            let _ = tx.send(report);
        });

        match rx.recv_timeout(timeout + JOIN_GRACE) {
            Ok(report) => {
                match report.state {
                    DispatchState::Joined => {
                        debug!(elapsed = ?started.elapsed(), "All channels finished")
                    }
                    DispatchState::TimedOut | DispatchState::Aborted => {
                        warn!(?timeout, "Dispatch returned before every channel finished")
                    }
                }
                report
            }
            Err(e) => {
                self.context.report(
                    &MetaError::Dispatch(format!("join did not complete: {}", e)),
                    alert.correlation_id.as_deref(),
                );
                DispatchReport::new(DispatchState::TimedOut)
            }
        }
    }

    /// Without a runtime only the local sink can be attempted.
    fn dispatch_inline(&self, alert: &Alert, err: MetaError) -> DispatchReport {
        error!(error = %err, "Dispatch runtime unavailable");
        let correlation_id = alert.correlation_id.as_deref();
        self.context.report(&err, correlation_id);

        let mut report = DispatchReport::new(DispatchState::Aborted);
        let outcome = self
            .sink
            .append_to_sink(&alert.text, &self.context, correlation_id);
        report.record(Channel::Sink, outcome);
        report
    }
}

fn into_report(
    joined: JoinOutcome<Channel, ChannelOutcome>,
    context: &LoggerContext,
    correlation_id: Option<&str>,
) -> DispatchReport {
    let state = if joined.timed_out() {
        DispatchState::TimedOut
    } else {
        DispatchState::Joined
    };
    let mut report = DispatchReport::new(state);
    for (channel, outcome) in joined.finished {
        report.record(channel, outcome);
    }
    for channel in joined.failed {
        context.report(
            &MetaError::Dispatch(format!("{} task did not complete", channel)),
            correlation_id,
        );
        report.record(channel, ChannelOutcome::Failed);
    }
    if !joined.pending.is_empty() {
        info!(pending = ?joined.pending, "Leaving channels to finish in the background");
    }
    report
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Abandoned attempts must not block whoever drops the logger.
        if let Some(Ok(runtime)) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
