//! Remote notification channels for error records.
//!
//! Each channel sits behind the [`Notifier`] trait so the dispatcher can run
//! them side by side without knowing how they deliver, and so tests can swap
//! in fakes.

pub mod mail;
pub mod telegram;

use crate::context::LoggerContext;
use crate::core::{Alert, Channel, ChannelOutcome};
use crate::config::ChannelSettings;
use crate::error::{MetaError, NotifyError};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// A remote channel an alert can be delivered to.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers the alert. Implementations own their fallback protocol.
    async fn send(&self, alert: &Alert) -> Result<(), NotifyError>;
}

/// A channel as the dispatcher sees it after configuration was resolved.
#[derive(Clone)]
pub enum NotifierSlot {
    Disabled,
    Misconfigured { missing: Vec<&'static str> },
    Active(Arc<dyn Notifier>),
}

impl NotifierSlot {
    /// Builds a slot from resolved settings, constructing the notifier only
    /// when the group is complete.
    pub fn from_settings<T, E>(
        settings: ChannelSettings<T>,
        build: impl FnOnce(T) -> Result<Arc<dyn Notifier>, E>,
    ) -> Result<Self, E> {
        Ok(match settings {
            ChannelSettings::Disabled => Self::Disabled,
            ChannelSettings::Incomplete { missing } => Self::Misconfigured { missing },
            ChannelSettings::Enabled(target) => Self::Active(build(target)?),
        })
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    /// Runs one delivery attempt, turning every failure into a console report.
    #[instrument(skip(self, alert, context))]
    pub async fn notify(
        &self,
        channel: Channel,
        alert: &Alert,
        context: &LoggerContext,
    ) -> ChannelOutcome {
        let correlation_id = alert.correlation_id.as_deref();
        match self {
            Self::Disabled => ChannelOutcome::Skipped,
            Self::Misconfigured { missing } => {
                context.report(
                    &MetaError::Configuration {
                        channel,
                        missing: missing.clone(),
                    },
                    correlation_id,
                );
                ChannelOutcome::Failed
            }
            Self::Active(notifier) => match notifier.send(alert).await {
                Ok(()) => {
                    debug!("Notification delivered");
                    ChannelOutcome::Delivered
                }
                Err(source) => {
                    let outcome = if source.after_fallback() {
                        ChannelOutcome::FailedAfterFallback
                    } else {
                        ChannelOutcome::Failed
                    };
                    context.report(&MetaError::Transport { channel, source }, correlation_id);
                    outcome
                }
            },
        }
    }
}
