//! A mock notification channel for testing the dispatcher.

use async_trait::async_trait;
use escalog::notification::Notifier;
use escalog::{Alert, NotifyError};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierBehavior {
    Succeed,
    Fail,
    /// Never completes.
    Hang,
    /// Succeeds after the given delay.
    Delay(Duration),
}

#[derive(Debug)]
pub struct MockNotifier {
    pub attempts: Mutex<usize>,
    pub delivered: Mutex<Vec<Alert>>,
    behavior: NotifierBehavior,
}

impl MockNotifier {
    pub fn new(behavior: NotifierBehavior) -> Self {
        Self {
            attempts: Mutex::new(0),
            delivered: Mutex::new(Vec::new()),
            behavior,
        }
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }

    pub fn delivered(&self) -> Vec<Alert> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        *self.attempts.lock().unwrap() += 1;
        match self.behavior {
            NotifierBehavior::Succeed => {}
            NotifierBehavior::Fail => {
                return Err(NotifyError::Other("mock channel is down".to_string()))
            }
            NotifierBehavior::Hang => std::future::pending::<()>().await,
            NotifierBehavior::Delay(delay) => tokio::time::sleep(delay).await,
        }
        self.delivered.lock().unwrap().push(alert.clone());
        Ok(())
    }
}
