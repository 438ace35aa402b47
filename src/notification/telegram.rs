//! A client for sending error records to a Telegram chat.

use crate::config::TelegramTarget;
use crate::core::Alert;
use crate::error::NotifyError;
use crate::notification::Notifier;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, instrument, warn};

/// The rich-text mode requested on the first attempt.
const PARSE_MODE: &str = "Markdown";

/// Body of a `sendMessage` call.
#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
}

/// A client for the Telegram Bot API `sendMessage` method.
pub struct TelegramNotifier {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// Creates a new `TelegramNotifier`.
    pub fn new(target: TelegramTarget) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(target.request_timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/bot{}/sendMessage", target.api_url, target.bot_token),
            chat_id: target.chat_id,
        })
    }

    /// Errors never carry the request URL, since it contains the bot token.
    async fn post(&self, payload: &SendMessage<'_>) -> Result<(), NotifyError> {
        let res = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|e| NotifyError::Http(e.without_url()))?;
        let status = res.status();
        if status.is_success() {
            return Ok(());
        }
        let body = res.text().await.unwrap_or_default();
        Err(NotifyError::Rejected { status, body })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    /// Sends the escaped record as markdown, then the raw record as plain
    /// text if the first attempt is refused.
    #[instrument(skip_all, fields(chat_id = %self.chat_id))]
    async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        let escaped = alert.text.escaped();
        let primary = SendMessage {
            chat_id: &self.chat_id,
            text: &escaped,
            parse_mode: Some(PARSE_MODE),
        };
        let primary_err = match self.post(&primary).await {
            Ok(()) => {
                info!("Sent record to Telegram.");
                return Ok(());
            }
            Err(e) => e,
        };

        warn!(error = %primary_err, "Markdown message refused, retrying as plain text");
        let fallback = SendMessage {
            chat_id: &self.chat_id,
            text: alert.text.as_str(),
            parse_mode: None,
        };
        match self.post(&fallback).await {
            Ok(()) => {
                info!("Sent record to Telegram as plain text.");
                Ok(())
            }
            Err(fallback_err) => Err(NotifyError::FallbackFailed {
                primary: Box::new(primary_err),
                fallback: Box::new(fallback_err),
            }),
        }
    }
}

#[cfg(test)]
mod telegram_notifier_tests {
    use super::*;
    use crate::core::{LogRecord, Message, Severity};
    use serde_json::{json, Value};
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_alert(message: &str) -> Alert {
        let record = LogRecord::new(Severity::Error, "SVC", Message::from(message), None);
        Alert::from_record(&record)
    }

    fn notifier(server: &MockServer) -> TelegramNotifier {
        TelegramNotifier::new(TelegramTarget {
            bot_token: "123:abc".to_string(),
            chat_id: "-100".to_string(),
            api_url: server.uri(),
            request_timeout: Duration::from_millis(500),
        })
        .unwrap()
    }

    async fn received_bodies(server: &MockServer) -> Vec<Value> {
        server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|req| serde_json::from_slice(&req.body).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_primary_attempt_sends_escaped_markdown() {
        // Arrange
        let server = MockServer::start().await;
        let alert = create_test_alert("bad user_id [7]");

        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_partial_json(json!({ "chat_id": "-100", "parse_mode": "Markdown" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        // Act
        let result = notifier(&server).send(&alert).await;

        // Assert
        assert!(result.is_ok());
        let bodies = received_bodies(&server).await;
        assert_eq!(bodies.len(), 1);
        assert!(bodies[0]["text"]
            .as_str()
            .unwrap()
            .ends_with("bad user\\_id \\[7]\n"));
    }

    #[tokio::test]
    async fn test_rejected_markdown_falls_back_to_plain_text() {
        // Arrange
        let server = MockServer::start().await;
        let alert = create_test_alert("unbalanced [ bracket");

        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "parse_mode": "Markdown" })))
            .respond_with(ResponseTemplate::new(400).set_body_string("can't parse entities"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        // Act
        let result = notifier(&server).send(&alert).await;

        // Assert
        assert!(result.is_ok());
        let bodies = received_bodies(&server).await;
        assert_eq!(bodies.len(), 2);
        assert!(bodies[1].get("parse_mode").is_none());
        assert_eq!(bodies[1]["text"].as_str().unwrap(), alert.text.as_str());
    }

    #[tokio::test]
    async fn test_fallback_failure_stops_after_two_calls() {
        // Arrange
        let server = MockServer::start().await;
        let alert = create_test_alert("boom");

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        // Act
        let result = notifier(&server).send(&alert).await;

        // Assert
        let err = result.unwrap_err();
        assert!(err.after_fallback(), "unexpected error: {}", err);
        assert_eq!(received_bodies(&server).await.len(), 2);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_rejection() {
        // Arrange
        let server = MockServer::start().await;
        let alert = create_test_alert("slow");

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        // Act
        let result = notifier(&server).send(&alert).await;

        // Assert
        match result {
            Err(NotifyError::FallbackFailed { primary, fallback }) => {
                assert!(matches!(*primary, NotifyError::Http(ref e) if e.is_timeout()));
                assert!(matches!(*fallback, NotifyError::Http(ref e) if e.is_timeout()));
            }
            other => panic!("expected fallback failure, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_transport_errors_do_not_reveal_bot_token() {
        // Arrange
        let server = MockServer::start().await;
        let alert = create_test_alert("slow");

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        // Act
        let err = notifier(&server).send(&alert).await.unwrap_err();

        // Assert
        assert!(!err.to_string().contains("123:abc"), "token in: {}", err);
        assert!(!format!("{:?}", err).contains("123:abc"), "token in: {:?}", err);
    }
}
