//! Configuration management for escalog
//!
//! This module defines the main `Config` struct and its sub-structs,
//! responsible for holding all logger settings. It uses the `figment`
//! crate to layer defaults, an optional TOML file, environment variables
//! and command-line overrides.

use crate::cli::Cli;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Free-text settings read from the environment as-is, by their legacy name
/// and by their prefixed name. The prefixed name wins.
const VERBATIM_ENV_KEYS: &[(&str, &str, &str)] = &[
    ("LOG_FILENAME", "ESCALOG_SINK__PATH", "sink.path"),
    ("TELEGRAM_BOT_TOKEN", "ESCALOG_TELEGRAM__BOT_TOKEN", "telegram.bot_token"),
    ("TELEGRAM_CHAT_ID", "ESCALOG_TELEGRAM__CHAT_ID", "telegram.chat_id"),
    ("SENDER_GMAIL", "ESCALOG_MAIL__SENDER", "mail.sender"),
    ("SENDER_GMAIL_PASSWORD", "ESCALOG_MAIL__PASSWORD", "mail.password"),
    ("ADMIN_EMAIL", "ESCALOG_MAIL__RECIPIENT", "mail.recipient"),
];

/// The main configuration struct for the logger.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Tag written at the start of every record.
    pub module_tag: String,
    /// How long `error` waits for the fan-out before giving up.
    pub dispatch_timeout_ms: u64,
    /// The tracing filter for the logger's own diagnostics.
    pub log_level: String,
    /// Local append-only log file.
    pub sink: SinkConfig,
    /// Chat-bot channel.
    pub telegram: TelegramConfig,
    /// Email channel.
    pub mail: MailConfig,
}

/// Configuration for the local log file.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct SinkConfig {
    /// File to append to. Relative paths live under the home directory.
    #[serde(deserialize_with = "lenient_string")]
    pub path: Option<String>,
}

/// Configuration for the Telegram bot channel.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct TelegramConfig {
    #[serde(deserialize_with = "lenient_string")]
    pub bot_token: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub chat_id: Option<String>,
    /// Base URL of the Bot API.
    pub api_url: String,
    pub request_timeout_ms: u64,
}

/// Configuration for the email channel.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct MailConfig {
    #[serde(deserialize_with = "lenient_string")]
    pub sender: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub password: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub recipient: Option<String>,
    pub smtp_host: String,
    /// STARTTLS port of the relay.
    pub smtp_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            module_tag: "SERVICE".to_string(),
            dispatch_timeout_ms: 5000,
            log_level: "info".to_string(),
            sink: SinkConfig::default(),
            telegram: TelegramConfig::default(),
            mail: MailConfig::default(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            api_url: "https://api.telegram.org".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            sender: None,
            password: None,
            recipient: None,
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
        }
    }
}

impl Config {
    /// Loads the configuration by layering sources: defaults, file,
    /// environment, and CLI args.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if let Some(path) = &cli.config {
            figment = figment.merge(Toml::file(path));
        }
        // e.g. ESCALOG_DISPATCH_TIMEOUT_MS=2000
        figment = figment.merge(
            Env::prefixed("ESCALOG_")
                .split("__")
                .filter(|key| !is_verbatim_key(key.as_str())),
        );
        let config = verbatim_env(figment).merge(cli.clone()).extract()?;
        Ok(config)
    }

    /// Loads the configuration from the environment only.
    pub fn from_env() -> Result<Self> {
        Self::load(&Cli::default())
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }
}

fn is_verbatim_key(key: &str) -> bool {
    VERBATIM_ENV_KEYS
        .iter()
        .any(|(_, _, path)| key.eq_ignore_ascii_case(path))
}

/// Merges credentials and paths without figment's value parsing, which
/// would turn a password like `007` into the number 7.
fn verbatim_env(mut figment: Figment) -> Figment {
    for (legacy, prefixed, path) in VERBATIM_ENV_KEYS {
        for name in [legacy, prefixed] {
            if let Ok(value) = std::env::var(name) {
                figment = figment.merge(Serialized::default(path, value));
            }
        }
    }
    figment
}

/// Accepts strings, numbers and booleans, and treats empty strings as absent.
///
/// TOML files may write chat ids as numbers.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Signed(i64),
        Unsigned(u64),
        Float(f64),
        Flag(bool),
    }

    let value = Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Signed(n) => n.to_string(),
        Raw::Unsigned(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
        Raw::Flag(b) => b.to_string(),
    });
    Ok(value.filter(|text| !text.trim().is_empty()))
}

// =============================================================================
// Channel group resolution
// =============================================================================

/// Resolution of a group of settings that must be present together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSettings<T> {
    /// No member of the group is set.
    Disabled,
    /// Every member is set.
    Enabled(T),
    /// Some members are set, these are not.
    Incomplete { missing: Vec<&'static str> },
}

/// Fully resolved Telegram target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramTarget {
    pub bot_token: String,
    pub chat_id: String,
    pub api_url: String,
    pub request_timeout: Duration,
}

/// Fully resolved mail relay settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailRelay {
    pub sender: String,
    pub password: String,
    pub recipient: String,
    pub smtp_host: String,
    pub smtp_port: u16,
}

impl SinkConfig {
    /// The absolute file to append to, if any.
    pub fn resolve(&self) -> Option<PathBuf> {
        let path = Path::new(self.path.as_deref()?);
        if path.is_absolute() {
            return Some(path.to_path_buf());
        }
        Some(match dirs::home_dir() {
            Some(home) => home.join(path),
            None => path.to_path_buf(),
        })
    }
}

impl TelegramConfig {
    pub fn resolve(&self) -> ChannelSettings<TelegramTarget> {
        match (&self.bot_token, &self.chat_id) {
            (Some(bot_token), Some(chat_id)) => ChannelSettings::Enabled(TelegramTarget {
                bot_token: bot_token.clone(),
                chat_id: chat_id.clone(),
                api_url: self.api_url.trim_end_matches('/').to_string(),
                request_timeout: Duration::from_millis(self.request_timeout_ms),
            }),
            (None, None) => ChannelSettings::Disabled,
            (token, _) => ChannelSettings::Incomplete {
                missing: vec![if token.is_none() {
                    "telegram.bot_token"
                } else {
                    "telegram.chat_id"
                }],
            },
        }
    }
}

impl MailConfig {
    pub fn resolve(&self) -> ChannelSettings<MailRelay> {
        let members = [
            ("mail.sender", &self.sender),
            ("mail.password", &self.password),
            ("mail.recipient", &self.recipient),
        ];
        let missing: Vec<&'static str> = members
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect();

        match (&self.sender, &self.password, &self.recipient) {
            (Some(sender), Some(password), Some(recipient)) => ChannelSettings::Enabled(MailRelay {
                sender: sender.clone(),
                password: password.clone(),
                recipient: recipient.clone(),
                smtp_host: self.smtp_host.clone(),
                smtp_port: self.smtp_port,
            }),
            _ if missing.len() == members.len() => ChannelSettings::Disabled,
            _ => ChannelSettings::Incomplete { missing },
        }
    }
}
