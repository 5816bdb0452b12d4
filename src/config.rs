//! Configuration types for the taskmate server.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::clock::parse_utc_offset;
use crate::error::{Result, TaskError};

/// Environment variables that override secrets from the config file.
pub const ENV_OPENAI_API_KEY: &str = "TASKMATE_OPENAI_API_KEY";
pub const ENV_TWILIO_ACCOUNT_SID: &str = "TASKMATE_TWILIO_ACCOUNT_SID";
pub const ENV_TWILIO_AUTH_TOKEN: &str = "TASKMATE_TWILIO_AUTH_TOKEN";
pub const ENV_RESEND_API_KEY: &str = "TASKMATE_RESEND_API_KEY";
pub const ENV_CRON_TOKEN: &str = "TASKMATE_CRON_TOKEN";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener and cron trigger.
    pub server: ServerConfig,
    /// Language-understanding service.
    pub llm: LlmConfig,
    /// WhatsApp delivery through Twilio.
    pub twilio: TwilioConfig,
    /// Reminder email through Resend.
    pub email: EmailConfig,
    /// Task and account database.
    pub store: StoreConfig,
    /// Reminder day boundaries and phone defaults.
    pub reminders: RemindersConfig,
    /// Links embedded in outbound messages.
    pub links: LinksConfig,
    /// Log output.
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Bearer token required on `/cron`. `None` leaves it open.
    pub cron_token: Option<String>,
    /// Seconds between in-process reminder scans. `0` disables the job.
    pub scan_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3000,
            cron_token: None,
            scan_interval_secs: 0,
        }
    }
}

/// OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL without the `/v1` suffix.
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    /// Bound on one extraction call, in seconds.
    pub timeout_secs: u64,
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: crate::extractor::openai::DEFAULT_BASE_URL.to_owned(),
            api_key: String::new(),
            model: crate::extractor::openai::DEFAULT_MODEL.to_owned(),
            temperature: 0.0,
            timeout_secs: 30,
            max_tokens: None,
        }
    }
}

/// Twilio Messages API credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TwilioConfig {
    pub api_base: String,
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number, with or without the `whatsapp:` prefix.
    pub from_number: String,
    /// Per-request timeout for the Messages API.
    pub timeout_secs: u64,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.twilio.com".to_owned(),
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            timeout_secs: 15,
        }
    }
}

/// Resend email API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub enabled: bool,
    pub api_base: String,
    pub api_key: String,
    pub from: String,
    /// Per-request timeout for the emails API.
    pub timeout_secs: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: "https://api.resend.com".to_owned(),
            api_key: String::new(),
            from: "onboarding@resend.dev".to_owned(),
            timeout_secs: 15,
        }
    }
}

impl EmailConfig {
    /// Whether reminder emails can be sent at all.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.enabled && !self.api_key.trim().is_empty()
    }
}

/// SQLite database location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file. `None` uses the platform data directory.
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    /// Configured path, or `<data dir>/taskmate/taskmate.db`.
    #[must_use]
    pub fn resolved_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("taskmate")
            .join("taskmate.db")
    }
}

/// Reminder scheduling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemindersConfig {
    /// Offset defining "today" for scans and the local 09:00 default.
    pub utc_offset: String,
    /// Prepended to account phones stored without a country code.
    pub default_country_code: String,
    /// Bound on one task's reminder dispatch during a scan.
    pub dispatch_timeout_secs: u64,
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            utc_offset: "+00:00".to_owned(),
            default_country_code: "+91".to_owned(),
            dispatch_timeout_secs: 60,
        }
    }
}

impl RemindersConfig {
    /// Parsed [`utc_offset`](Self::utc_offset).
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Config`] for a malformed offset.
    pub fn offset(&self) -> Result<FixedOffset> {
        parse_utc_offset(&self.utc_offset).ok_or_else(|| {
            TaskError::Config(format!(
                "reminders.utc_offset `{}` is not a +HH:MM offset",
                self.utc_offset
            ))
        })
    }
}

/// Links embedded in outbound texts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    /// Task deep links are `<dashboard_url>/<slug>/<id>`.
    pub dashboard_url: String,
    /// Sent to unregistered senders.
    pub registration_url: String,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            dashboard_url: "http://localhost:3000/dashboard".to_owned(),
            registration_url: "http://localhost:3000/dashboard".to_owned(),
        }
    }
}

/// Log output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for daily rolling log files. `None` logs to stderr only.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| TaskError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| TaskError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/taskmate/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("taskmate").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("taskmate")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/taskmate-config/config.toml")
        }
    }

    /// Overlay secrets from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Overlay secrets from `lookup`; blank values are ignored.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_OPENAI_API_KEY) {
            self.llm.api_key = v;
        }
        if let Some(v) = get(ENV_TWILIO_ACCOUNT_SID) {
            self.twilio.account_sid = v;
        }
        if let Some(v) = get(ENV_TWILIO_AUTH_TOKEN) {
            self.twilio.auth_token = v;
        }
        if let Some(v) = get(ENV_RESEND_API_KEY) {
            self.email.api_key = v;
        }
        if let Some(v) = get(ENV_CRON_TOKEN) {
            self.server.cron_token = Some(v);
        }
    }
}

/// Severity of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Warning,
    Error,
}

/// Validation issue surfaced at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub id: String,
    pub title: String,
    pub severity: ConfigSeverity,
    pub summary: String,
}

/// Validate configuration without network calls.
#[must_use]
pub fn validate_config(config: &AppConfig) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();

    if config.llm.api_key.trim().is_empty() {
        issues.push(ConfigIssue {
            id: "llm-missing-api-key".to_owned(),
            title: "Language model API key missing".to_owned(),
            severity: ConfigSeverity::Error,
            summary: format!(
                "Set llm.api_key or {ENV_OPENAI_API_KEY}; every inbound message will fail extraction."
            ),
        });
    }
    if config.llm.timeout_secs == 0 {
        issues.push(ConfigIssue {
            id: "llm-zero-timeout".to_owned(),
            title: "Extraction timeout is zero".to_owned(),
            severity: ConfigSeverity::Error,
            summary: "llm.timeout_secs must be at least 1.".to_owned(),
        });
    }

    if config.twilio.account_sid.trim().is_empty() || config.twilio.auth_token.trim().is_empty() {
        issues.push(ConfigIssue {
            id: "twilio-missing-credentials".to_owned(),
            title: "Twilio credentials missing".to_owned(),
            severity: ConfigSeverity::Error,
            summary: "Acknowledgements and reminders cannot be sent without twilio.account_sid and twilio.auth_token."
                .to_owned(),
        });
    }
    if config.twilio.from_number.trim().is_empty() {
        issues.push(ConfigIssue {
            id: "twilio-missing-from-number".to_owned(),
            title: "Twilio sender number missing".to_owned(),
            severity: ConfigSeverity::Error,
            summary: "Set twilio.from_number to the WhatsApp-enabled sender.".to_owned(),
        });
    }

    if config.email.enabled && config.email.api_key.trim().is_empty() {
        issues.push(ConfigIssue {
            id: "email-missing-api-key".to_owned(),
            title: "Resend API key missing".to_owned(),
            severity: ConfigSeverity::Warning,
            summary: "Reminder emails are skipped until email.api_key is set.".to_owned(),
        });
    }

    if parse_utc_offset(&config.reminders.utc_offset).is_none() {
        issues.push(ConfigIssue {
            id: "reminders-invalid-offset".to_owned(),
            title: "Reminder offset invalid".to_owned(),
            severity: ConfigSeverity::Error,
            summary: format!(
                "reminders.utc_offset `{}` is not a +HH:MM offset.",
                config.reminders.utc_offset
            ),
        });
    }

    if config.links.dashboard_url.trim().is_empty() {
        issues.push(ConfigIssue {
            id: "links-missing-dashboard-url".to_owned(),
            title: "Dashboard URL missing".to_owned(),
            severity: ConfigSeverity::Warning,
            summary: "Reminder links will be relative without links.dashboard_url.".to_owned(),
        });
    }

    if config.server.cron_token.is_none() {
        issues.push(ConfigIssue {
            id: "server-open-cron".to_owned(),
            title: "Cron endpoint is unauthenticated".to_owned(),
            severity: ConfigSeverity::Warning,
            summary: format!("Set server.cron_token or {ENV_CRON_TOKEN} to require a bearer token on /cron."),
        });
    }

    issues
}
