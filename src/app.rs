//! Service wiring shared by the HTTP handlers and the periodic job.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};

use crate::assembler::TaskAssembler;
use crate::channels::traits::MessageSender;
use crate::channels::whatsapp::WhatsAppAdapter;
use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::error::{Result, TaskError};
use crate::extractor::{OpenAiLanguageModel, StructuredExtractor};
use crate::identity::IdentityResolver;
use crate::inbound::InboundPipeline;
use crate::notify::{EmailSender, NotificationDispatcher, ResendEmailSender};
use crate::reminders::{ReminderJob, ReminderScanner};
use crate::store::{AccountStore, SqliteStore, TaskStore};

/// State handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: InboundPipeline,
    pub scanner: ReminderScanner,
    pub clock: Arc<dyn Clock>,
    pub offset: FixedOffset,
    pub cron_token: Option<String>,
    registration_url: String,
}

impl AppState {
    pub fn new(
        pipeline: InboundPipeline,
        scanner: ReminderScanner,
        clock: Arc<dyn Clock>,
        offset: FixedOffset,
        registration_url: impl Into<String>,
    ) -> Self {
        Self {
            pipeline,
            scanner,
            clock,
            offset,
            cron_token: None,
            registration_url: registration_url.into(),
        }
    }

    /// Require `Authorization: Bearer <token>` on `/cron`.
    #[must_use]
    pub fn with_cron_token(mut self, token: Option<String>) -> Self {
        self.cron_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Build every service from configuration using the real transports.
    ///
    /// # Errors
    ///
    /// Fails when the offset is malformed, the database cannot be opened or
    /// the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let offset = config.reminders.offset()?;
        let country_code = config.reminders.default_country_code.clone();

        let db_path = config.store.resolved_path();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = Arc::new(SqliteStore::open(&db_path)?);
        tracing::info!(path = %db_path.display(), "task store opened");
        let tasks: Arc<dyn TaskStore> = store.clone();
        let accounts: Arc<dyn AccountStore> = store;

        let model = OpenAiLanguageModel::from_config(&config.llm)
            .map_err(|e| TaskError::Config(format!("language model client: {e}")))?;
        let extractor = StructuredExtractor::new(Arc::new(model))
            .with_timeout(Duration::from_secs(config.llm.timeout_secs));

        let messaging: Arc<dyn MessageSender> = Arc::new(WhatsAppAdapter::new(&config.twilio));
        let email: Option<Arc<dyn EmailSender>> = if config.email.is_usable() {
            Some(Arc::new(ResendEmailSender::new(&config.email)))
        } else {
            tracing::info!("reminder email disabled");
            None
        };
        let dispatcher = NotificationDispatcher::new(
            messaging,
            email,
            config.links.dashboard_url.clone(),
            country_code.clone(),
        );

        let pipeline = InboundPipeline::new(
            IdentityResolver::new(accounts.clone(), country_code.clone()),
            extractor,
            TaskAssembler::new(tasks.clone()),
            dispatcher.clone(),
            config.links.registration_url.clone(),
        );
        let scanner = ReminderScanner::new(tasks, accounts, dispatcher, country_code)
            .with_dispatch_timeout(Duration::from_secs(
                config.reminders.dispatch_timeout_secs.max(1),
            ));

        Ok(Self::new(
            pipeline,
            scanner,
            Arc::new(SystemClock),
            offset,
            config.links.registration_url.clone(),
        )
        .with_cron_token(config.server.cron_token.clone()))
    }

    /// Current instant in the configured offset.
    #[must_use]
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now_in(self.offset)
    }

    #[must_use]
    pub fn registration_url(&self) -> &str {
        &self.registration_url
    }

    /// Periodic job sharing this state's scanner and its overlap guard.
    #[must_use]
    pub fn reminder_job(&self, interval: Duration) -> ReminderJob {
        ReminderJob::new(
            self.scanner.clone(),
            self.clock.clone(),
            self.offset,
            interval,
        )
    }
}
