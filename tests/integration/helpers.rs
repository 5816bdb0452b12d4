//! Shared helpers for integration tests.
//!
//! Stub transports record what they were asked to send so tests can assert
//! on outbound traffic without a network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use taskmate::app::AppState;
use taskmate::assembler::TaskAssembler;
use taskmate::channels::{ChannelOutboundMessage, MessageSender};
use taskmate::clock::FixedClock;
use taskmate::extractor::{ExtractionError, LanguageModel, StructuredExtractor, StructuredRequest};
use taskmate::identity::IdentityResolver;
use taskmate::inbound::InboundPipeline;
use taskmate::model::Account;
use taskmate::notify::{DispatchError, EmailMessage, EmailSender, NotificationDispatcher};
use taskmate::reminders::ReminderScanner;
use taskmate::store::{AccountStore, SqliteStore};

pub(crate) const REGISTRATION_URL: &str = "https://tasks.example.com/register";
pub(crate) const DASHBOARD_URL: &str = "https://tasks.example.com/dashboard";
pub(crate) const OWNER_SENDER: &str = "whatsapp:+919999999999";

/// Model stub returning one canned JSON reply.
pub(crate) struct CannedModel {
    reply: String,
    pub(crate) calls: AtomicUsize,
}

impl CannedModel {
    pub(crate) fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_owned(),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for CannedModel {
    async fn complete_json(&self, _: &StructuredRequest) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

#[derive(Default)]
pub(crate) struct RecordingSender {
    pub(crate) sent: Mutex<Vec<ChannelOutboundMessage>>,
}

#[async_trait]
impl MessageSender for RecordingSender {
    fn id(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, message: ChannelOutboundMessage) -> Result<(), DispatchError> {
        self.sent.lock().expect("sent lock").push(message);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingEmail {
    pub(crate) sent: Mutex<Vec<EmailMessage>>,
}

#[async_trait]
impl EmailSender for RecordingEmail {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), DispatchError> {
        self.sent.lock().expect("email lock").push(email.clone());
        Ok(())
    }
}

/// Model reply for "Buy groceries tomorrow" sent on 2024-01-01.
pub(crate) const GROCERIES_DRAFT: &str = r#"{
    "title": "Buy groceries",
    "body": "Buy groceries tomorrow.",
    "reminder": "2024-01-02",
    "tags": ["errand"],
    "isCompleted": false
}"#;

pub(crate) fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub(crate) fn utc_fixed(y: i32, m: u32, d: u32, h: u32) -> DateTime<FixedOffset> {
    utc(y, m, d, h).fixed_offset()
}

pub(crate) fn seed_owner(store: &SqliteStore) -> Account {
    let account = Account {
        id: "acct-asha".to_owned(),
        name: "Asha".to_owned(),
        email: Some("asha@example.com".to_owned()),
        phone: Some("9999999999".to_owned()),
        country_code: Some("+91".to_owned()),
    };
    store.insert_account(&account).expect("seed account");
    account
}

/// A fully wired service with stub transports.
pub(crate) struct Harness {
    pub(crate) store: Arc<SqliteStore>,
    pub(crate) model: Arc<CannedModel>,
    pub(crate) messages: Arc<RecordingSender>,
    pub(crate) emails: Arc<RecordingEmail>,
    pub(crate) owner: Account,
}

impl Harness {
    pub(crate) fn new(model_reply: &str) -> Self {
        let store = Arc::new(SqliteStore::open_in_memory().expect("open store"));
        let owner = seed_owner(&store);
        Self {
            store,
            model: Arc::new(CannedModel::new(model_reply)),
            messages: Arc::new(RecordingSender::default()),
            emails: Arc::new(RecordingEmail::default()),
            owner,
        }
    }

    pub(crate) fn dispatcher(&self) -> NotificationDispatcher {
        NotificationDispatcher::new(
            self.messages.clone(),
            Some(self.emails.clone() as Arc<dyn EmailSender>),
            DASHBOARD_URL,
            "+91",
        )
    }

    pub(crate) fn scanner(&self) -> ReminderScanner {
        ReminderScanner::new(
            self.store.clone(),
            self.store.clone(),
            self.dispatcher(),
            "+91",
        )
    }

    pub(crate) fn pipeline(&self) -> InboundPipeline {
        InboundPipeline::new(
            IdentityResolver::new(self.store.clone(), "+91"),
            StructuredExtractor::new(self.model.clone()),
            TaskAssembler::new(self.store.clone()),
            self.dispatcher(),
            REGISTRATION_URL,
        )
    }

    /// App state whose clock is frozen at `now`, in UTC.
    pub(crate) fn state_at(&self, now: DateTime<Utc>) -> AppState {
        AppState::new(
            self.pipeline(),
            self.scanner(),
            Arc::new(FixedClock(now)),
            FixedOffset::east_opt(0).expect("utc offset"),
            REGISTRATION_URL,
        )
    }

    pub(crate) fn sent_messages(&self) -> Vec<ChannelOutboundMessage> {
        self.messages.sent.lock().expect("sent lock").clone()
    }

    pub(crate) fn sent_emails(&self) -> Vec<EmailMessage> {
        self.emails.sent.lock().expect("email lock").clone()
    }
}
