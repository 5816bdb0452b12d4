//! Reminder scanning against a real SQLite store.

use taskmate::inbound::InboundOutcome;
use taskmate::notify::ChannelOutcome;
use taskmate::reminders::TaskOutcome;
use taskmate::store::{SqliteStore, TaskStore};

use crate::helpers::{GROCERIES_DRAFT, Harness, OWNER_SENDER, seed_owner, utc_fixed};

#[tokio::test]
async fn groceries_reminder_fires_once_on_the_due_day() {
    let harness = Harness::new(GROCERIES_DRAFT);
    let outcome = harness
        .pipeline()
        .handle(OWNER_SENDER, "Buy groceries tomorrow", utc_fixed(2024, 1, 1, 10))
        .await;
    let InboundOutcome::Created(task) = outcome else {
        panic!("expected the task to be created");
    };

    let scanner = harness.scanner();

    // Created day: not due yet.
    let report = scanner.scan(utc_fixed(2024, 1, 1, 18)).await.unwrap();
    assert_eq!(report.pending.len(), 1);
    assert!(report.outcomes.is_empty());
    assert!(harness.sent_emails().is_empty());

    let report = scanner.scan(utc_fixed(2024, 1, 2, 8)).await.unwrap();
    assert_eq!(report.pending.len(), 1);
    assert_eq!(report.reminded(), 1);
    match &report.outcomes[0].outcome {
        TaskOutcome::Reminded { report } => {
            assert_eq!(report.message, ChannelOutcome::Sent);
            assert_eq!(report.email, ChannelOutcome::Sent);
        }
        other => panic!("expected reminded, got {other:?}"),
    }

    let reminder = harness.sent_messages().pop().unwrap();
    assert_eq!(reminder.to, "+919999999999");
    assert!(reminder.text.contains("*Buy groceries*"));
    assert!(reminder.text.ends_with(&format!("/buy-groceries/{}", task.id)));

    let email = harness.sent_emails().pop().unwrap();
    assert_eq!(email.to, harness.owner.email.clone().unwrap());
    assert_eq!(email.subject, "Buy groceries - Reminder");

    let stored = harness.store.get_task(&task.id).unwrap().unwrap();
    assert!(stored.reminder_sent);

    // Same day again: nothing left to do.
    let messages_before = harness.sent_messages().len();
    let report = scanner.scan(utc_fixed(2024, 1, 2, 9)).await.unwrap();
    assert!(report.pending.is_empty());
    assert_eq!(harness.sent_messages().len(), messages_before);
    assert_eq!(harness.sent_emails().len(), 1);
}

#[tokio::test]
async fn reminders_survive_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("tasks.db");

    let task_id = {
        let store = SqliteStore::open(&db).unwrap();
        let owner = seed_owner(&store);
        let task = store
            .create_task(
                taskmate::model::NewTask {
                    title: "Pay rent".to_owned(),
                    body: "Pay rent".to_owned(),
                    reminder: Some(utc_fixed(2024, 1, 5, 9).to_utc()),
                    tags: Vec::new(),
                    is_completed: false,
                    owner_id: owner.id,
                },
                utc_fixed(2024, 1, 1, 0).to_utc(),
            )
            .unwrap();
        assert!(store.claim_reminder(&task.id, utc_fixed(2024, 1, 5, 9).to_utc()).unwrap());
        task.id
    };

    let store = SqliteStore::open(&db).unwrap();
    assert!(store.get_task(&task_id).unwrap().unwrap().reminder_sent);
    assert!(!store.claim_reminder(&task_id, utc_fixed(2024, 1, 5, 10).to_utc()).unwrap());
    assert!(store.pending_tasks().unwrap().is_empty());
}
