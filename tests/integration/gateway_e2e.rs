//! End-to-end tests over a live HTTP listener.

use serde_json::Value;
use taskmate::app::AppState;
use taskmate::store::TaskStore;

use crate::helpers::{GROCERIES_DRAFT, Harness, OWNER_SENDER, REGISTRATION_URL, utc};

async fn spawn(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = taskmate::channels::serve(listener, state).await;
    });
    format!("http://{addr}")
}

async fn post_inbound(base: &str, fields: &[(&str, &str)]) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{base}/whatsapp-incoming"))
        .form(fields)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let harness = Harness::new(GROCERIES_DRAFT);
    let base = spawn(harness.state_at(utc(2024, 1, 1, 10))).await;

    let body: Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["now"], "2024-01-01T10:00:00+00:00");
}

#[tokio::test]
async fn registered_sender_creates_task_and_is_acknowledged() {
    let harness = Harness::new(GROCERIES_DRAFT);
    let base = spawn(harness.state_at(utc(2024, 1, 1, 10))).await;

    let resp = post_inbound(&base, &[("From", OWNER_SENDER), ("Body", "Buy groceries tomorrow")]).await;
    assert_eq!(resp.status(), 201);
    let task: Value = resp.json().await.unwrap();
    assert_eq!(task["title"], "Buy groceries");
    assert_eq!(task["reminderSent"], false);
    assert_eq!(task["ownerId"], "acct-asha");
    assert_eq!(task["reminder"], "2024-01-02T09:00:00Z");

    let stored = harness.store.list_tasks_for_owner("acct-asha").unwrap();
    assert_eq!(stored.len(), 1);

    let sent = harness.sent_messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, OWNER_SENDER);
    assert_eq!(sent[0].text, "Task created successfully.");
}

#[tokio::test]
async fn unregistered_sender_gets_registration_hint() {
    let harness = Harness::new(GROCERIES_DRAFT);
    let base = spawn(harness.state_at(utc(2024, 1, 1, 10))).await;

    let resp = post_inbound(&base, &[("From", "whatsapp:+15550001111"), ("Body", "Buy groceries")]).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "not_registered");

    assert_eq!(harness.model.call_count(), 0);
    let sent = harness.sent_messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "whatsapp:+15550001111");
    assert!(sent[0].text.contains(REGISTRATION_URL));
}

#[tokio::test]
async fn missing_sender_is_a_bad_request() {
    let harness = Harness::new(GROCERIES_DRAFT);
    let base = spawn(harness.state_at(utc(2024, 1, 1, 10))).await;

    let resp = post_inbound(&base, &[("Body", "hello")]).await;
    assert_eq!(resp.status(), 400);
    assert!(harness.sent_messages().is_empty());
}

#[tokio::test]
async fn cron_returns_pending_tasks_and_dispatches() {
    let harness = Harness::new(GROCERIES_DRAFT);
    let base = spawn(harness.state_at(utc(2024, 1, 1, 10))).await;
    let resp = post_inbound(&base, &[("From", OWNER_SENDER), ("Body", "Buy groceries tomorrow")]).await;
    assert_eq!(resp.status(), 201);

    // Next day: the groceries reminder is due.
    let base = spawn(harness.state_at(utc(2024, 1, 2, 8))).await;
    let resp = reqwest::get(format!("{base}/cron")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["tasks"].as_array().unwrap().len(), 1);

    // Ack plus reminder.
    let sent = harness.sent_messages();
    assert_eq!(sent.len(), 2);
    assert!(sent[1].text.starts_with("*Reminder*:"));
    assert_eq!(harness.sent_emails().len(), 1);
}

#[tokio::test]
async fn cron_requires_bearer_token_when_configured() {
    let harness = Harness::new(GROCERIES_DRAFT);
    let state = harness
        .state_at(utc(2024, 1, 2, 8))
        .with_cron_token(Some("cron-secret".to_owned()));
    let base = spawn(state).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/cron")).send().await.unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .get(format!("{base}/cron"))
        .header("Authorization", "Bearer cron-secret")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}
