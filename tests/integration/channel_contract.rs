//! Contract tests for the Twilio WhatsApp and Resend email transports.

use serde_json::json;
use taskmate::channels::{ChannelOutboundMessage, MessageSender, WhatsAppAdapter};
use taskmate::config::{EmailConfig, TwilioConfig};
use taskmate::notify::{DispatchError, EmailMessage, EmailSender, ResendEmailSender};
use wiremock::matchers::{basic_auth, bearer_token, body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn twilio_config(server: &MockServer) -> TwilioConfig {
    TwilioConfig {
        api_base: server.uri(),
        account_sid: "AC123".to_owned(),
        auth_token: "secret".to_owned(),
        from_number: "+14155238886".to_owned(),
        timeout_secs: 5,
    }
}

fn email_config(server: &MockServer) -> EmailConfig {
    EmailConfig {
        enabled: true,
        api_base: server.uri(),
        api_key: "re_test".to_owned(),
        from: "Taskmate <reminders@example.com>".to_owned(),
        timeout_secs: 5,
    }
}

#[tokio::test]
async fn whatsapp_send_posts_form_with_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
        .and(basic_auth("AC123", "secret"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("To=whatsapp%3A%2B919999999999"))
        .and(body_string_contains("From=whatsapp%3A%2B14155238886"))
        .and(body_string_contains("Body=Task+created+successfully."))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"sid": "SM1"})))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = WhatsAppAdapter::new(&twilio_config(&server));
    adapter
        .send(ChannelOutboundMessage {
            to: "+919999999999".to_owned(),
            text: "Task created successfully.".to_owned(),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn whatsapp_rejection_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid To number"))
        .mount(&server)
        .await;

    let err = WhatsAppAdapter::new(&twilio_config(&server))
        .send(ChannelOutboundMessage {
            to: "whatsapp:+1".to_owned(),
            text: "hi".to_owned(),
        })
        .await
        .unwrap_err();
    match err {
        DispatchError::Rejected { status, body, .. } => {
            assert_eq!(status, 400);
            assert_eq!(body, "invalid To number");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn resend_posts_json_with_bearer_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(bearer_token("re_test"))
        .and(body_partial_json(json!({
            "from": "Taskmate <reminders@example.com>",
            "to": "asha@example.com",
            "subject": "Buy groceries - Reminder",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "em_1"})))
        .expect(1)
        .mount(&server)
        .await;

    let sender = ResendEmailSender::new(&email_config(&server));
    sender
        .send_email(&EmailMessage {
            to: "asha@example.com".to_owned(),
            subject: "Buy groceries - Reminder".to_owned(),
            text: "Your task BUY GROCERIES is due today.".to_owned(),
            html: "<p>Your task BUY GROCERIES is due today.</p>".to_owned(),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn resend_error_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(422).set_body_string("invalid from"))
        .mount(&server)
        .await;

    let err = ResendEmailSender::new(&email_config(&server))
        .send_email(&EmailMessage {
            to: "asha@example.com".to_owned(),
            subject: "s".to_owned(),
            text: "t".to_owned(),
            html: "h".to_owned(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Rejected { status: 422, .. }));
}
