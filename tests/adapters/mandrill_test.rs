//! Mandrill adapter tests.

use mandrill_transport::providers::MandrillTransport;
use mandrill_transport::{deliver_with, Email, MailError, MailMessage, Mailer};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helper Functions
// ============================================================================

fn valid_email() -> Email {
    Email::new()
        .from("tony.stark@example.com")
        .to("steve.rogers@example.com")
        .subject("Hello, Avengers!")
        .html_body("<h1>Hello</h1>")
}

fn success_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!([
        {
            "email": "steve.rogers@example.com",
            "status": "sent",
            "reject_reason": null,
            "_id": "abc123"
        }
    ]))
}

async fn mount_send_raw(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/messages/send-raw.json"))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Decoded form fields of every request the server received.
async fn received_forms(server: &MockServer) -> Vec<Vec<(String, String)>> {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .iter()
        .map(|r| serde_urlencoded::from_bytes(&r.body).expect("form-encoded body"))
        .collect()
}

fn field<'a>(form: &'a [(String, String)], name: &str) -> Option<&'a str> {
    form.iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

// ============================================================================
// Basic Delivery Tests
// ============================================================================

#[tokio::test]
async fn successful_send_sets_message_id_header() {
    let server = MockServer::start().await;
    let transport = MandrillTransport::new("md-test-key").base_url(server.uri());

    Mock::given(method("POST"))
        .and(path("/messages/send-raw.json"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("key=md-test-key"))
        .and(body_string_contains("async=true"))
        .respond_with(success_response())
        .expect(1)
        .mount(&server)
        .await;

    let mut email = valid_email();
    let sent = transport.send(&mut email).await.unwrap();

    assert_eq!(sent.message_id.as_deref(), Some("abc123"));
    assert_eq!(email.headers.get("X-Message-ID"), Some("abc123"));
    assert_eq!(sent.response.status(), 200);
}

#[tokio::test]
async fn request_carries_exactly_three_fields() {
    let server = MockServer::start().await;
    let transport = MandrillTransport::new("md-test-key")
        .base_url(server.uri())
        .header("X-MC-Tags", "avengers");

    mount_send_raw(&server, success_response()).await;

    let mut plain = valid_email();
    let mut busy = Email::new()
        .from(("T Stark", "tony.stark@example.com"))
        .to(("Steve Rogers", "steve.rogers@example.com"))
        .to("wasp.avengers@example.com")
        .reply_to("office.avengers@example.com")
        .cc(("Bruce Banner", "hulk.smash@example.com"))
        .bcc("hawk.eye@example.com")
        .subject("Hello, Avengers!")
        .html_body("<h1>Hello</h1>")
        .text_body("Hello")
        .header("X-Priority", "1");

    transport.send(&mut plain).await.unwrap();
    transport.send(&mut busy).await.unwrap();

    let forms = received_forms(&server).await;
    assert_eq!(forms.len(), 2);
    for form in &forms {
        let names: Vec<&str> = form.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["key", "raw_message", "async"]);
        assert_eq!(field(form, "key"), Some("md-test-key"));
        assert_eq!(field(form, "async"), Some("true"));
    }
}

#[tokio::test]
async fn raw_message_is_full_mime_with_custom_headers() {
    let server = MockServer::start().await;
    let transport = MandrillTransport::new("md-test-key")
        .base_url(server.uri())
        .header("X-MC-Track", "opens,clicks");

    mount_send_raw(&server, success_response()).await;

    let mut email = valid_email().bcc("nick.fury@example.com");
    transport.send(&mut email).await.unwrap();

    let forms = received_forms(&server).await;
    let raw = field(&forms[0], "raw_message").unwrap();
    assert!(raw.contains("Subject: Hello, Avengers!"));
    assert!(raw.contains("X-MC-Track: opens,clicks"));
    assert!(raw.contains("nick.fury@example.com"));
    assert!(raw.contains("<h1>Hello</h1>"));
    // the id is written after serialization
    assert!(!raw.contains("X-Message-ID"));
}

#[tokio::test]
async fn send_returns_recipient_count() {
    let server = MockServer::start().await;
    let transport = MandrillTransport::new("md-test-key").base_url(server.uri());

    mount_send_raw(&server, success_response()).await;

    let mut email = valid_email()
        .to("wasp.avengers@example.com")
        .cc("hulk.smash@example.com")
        .bcc("hawk.eye@example.com");

    let sent = transport.send(&mut email).await.unwrap();
    assert_eq!(sent.recipients, 4);
}

// ============================================================================
// Custom Header Tests
// ============================================================================

#[tokio::test]
async fn custom_headers_applied_to_message() {
    let server = MockServer::start().await;
    let transport = MandrillTransport::new("md-test-key")
        .base_url(server.uri())
        .headers([("X-MC-Tags", "welcome"), ("X-MC-Subaccount", "avengers")]);

    mount_send_raw(&server, success_response()).await;

    let mut email = valid_email().header("x-mc-tags", "stale");
    transport.send(&mut email).await.unwrap();

    assert_eq!(email.headers.get("X-MC-Tags"), Some("welcome"));
    assert_eq!(email.headers.get("X-MC-Subaccount"), Some("avengers"));
}

#[tokio::test]
async fn sending_twice_does_not_duplicate_headers() {
    let server = MockServer::start().await;
    let transport = MandrillTransport::new("md-test-key")
        .base_url(server.uri())
        .header("X-MC-Tags", "welcome");

    mount_send_raw(&server, success_response()).await;

    let mut email = valid_email();
    transport.send(&mut email).await.unwrap();
    let after_first = email.headers.clone();
    transport.send(&mut email).await.unwrap();

    assert_eq!(email.headers, after_first);
    assert_eq!(email.headers.len(), 2);

    let forms = received_forms(&server).await;
    let second_raw = field(&forms[1], "raw_message").unwrap();
    assert_eq!(second_raw.matches("X-MC-Tags:").count(), 1);
}

// ============================================================================
// Response Handling Tests
// ============================================================================

#[tokio::test]
async fn empty_response_array_is_not_an_error() {
    let server = MockServer::start().await;
    let transport = MandrillTransport::new("md-test-key").base_url(server.uri());

    mount_send_raw(&server, ResponseTemplate::new(200).set_body_json(json!([]))).await;

    let mut email = valid_email().cc("hulk.smash@example.com");
    let sent = transport.send(&mut email).await.unwrap();

    assert_eq!(sent.message_id, None);
    assert_eq!(sent.recipients, 2);
    assert_eq!(email.headers.get("X-Message-ID"), Some(""));
}

#[tokio::test]
async fn missing_id_field_is_not_an_error() {
    let server = MockServer::start().await;
    let transport = MandrillTransport::new("md-test-key").base_url(server.uri());

    mount_send_raw(
        &server,
        ResponseTemplate::new(200).set_body_json(json!([
            {"email": "steve.rogers@example.com", "status": "queued"}
        ])),
    )
    .await;

    let mut email = valid_email();
    let sent = transport.send(&mut email).await.unwrap();

    assert_eq!(sent.message_id, None);
    assert_eq!(email.headers.get("X-Message-ID"), Some(""));
}

#[tokio::test]
async fn id_is_taken_from_first_entry() {
    let server = MockServer::start().await;
    let transport = MandrillTransport::new("md-test-key").base_url(server.uri());

    mount_send_raw(
        &server,
        ResponseTemplate::new(200).set_body_json(json!([
            {"email": "steve.rogers@example.com", "status": "sent", "_id": "first"},
            {"email": "hulk.smash@example.com", "status": "sent", "_id": "second"}
        ])),
    )
    .await;

    let mut email = valid_email().cc("hulk.smash@example.com");
    transport.send(&mut email).await.unwrap();

    assert_eq!(email.headers.get("X-Message-ID"), Some("first"));
}

#[tokio::test]
async fn response_body_is_exposed() {
    let server = MockServer::start().await;
    let transport = MandrillTransport::new("md-test-key").base_url(server.uri());

    mount_send_raw(
        &server,
        ResponseTemplate::new(200).set_body_json(json!([
            {
                "email": "steve.rogers@example.com",
                "status": "rejected",
                "reject_reason": "hard-bounce",
                "_id": "r1"
            }
        ])),
    )
    .await;

    let mut email = valid_email();
    let sent = transport.send(&mut email).await.unwrap();

    let body = sent.response.json().unwrap();
    assert_eq!(body[0]["status"], "rejected");

    let statuses = sent.response.recipient_statuses().unwrap();
    assert!(statuses[0].is_rejected());
    assert_eq!(statuses[0].reject_reason.as_deref(), Some("hard-bounce"));
}

// ============================================================================
// Error Handling Tests
// ============================================================================

#[tokio::test]
async fn malformed_json_is_an_error() {
    let server = MockServer::start().await;
    let transport = MandrillTransport::new("md-test-key")
        .base_url(server.uri())
        .header("X-MC-Tags", "welcome");

    mount_send_raw(
        &server,
        ResponseTemplate::new(200).set_body_string("<html>oops</html>"),
    )
    .await;

    let mut email = valid_email();
    let result = transport.send(&mut email).await;

    assert!(matches!(result, Err(MailError::JsonError(_))));
    assert_eq!(email.headers.get("X-Message-ID"), None);
    // pre-send mutations are not rolled back
    assert_eq!(email.headers.get("X-MC-Tags"), Some("welcome"));
}

#[tokio::test]
async fn api_error_status_is_provider_error() {
    let server = MockServer::start().await;
    let transport = MandrillTransport::new("bad-key").base_url(server.uri());

    mount_send_raw(
        &server,
        ResponseTemplate::new(500).set_body_json(json!({
            "status": "error",
            "code": -1,
            "name": "Invalid_Key",
            "message": "Invalid API key"
        })),
    )
    .await;

    let mut email = valid_email();
    let err = transport.send(&mut email).await.unwrap_err();

    match err {
        MailError::ProviderError {
            provider,
            message,
            status,
        } => {
            assert_eq!(provider, "mandrill");
            assert_eq!(message, "[Invalid_Key] Invalid API key");
            assert_eq!(status, Some(500));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(email.headers.get("X-Message-ID"), None);
}

#[tokio::test]
async fn error_with_non_json_body() {
    let server = MockServer::start().await;
    let transport = MandrillTransport::new("md-test-key").base_url(server.uri());

    mount_send_raw(
        &server,
        ResponseTemplate::new(502).set_body_string("Bad Gateway"),
    )
    .await;

    let mut email = valid_email();
    let err = transport.send(&mut email).await.unwrap_err();
    assert_eq!(err.status(), Some(502));
    assert!(err.to_string().contains("Bad Gateway"));
}

#[tokio::test]
async fn connection_failure_is_propagated() {
    // Nothing listens on the discard port.
    let transport = MandrillTransport::new("md-test-key").base_url("http://127.0.0.1:9");

    let mut email = valid_email();
    let result = transport.send(&mut email).await;

    assert!(matches!(result, Err(MailError::HttpError(_))));
    assert_eq!(email.headers.get("X-Message-ID"), None);
}

#[tokio::test]
async fn invalid_message_makes_no_request() {
    let server = MockServer::start().await;
    let transport = MandrillTransport::new("md-test-key").base_url(server.uri());

    Mock::given(method("POST"))
        .respond_with(success_response())
        .expect(0)
        .mount(&server)
        .await;

    let mut email = Email::new().to("steve.rogers@example.com");
    let result = transport.send(&mut email).await;
    assert!(matches!(result, Err(MailError::MissingField("from"))));
}

#[tokio::test]
async fn bcc_only_message_is_sent() {
    let server = MockServer::start().await;
    let transport = MandrillTransport::new("md-test-key").base_url(server.uri());

    mount_send_raw(&server, success_response()).await;

    let mut email = Email::new()
        .from("tony.stark@example.com")
        .bcc("nick.fury@example.com")
        .subject("Eyes only")
        .text_body("Assemble");

    let sent = transport.send(&mut email).await.unwrap();
    assert_eq!(sent.recipients, 1);
    assert_eq!(email.headers.get("X-Message-ID"), Some("abc123"));

    let forms = received_forms(&server).await;
    let raw = field(&forms[0], "raw_message").unwrap();
    assert!(raw.contains("Bcc: "));
    assert!(raw.contains("nick.fury@example.com"));
}

// ============================================================================
// Custom Message Types
// ============================================================================

struct PreRendered {
    raw: String,
    headers: Vec<(String, String)>,
    recipients: usize,
}

impl MailMessage for PreRendered {
    fn to_raw(&self) -> Result<String, MailError> {
        let mut out = String::new();
        for (name, value) in &self.headers {
            out.push_str(&format!("{}: {}\r\n", name, value));
        }
        out.push_str(&self.raw);
        Ok(out)
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn set_header(&mut self, name: &str, value: &str) {
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(existing) => existing.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    fn recipient_count(&self) -> usize {
        self.recipients
    }
}

#[tokio::test]
async fn sends_any_mail_message() {
    let server = MockServer::start().await;
    let transport = MandrillTransport::new("md-test-key")
        .base_url(server.uri())
        .header("X-MC-Tags", "prerendered");

    mount_send_raw(&server, success_response()).await;

    let mut message = PreRendered {
        raw: "To: steve.rogers@example.com\r\n\r\nHello".to_string(),
        headers: vec![],
        recipients: 3,
    };

    let sent = transport.send(&mut message).await.unwrap();
    assert_eq!(sent.recipients, 3);
    assert_eq!(message.header("X-Message-ID"), Some("abc123"));

    let forms = received_forms(&server).await;
    let raw = field(&forms[0], "raw_message").unwrap();
    assert!(raw.starts_with("X-MC-Tags: prerendered\r\n"));
    assert_eq!(forms[0].len(), 3);
}

// ============================================================================
// Mailer Trait Tests
// ============================================================================

#[tokio::test]
async fn deliver_through_mailer_trait() {
    let server = MockServer::start().await;
    let transport = MandrillTransport::new("md-test-key").base_url(server.uri());

    mount_send_raw(&server, success_response()).await;

    let email = valid_email();
    let result = transport.deliver(&email).await.unwrap();

    assert_eq!(result.message_id, "abc123");
    assert_eq!(result.provider_response.unwrap()["provider"], "mandrill");
    // deliver works on a copy
    assert!(email.headers.get("X-Message-ID").is_none());
}

#[tokio::test]
async fn deliver_with_dyn_mailer() {
    let server = MockServer::start().await;
    let transport = MandrillTransport::new("md-test-key").base_url(server.uri());

    mount_send_raw(&server, success_response()).await;

    let mailer: std::sync::Arc<dyn Mailer> = std::sync::Arc::new(transport);
    let result = deliver_with(&valid_email(), mailer.as_ref()).await.unwrap();

    assert_eq!(result.message_id, "abc123");
    assert_eq!(mailer.provider_name(), "mandrill");
}
