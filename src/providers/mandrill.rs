//! Mandrill (Mailchimp Transactional) API provider.
//!
//! For reference: [Mandrill send-raw docs](https://mailchimp.com/developer/transactional/api/messages/send-mime-message/)
//!
//! # Example
//!
//! ```rust,ignore
//! use mandrill_transport::Email;
//! use mandrill_transport::providers::MandrillTransport;
//!
//! let transport = MandrillTransport::new("md-xxxxxxxxxxxxxxxx")
//!     .header("X-MC-Tags", "password-reset")
//!     .header("X-MC-Track", "opens,clicks");
//!
//! let mut email = Email::new()
//!     .from("noreply@example.com")
//!     .to("user@example.com")
//!     .subject("Reset your password")
//!     .text_body("...");
//!
//! let sent = transport.send(&mut email).await?;
//! assert_eq!(email.headers.get("X-Message-ID"), sent.message_id.as_deref());
//! ```
//!
//! ## Custom headers
//!
//! Headers configured on the transport are written onto every message before
//! it is serialized. Mandrill reads its `X-MC-*` SMTP headers from the raw
//! message, so this is how tags, tracking, metadata and subaccounts are
//! selected. See the
//! [SMTP header reference](https://mailchimp.com/developer/transactional/docs/smtp-integration/#customize-messages-with-smtp-headers).
//!
//! ## Request
//!
//! Every send is one `POST {base_url}/messages/send-raw.json` with exactly
//! three form fields: `key`, `raw_message` and `async=true`.

use std::env;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use crate::client::{HttpClient, HttpResponse};
use crate::email::Email;
use crate::error::MailError;
use crate::headers::Headers;
use crate::mailer::{DeliveryResult, Mailer};
use crate::message::MailMessage;
use crate::observer::{SendEvent, SendObserver};

const MANDRILL_API_URL: &str = "https://mandrillapp.com/api/1.0";
const SEND_RAW_PATH: &str = "/messages/send-raw.json";

/// Header the Mandrill message id is written to after a send.
pub const MESSAGE_ID_HEADER: &str = "X-Message-ID";

/// Settings applied to every send.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct MandrillConfig {
    key: String,
    headers: Headers,
    combine_cc_and_bcc: bool,
}

impl MandrillConfig {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    /// The API key used on subsequent sends.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn set_key(&mut self, key: impl Into<String>) {
        self.key = key.into();
    }

    /// Custom headers written onto every message.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Replace the custom headers. An empty iterator resets them.
    pub fn set_headers<I, K, V>(&mut self, headers: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers = headers.into_iter().collect();
    }

    /// Add or replace a single custom header.
    pub fn insert_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name, value);
    }

    pub fn clear_headers(&mut self) {
        self.headers.clear();
    }

    /// Whether CC and BCC recipients should go out in one email.
    ///
    /// Stored for callers that inspect it; sends ignore it.
    pub fn combines_cc_and_bcc(&self) -> bool {
        self.combine_cc_and_bcc
    }

    pub fn set_combine_cc_and_bcc(&mut self, combine: bool) {
        self.combine_cc_and_bcc = combine;
    }

    fn form(&self, raw_message: String) -> [(&'static str, String); 3] {
        [
            ("key", self.key.clone()),
            ("raw_message", raw_message),
            ("async", "true".to_string()),
        ]
    }
}

impl fmt::Debug for MandrillConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MandrillConfig")
            .field("key", &"[redacted]")
            .field("headers", &self.headers)
            .field("combine_cc_and_bcc", &self.combine_cc_and_bcc)
            .finish()
    }
}

/// Outcome of one send.
#[derive(Debug, Clone)]
pub struct SentMessage {
    /// Recipients on the message (to + cc + bcc).
    pub recipients: usize,
    /// `_id` of the first response entry, if Mandrill returned one.
    pub message_id: Option<String>,
    /// The raw API response.
    pub response: HttpResponse,
}

/// Mandrill send-raw transport.
pub struct MandrillTransport<C = Client> {
    config: MandrillConfig,
    client: C,
    base_url: String,
    observers: Vec<Arc<dyn SendObserver>>,
}

impl MandrillTransport<Client> {
    /// Create a new transport with the given API key.
    pub fn new(key: impl Into<String>) -> Self {
        Self::with_client(key, Client::new())
    }

    /// Create a transport from `MANDRILL_API_KEY` and, optionally,
    /// `MANDRILL_BASE_URL`.
    pub fn from_env() -> Result<Self, MailError> {
        let key = env::var("MANDRILL_API_KEY").map_err(|_| MailError::NotConfigured)?;

        let mut transport = Self::new(key);
        if let Ok(base_url) = env::var("MANDRILL_BASE_URL") {
            transport = transport.base_url(base_url);
        }
        Ok(transport)
    }
}

impl<C: HttpClient> MandrillTransport<C> {
    /// Create with a custom HTTP client.
    pub fn with_client(key: impl Into<String>, client: C) -> Self {
        Self::from_config(MandrillConfig::new(key), client)
    }

    pub fn from_config(config: MandrillConfig, client: C) -> Self {
        Self {
            config,
            client,
            base_url: MANDRILL_API_URL.to_string(),
            observers: Vec::new(),
        }
    }

    /// Set a custom base URL (for testing).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Add a custom header to write onto every message.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert_header(name, value);
        self
    }

    /// Set the initial custom headers.
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.config.set_headers(headers);
        self
    }

    /// Mark CC and BCC recipients as combined into one email.
    ///
    /// The flag is kept on the configuration only; the request sent to
    /// Mandrill is the same either way.
    pub fn combine_cc_and_bcc(mut self) -> Self {
        self.config.set_combine_cc_and_bcc(true);
        self
    }

    /// Register an observer.
    pub fn observer(mut self, observer: impl SendObserver + 'static) -> Self {
        self.register_observer(observer);
        self
    }

    pub fn register_observer(&mut self, observer: impl SendObserver + 'static) {
        self.observers.push(Arc::new(observer));
    }

    pub fn config(&self) -> &MandrillConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut MandrillConfig {
        &mut self.config
    }

    pub fn key(&self) -> &str {
        self.config.key()
    }

    pub fn set_key(&mut self, key: impl Into<String>) {
        self.config.set_key(key);
    }

    pub fn custom_headers(&self) -> &Headers {
        self.config.headers()
    }

    /// Replace the custom headers. An empty iterator resets them.
    pub fn set_headers<I, K, V>(&mut self, headers: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.config.set_headers(headers);
    }

    pub fn clear_headers(&mut self) {
        self.config.clear_headers();
    }

    pub fn is_combining_cc_and_bcc(&self) -> bool {
        self.config.combines_cc_and_bcc()
    }

    /// Full URL of the send-raw endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), SEND_RAW_PATH)
    }

    /// Send a message through the send-raw API.
    ///
    /// Observers run first, then the configured custom headers are written
    /// onto the message, which is serialized and posted. On success the
    /// message gains an `X-Message-ID` header holding the id Mandrill
    /// returned (empty when the response has none).
    ///
    /// HTTP failures and undecodable responses are returned as errors. The
    /// custom headers have already been applied to the message by then.
    pub async fn send<M: MailMessage>(&self, message: &mut M) -> Result<SentMessage, MailError> {
        self.before_send_performed(message);

        let raw_message = message.to_raw()?;
        let url = self.endpoint();

        tracing::debug!(
            endpoint = %url,
            recipients = message.recipient_count(),
            bytes = raw_message.len(),
            "Submitting raw message to Mandrill"
        );

        let response = self
            .client
            .post_form(&url, &self.config.form(raw_message))
            .await?;

        let message_id = response.message_id()?;
        match &message_id {
            Some(id) => tracing::info!(message_id = %id, "Mandrill accepted message"),
            None => tracing::warn!(
                body = %response.body(),
                "Mandrill response carried no message id"
            ),
        }

        message.set_header(MESSAGE_ID_HEADER, message_id.as_deref().unwrap_or_default());

        self.send_performed(message);

        Ok(SentMessage {
            recipients: message.recipient_count(),
            message_id,
            response,
        })
    }

    fn before_send_performed(&self, message: &mut dyn MailMessage) {
        let mut event = SendEvent {
            config: &self.config,
            message,
        };

        for observer in &self.observers {
            observer.before_send(&mut event);
        }

        for (name, value) in self.config.headers().iter() {
            event.message.set_header(name, value);
        }
    }

    fn send_performed(&self, message: &mut dyn MailMessage) {
        let event = SendEvent {
            config: &self.config,
            message,
        };

        for observer in &self.observers {
            observer.after_send(&event);
        }
    }
}

impl<C> fmt::Debug for MandrillTransport<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MandrillTransport")
            .field("config", &self.config)
            .field("base_url", &self.base_url)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[async_trait]
impl<C: HttpClient> Mailer for MandrillTransport<C> {
    async fn deliver(&self, email: &Email) -> Result<DeliveryResult, MailError> {
        let mut email = email.clone();
        let sent = self.send(&mut email).await?;

        Ok(DeliveryResult::with_response(
            sent.message_id.unwrap_or_default(),
            serde_json::json!({
                "provider": "mandrill",
                "recipients": sent.recipients,
                "response": sent.response.json()?,
            }),
        ))
    }

    fn provider_name(&self) -> &'static str {
        "mandrill"
    }

    fn validate_config(&self) -> Result<(), MailError> {
        if self.config.key().trim().is_empty() {
            return Err(MailError::Configuration("Mandrill API key is empty".into()));
        }
        Ok(())
    }
}
