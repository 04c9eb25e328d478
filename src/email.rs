//! Email struct with builder pattern.

use lettre::message::header::{ContentType, HeaderName, HeaderValue};
use lettre::message::MultiPart;
use lettre::Message;
use serde::{Deserialize, Serialize};

use crate::address::{Address, ToAddress};
use crate::error::MailError;
use crate::headers::Headers;

/// An email message.
///
/// Use the builder pattern to construct emails:
///
/// ```
/// use mandrill_transport::Email;
///
/// let email = Email::new()
///     .from("sender@example.com")
///     .to("recipient@example.com")
///     .subject("Hello!")
///     .text_body("Plain text content")
///     .html_body("<h1>HTML content</h1>")
///     .header("X-MC-Tags", "welcome");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Email {
    /// Sender address
    pub from: Option<Address>,
    /// Primary recipients
    pub to: Vec<Address>,
    /// Carbon copy recipients
    pub cc: Vec<Address>,
    /// Blind carbon copy recipients
    pub bcc: Vec<Address>,
    /// Reply-to addresses
    pub reply_to: Vec<Address>,
    /// Email subject line
    pub subject: String,
    /// Plain text body
    pub text_body: Option<String>,
    /// HTML body
    pub html_body: Option<String>,
    /// Custom text headers
    pub headers: Headers,
}

impl Email {
    /// Create a new empty email.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sender address.
    pub fn from(mut self, addr: impl ToAddress) -> Self {
        self.from = Some(addr.to_address());
        self
    }

    /// Add a recipient. Can be called multiple times.
    pub fn to(mut self, addr: impl ToAddress) -> Self {
        self.to.push(addr.to_address());
        self
    }

    /// Add a CC recipient.
    pub fn cc(mut self, addr: impl ToAddress) -> Self {
        self.cc.push(addr.to_address());
        self
    }

    /// Add a BCC recipient.
    pub fn bcc(mut self, addr: impl ToAddress) -> Self {
        self.bcc.push(addr.to_address());
        self
    }

    /// Add a reply-to address.
    pub fn reply_to(mut self, addr: impl ToAddress) -> Self {
        self.reply_to.push(addr.to_address());
        self
    }

    /// Set the subject line.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Set the plain text body.
    pub fn text_body(mut self, body: impl Into<String>) -> Self {
        self.text_body = Some(body.into());
        self
    }

    /// Set the HTML body.
    pub fn html_body(mut self, body: impl Into<String>) -> Self {
        self.html_body = Some(body.into());
        self
    }

    /// Set a custom header, replacing any header with the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Get all recipients (to + cc + bcc).
    pub fn all_recipients(&self) -> Vec<&Address> {
        self.to
            .iter()
            .chain(self.cc.iter())
            .chain(self.bcc.iter())
            .collect()
    }

    /// Number of recipients across to, cc and bcc.
    pub fn recipient_count(&self) -> usize {
        self.to.len() + self.cc.len() + self.bcc.len()
    }

    /// Build a lettre [`Message`] from this email.
    ///
    /// The `Bcc` header is kept in the output: Mandrill reads recipients
    /// from the raw message headers.
    pub fn to_message(&self) -> Result<Message, MailError> {
        let from = self.from.as_ref().ok_or(MailError::MissingField("from"))?;

        if self.recipient_count() == 0 {
            return Err(MailError::MissingField("to"));
        }

        let mut builder = Message::builder()
            .from(from.to_mailbox()?)
            .subject(self.subject.as_str())
            .message_id(None)
            .keep_bcc();

        for to in &self.to {
            builder = builder.to(to.to_mailbox()?);
        }
        for cc in &self.cc {
            builder = builder.cc(cc.to_mailbox()?);
        }
        for bcc in &self.bcc {
            builder = builder.bcc(bcc.to_mailbox()?);
        }
        for reply_to in &self.reply_to {
            builder = builder.reply_to(reply_to.to_mailbox()?);
        }

        for (name, value) in self.headers.iter() {
            let header_name = HeaderName::new_from_ascii(name.to_string())
                .map_err(|_| MailError::InvalidHeader(name.to_string()))?;
            builder = builder.raw_header(HeaderValue::new(header_name, value.to_string()));
        }

        let message = match (&self.html_body, &self.text_body) {
            (Some(html), Some(text)) => {
                builder.multipart(MultiPart::alternative_plain_html(text.clone(), html.clone()))?
            }
            (Some(html), None) => builder.header(ContentType::TEXT_HTML).body(html.clone())?,
            (None, Some(text)) => builder.header(ContentType::TEXT_PLAIN).body(text.clone())?,
            (None, None) => builder
                .header(ContentType::TEXT_PLAIN)
                .body(String::new())?,
        };

        Ok(message)
    }

    /// Serialize to the raw MIME representation (headers and body).
    pub fn formatted(&self) -> Result<String, MailError> {
        let raw = self.to_message()?.formatted();
        String::from_utf8(raw).map_err(|e| MailError::BuildError(e.to_string()))
    }
}
