//! The message capability a transport sends.

use crate::email::Email;
use crate::error::MailError;

/// A message the transport can serialize, annotate and count recipients of.
///
/// [`Email`] implements this. Implement it for your own message type to send
/// it through [`MandrillTransport`](crate::providers::MandrillTransport)
/// without converting to [`Email`] first.
pub trait MailMessage: Send {
    /// The full MIME representation, headers and body, as one string.
    fn to_raw(&self) -> Result<String, MailError>;

    /// Value of a header, matched case-insensitively.
    fn header(&self, name: &str) -> Option<&str>;

    /// Set a text header, replacing any existing header of the same name.
    fn set_header(&mut self, name: &str, value: &str);

    /// Total number of recipients (to + cc + bcc).
    fn recipient_count(&self) -> usize;
}

impl MailMessage for Email {
    fn to_raw(&self) -> Result<String, MailError> {
        self.formatted()
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    fn set_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name, value);
    }

    fn recipient_count(&self) -> usize {
        Email::recipient_count(self)
    }
}
