//! # mandrill-transport
//!
//! Deliver fully-formed emails through the Mandrill (Mailchimp Transactional)
//! `send-raw` API.
//!
//! A send serializes the message to raw MIME, posts it with the API key, and
//! writes the id Mandrill returns back onto the message as `X-Message-ID`, so
//! it can be matched against delivery webhooks later.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mandrill_transport::Email;
//! use mandrill_transport::providers::MandrillTransport;
//!
//! let transport = MandrillTransport::new("md-xxxxxxxxxxxxxxxx")
//!     .header("X-MC-Tags", "welcome");
//!
//! let mut email = Email::new()
//!     .from("noreply@example.com")
//!     .to("user@example.com")
//!     .subject("Welcome!")
//!     .text_body("Hello");
//!
//! let sent = transport.send(&mut email).await?;
//! println!("{} recipients, id {:?}", sent.recipients, sent.message_id);
//! ```
//!
//! ## Through the `Mailer` trait
//!
//! ```rust,ignore
//! use mandrill_transport::{deliver_with, Email};
//! use mandrill_transport::providers::MandrillTransport;
//!
//! let mailer = MandrillTransport::from_env()?;
//! let result = deliver_with(&email, &mailer).await?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `MANDRILL_API_KEY` | Mandrill API key |
//! | `MANDRILL_BASE_URL` | API root override (default `https://mandrillapp.com/api/1.0`) |
//! | `EMAIL_FROM` | Default sender email |
//! | `EMAIL_FROM_NAME` | Default sender name |
//!
//! ## Feature Flags
//!
//! - `metrics` - Prometheus-style metrics (counters/histograms)
//!
//! ## Metrics
//!
//! Enable `features = ["metrics"]` to emit:
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `mandrill_emails_total` | Counter | provider, status | Total emails sent |
//! | `mandrill_delivery_duration_seconds` | Histogram | provider | Delivery duration |

/// The version of the mandrill-transport crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod address;
mod client;
mod email;
mod error;
mod headers;
mod mailer;
mod message;

pub mod observer;
pub mod providers;

use std::env;

#[cfg(feature = "metrics")]
use std::time::Instant;

// Re-exports
pub use address::{Address, ToAddress};
pub use client::{HttpClient, HttpResponse, RecipientStatus};
pub use email::Email;
pub use error::MailError;
pub use headers::Headers;
pub use mailer::{DeliveryResult, Mailer};
pub use message::MailMessage;
pub use observer::{SendEvent, SendObserver};

/// Get the default from address from environment.
pub fn default_from() -> Option<Address> {
    let email = env::var("EMAIL_FROM").ok()?;
    match env::var("EMAIL_FROM_NAME").ok() {
        Some(name) => Some(Address::with_name(name, email)),
        None => Some(Address::new(email)),
    }
}

/// Check if the Mandrill transport can be built from the environment.
pub fn is_configured() -> bool {
    env::var("MANDRILL_API_KEY").is_ok_and(|key| !key.trim().is_empty())
}

/// Validate an email has required fields.
fn validate(email: &Email) -> Result<(), MailError> {
    if email.from.is_none() && default_from().is_none() {
        return Err(MailError::MissingField("from"));
    }
    if email.recipient_count() == 0 {
        return Err(MailError::MissingField("to"));
    }
    Ok(())
}

/// Prepare email by adding default from address if needed.
fn prepare_email(email: &Email) -> Email {
    if email.from.is_none() {
        if let Some(from) = default_from() {
            let mut e = email.clone();
            e.from = Some(from);
            return e;
        }
    }
    email.clone()
}

/// Deliver an email using a specific mailer.
///
/// Validates required fields (`from`, `to`), fills in `from` from
/// `EMAIL_FROM` when missing, and wraps the delivery in a
/// `mandrill.deliver` tracing span.
///
/// ```rust,ignore
/// use mandrill_transport::{Email, deliver_with};
/// use mandrill_transport::providers::MandrillTransport;
///
/// let mailer = MandrillTransport::new("md-xxxx");
/// let email = Email::new()
///     .to("user@example.com")
///     .subject("Hello!");
///
/// deliver_with(&email, &mailer).await?;
/// ```
pub async fn deliver_with<M: Mailer + ?Sized>(
    email: &Email,
    mailer: &M,
) -> Result<DeliveryResult, MailError> {
    validate(email)?;

    let provider = mailer.provider_name();
    let email = prepare_email(email);

    let span = tracing::info_span!(
        "mandrill.deliver",
        provider = provider,
        to = ?email.to.iter().map(|a| &a.email).collect::<Vec<_>>(),
        subject = %email.subject,
    );

    tracing::Instrument::instrument(deliver_in_span(&email, mailer, provider), span).await
}

async fn deliver_in_span<M: Mailer + ?Sized>(
    email: &Email,
    mailer: &M,
    provider: &'static str,
) -> Result<DeliveryResult, MailError> {
    tracing::debug!("Delivering email");

    #[cfg(feature = "metrics")]
    let start = Instant::now();

    let result = mailer.deliver(email).await;

    #[cfg(feature = "metrics")]
    {
        let duration = start.elapsed().as_secs_f64();
        let status = if result.is_ok() { "success" } else { "error" };
        metrics::counter!("mandrill_emails_total", "provider" => provider, "status" => status)
            .increment(1);
        metrics::histogram!("mandrill_delivery_duration_seconds", "provider" => provider)
            .record(duration);
    }
    match &result {
        Ok(r) => tracing::info!(provider, message_id = %r.message_id, "Email delivered"),
        Err(e) => tracing::error!(provider, error = %e, "Email delivery failed"),
    }

    result
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::observer::{SendEvent, SendObserver};
    pub use crate::providers::MandrillTransport;
    pub use crate::Address;
    pub use crate::DeliveryResult;
    pub use crate::Email;
    pub use crate::MailError;
    pub use crate::MailMessage;
    pub use crate::Mailer;
    pub use crate::ToAddress;
    pub use crate::{default_from, deliver_with, is_configured};
}
