//! Send observers: hooks that run before and after every send.
//!
//! Observers are notified in registration order. `before_send` may mutate
//! the message (it runs before custom headers are applied and before the
//! message is serialized); `after_send` sees the message with its
//! `X-Message-ID` header already set.
//!
//! # Example
//!
//! ```rust,ignore
//! use mandrill_transport::observer;
//! use mandrill_transport::providers::MandrillTransport;
//!
//! let transport = MandrillTransport::new("md-xxxx")
//!     .observer(observer::before(|event| {
//!         event.message.set_header("X-MC-Tags", "password-reset");
//!     }))
//!     .observer(observer::after(|event| {
//!         tracing::info!(id = ?event.message.header("X-Message-ID"), "sent");
//!     }));
//! ```

use crate::message::MailMessage;
use crate::providers::MandrillConfig;

/// The transport configuration and message involved in one send.
pub struct SendEvent<'a> {
    /// Configuration of the transport performing the send.
    pub config: &'a MandrillConfig,
    /// The message being sent.
    pub message: &'a mut dyn MailMessage,
}

/// Notified before and after each send.
///
/// Both hooks default to doing nothing, so implementors override only what
/// they need.
///
/// ```rust,ignore
/// struct Audit;
///
/// impl SendObserver for Audit {
///     fn after_send(&self, event: &SendEvent<'_>) {
///         tracing::info!(recipients = event.message.recipient_count(), "audited");
///     }
/// }
/// ```
pub trait SendObserver: Send + Sync {
    fn before_send(&self, _event: &mut SendEvent<'_>) {}

    fn after_send(&self, _event: &SendEvent<'_>) {}
}

/// Observer built from a closure that runs before each send.
///
/// Created by [`before`].
pub struct BeforeSend<F>(F);

impl<F> SendObserver for BeforeSend<F>
where
    F: Fn(&mut SendEvent<'_>) + Send + Sync,
{
    fn before_send(&self, event: &mut SendEvent<'_>) {
        (self.0)(event)
    }
}

/// Observer built from a closure that runs after each send.
///
/// Created by [`after`].
pub struct AfterSend<F>(F);

impl<F> SendObserver for AfterSend<F>
where
    F: Fn(&SendEvent<'_>) + Send + Sync,
{
    fn after_send(&self, event: &SendEvent<'_>) {
        (self.0)(event)
    }
}

/// Run a closure before every send.
pub fn before<F>(f: F) -> BeforeSend<F>
where
    F: Fn(&mut SendEvent<'_>) + Send + Sync,
{
    BeforeSend(f)
}

/// Run a closure after every successful send.
pub fn after<F>(f: F) -> AfterSend<F>
where
    F: Fn(&SendEvent<'_>) + Send + Sync,
{
    AfterSend(f)
}
