//! Email provider implementations.
//!
//! Each provider implements the [`Mailer`](crate::Mailer) trait.
//!
//! ## Available Providers
//!
//! | Provider | Endpoint | Description |
//! |----------|----------|-------------|
//! | [`MandrillTransport`] | `messages/send-raw.json` | Mandrill (Mailchimp Transactional) raw MIME API |

mod mandrill;
pub use mandrill::{MandrillConfig, MandrillTransport, SentMessage, MESSAGE_ID_HEADER};
