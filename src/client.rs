//! HTTP client capability used by the transport.
//!
//! The transport only needs one thing from HTTP: POST a form and read back
//! a status and a body. [`HttpClient`] captures that, and is implemented for
//! [`reqwest::Client`]. Timeouts, proxies and TLS settings are configured on
//! the client, not on the transport.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::MailError;

/// Performs a form-encoded POST and returns the response.
///
/// Implementations decide which statuses count as failures. The
/// [`reqwest::Client`] implementation fails on any non-2xx status.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, String)],
    ) -> Result<HttpResponse, MailError>;
}

#[async_trait]
impl HttpClient for reqwest::Client {
    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, String)],
    ) -> Result<HttpResponse, MailError> {
        let response = self
            .post(url)
            .header("User-Agent", format!("mandrill-transport/{}", crate::VERSION))
            .form(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            Ok(HttpResponse::new(status.as_u16(), body))
        } else {
            Err(parse_error(status.as_u16(), &body))
        }
    }
}

#[async_trait]
impl<T: HttpClient + ?Sized> HttpClient for std::sync::Arc<T> {
    async fn post_form(
        &self,
        url: &str,
        form: &[(&str, String)],
    ) -> Result<HttpResponse, MailError> {
        (**self).post_form(url, form).await
    }
}

fn parse_error(status: u16, body: &str) -> MailError {
    let message = match serde_json::from_str::<MandrillError>(body) {
        Ok(error) => format!("[{}] {}", error.name, error.message),
        Err(_) if body.is_empty() => "Unknown error".to_string(),
        Err(_) => body.to_string(),
    };
    MailError::provider_with_status("mandrill", message, status)
}

/// Raw HTTP response from the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    status: u16,
    body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The undecoded response body.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Decode the body as JSON. Decoding happens on every call.
    pub fn json(&self) -> Result<Value, MailError> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// The `_id` of the first element of the response array.
    ///
    /// A missing element or field is `Ok(None)`; a body that is not JSON
    /// is an error.
    pub fn message_id(&self) -> Result<Option<String>, MailError> {
        let body = self.json()?;
        Ok(body
            .get(0)
            .and_then(|first| first.get("_id"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Per-recipient results of a send.
    pub fn recipient_statuses(&self) -> Result<Vec<RecipientStatus>, MailError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// One entry of the send response array.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecipientStatus {
    #[serde(default)]
    pub email: String,
    /// `sent`, `queued`, `scheduled`, `rejected` or `invalid`.
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub reject_reason: Option<String>,
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
}

impl RecipientStatus {
    pub fn is_rejected(&self) -> bool {
        matches!(self.status.as_str(), "rejected" | "invalid")
    }
}

// ============================================================================
// Mandrill API Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct MandrillError {
    #[serde(default)]
    name: String,
    message: String,
}
