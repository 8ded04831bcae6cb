//! HTTP delivery to an external audit collector.
//!
//! [`HttpAuditNotifier`] POSTs each [`AuditEntry`] as JSON. There is exactly
//! one attempt per entry; audit is best-effort and the dispatcher bounds how
//! long an attempt may take.

use std::time::Duration;

use async_trait::async_trait;

use crate::audit::{AuditEntry, AuditError, AuditNotifier};

/// Sends audit entries to a collector URL.
pub struct HttpAuditNotifier {
    client: reqwest::Client,
    url: String,
}

impl HttpAuditNotifier {
    /// Build a notifier whose requests time out after `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AuditError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AuditNotifier for HttpAuditNotifier {
    async fn notify(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let response = self.client.post(&self.url).json(entry).send().await?;
        if !response.status().is_success() {
            return Err(AuditError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}
