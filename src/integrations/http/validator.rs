// src/integrations/http/validator.rs
//
// HTTP reachability check
//
// ARCHITECTURE:
// - Plain GET with a browser user agent, redirects followed
// - Status code first, then page text for soft "not available" pages
//
// CRITICAL RULES:
// - This is INFRASTRUCTURE, not DOMAIN
// - Rate limiting and server errors are transient, never private/deleted

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use std::time::Duration;

use crate::domain::{Reachability, ValidationReport};
use crate::integrations::capabilities::{CapabilityError, UrlValidator};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Page text that marks removed content (checked first)
const DELETED_INDICATORS: &[&str] = &[
    "page not found",
    "this page may have been removed",
    "content has been removed",
    "no longer available",
];

/// Page text that marks content hidden behind a login or privacy setting
const PRIVATE_INDICATORS: &[&str] = &[
    "this page isn't available",
    "sorry, this page isn't available",
    "content isn't available",
    "this content isn't available",
    "private account",
    "log in to see photos",
];

pub struct HttpValidator {
    http_client: Client,
    max_attempts: usize,
    retry_delay: Duration,
}

impl HttpValidator {
    pub fn new(request_timeout: Duration) -> Result<Self, CapabilityError> {
        let http_client = Client::builder()
            .timeout(request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CapabilityError::Unsupported(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
        })
    }

    async fn fetch(&self, url: &str) -> Result<ValidationReport, reqwest::Error> {
        let response = self
            .http_client
            .get(url)
            .header(
                header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .send()
            .await?;

        let status = response.status();
        let body = if status == StatusCode::OK {
            // An unreadable body on a 200 still counts as reachable.
            response.text().await.ok()
        } else {
            None
        };

        Ok(classify_response(status.as_u16(), body.as_deref()))
    }
}

#[async_trait]
impl UrlValidator for HttpValidator {
    async fn validate(&self, url: &str) -> Result<ValidationReport, CapabilityError> {
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            match self.fetch(url).await {
                Ok(report) => return Ok(report),
                Err(e) => {
                    last_error = if e.is_timeout() {
                        "Request timed out".to_string()
                    } else {
                        e.to_string()
                    };
                    log::debug!(
                        "Validation attempt {}/{} for {} failed: {}",
                        attempt,
                        self.max_attempts,
                        url,
                        last_error
                    );
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(CapabilityError::Transient(last_error))
    }
}

/// Map an HTTP status (and page text for 200s) to a validation report.
pub fn classify_response(status: u16, body: Option<&str>) -> ValidationReport {
    let report = match status {
        200 => match body.map(classify_page_text) {
            Some(Reachability::Deleted) => {
                ValidationReport::classified(Reachability::Deleted, "Page reports content removed")
            }
            Some(Reachability::Private) => {
                ValidationReport::classified(Reachability::Private, "Page reports content unavailable")
            }
            _ => ValidationReport::accessible(None),
        },
        401 => ValidationReport::classified(Reachability::Private, "Login required"),
        403 => ValidationReport::classified(Reachability::Private, "Access forbidden"),
        404 | 410 => ValidationReport::classified(Reachability::Deleted, "Not found"),
        429 => ValidationReport::classified(Reachability::TransientError, "Rate limited"),
        other => ValidationReport::classified(
            Reachability::TransientError,
            format!("Unexpected HTTP status {}", other),
        ),
    };
    report.with_http_status(status)
}

fn classify_page_text(body: &str) -> Reachability {
    let text = body.to_lowercase();
    if DELETED_INDICATORS.iter().any(|i| text.contains(i)) {
        Reachability::Deleted
    } else if PRIVATE_INDICATORS.iter().any(|i| text.contains(i)) {
        Reachability::Private
    } else {
        Reachability::Accessible
    }
}
