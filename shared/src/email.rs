use log::{error, info};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

use crate::models::Subscriber;

const RESEND_BASE_URL: &str = "https://api.resend.com";
const DEFAULT_FROM: &str = "Warm & Cycle <noreply@warmcycle.space>";

/// The email API accepts at most 100 recipients per call; stay well under.
pub const MAX_RECIPIENTS_PER_CALL: usize = 50;

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Email request failed: {0}")]
    Request(String),

    #[error("Email API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Bulk email stopped at batch {failed_batch}; {delivered} recipients already sent: {source}")]
    PartialDelivery {
        delivered: usize,
        failed_batch: usize,
        #[source]
        source: Box<EmailError>,
    },
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct SendEmailResponse {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkEmailReport {
    pub recipients: usize,
    pub batches: usize,
}

/// Client for the transactional email API.
#[derive(Clone)]
pub struct Mailer {
    client: Client,
    api_key: String,
    from: String,
    base_url: String,
}

impl Mailer {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self::with_base_url(api_key, from, RESEND_BASE_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        from: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Mailer {
            client: Client::new(),
            api_key: api_key.into(),
            from: from.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_env() -> Self {
        let api_key = env::var("RESEND_API_KEY").unwrap_or_default();
        if api_key.is_empty() {
            log::warn!("RESEND_API_KEY is not set; outbound email will be rejected");
        }
        let from = env::var("EMAIL_FROM").unwrap_or_else(|_| DEFAULT_FROM.to_string());
        let base_url = env::var("RESEND_BASE_URL").unwrap_or_else(|_| RESEND_BASE_URL.to_string());
        Self::with_base_url(api_key, from, base_url)
    }

    /// Sends one message to up to `MAX_RECIPIENTS_PER_CALL` recipients.
    pub async fn send(
        &self,
        to: &[String],
        subject: &str,
        html: &str,
    ) -> Result<SendEmailResponse, EmailError> {
        let body = SendEmailRequest {
            from: &self.from,
            to,
            subject,
            html,
        };

        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to reach email API: {}", e);
                EmailError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or(text);
            error!("Email API returned error status {}: {}", status, message);
            return Err(EmailError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<SendEmailResponse>()
            .await
            .map_err(|e| EmailError::Request(format!("Failed to parse email response: {}", e)))
    }

    /// Sends the same message to every recipient in batches. The first failed
    /// batch aborts the rest; nothing is retried.
    pub async fn send_bulk(
        &self,
        recipients: &[String],
        subject: &str,
        html: &str,
    ) -> Result<BulkEmailReport, EmailError> {
        if recipients.is_empty() {
            info!("No recipients, skipping bulk email");
            return Ok(BulkEmailReport::default());
        }

        let mut report = BulkEmailReport::default();
        for (i, batch) in recipients.chunks(MAX_RECIPIENTS_PER_CALL).enumerate() {
            if let Err(e) = self.send(batch, subject, html).await {
                error!(
                    "Bulk email batch {} failed after {} recipients: {}",
                    i + 1,
                    report.recipients,
                    e
                );
                return Err(EmailError::PartialDelivery {
                    delivered: report.recipients,
                    failed_batch: i + 1,
                    source: Box::new(e),
                });
            }
            report.batches += 1;
            report.recipients += batch.len();
        }

        info!(
            "Sent bulk email to {} recipients in {} batches",
            report.recipients, report.batches
        );
        Ok(report)
    }
}

/// Addresses of every subscriber, skipping blank ones.
pub fn recipient_list(subscribers: &[Subscriber]) -> Vec<String> {
    subscribers
        .iter()
        .map(|s| s.email.trim())
        .filter(|email| !email.is_empty())
        .map(String::from)
        .collect()
}

static IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)\s]*)\)").expect("valid image regex"));
static LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)\s]*)\)").expect("valid link regex"));

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders the markdown subset used in campaign emails: paragraphs, line
/// breaks, images and links. Everything else is escaped text.
pub fn render_markdown_email(markdown: &str) -> String {
    let escaped = escape_html(markdown.trim());
    let with_images = IMAGE.replace_all(
        &escaped,
        r#"<img src="$2" alt="$1" style="max-width:100%;border-radius:8px" />"#,
    );
    let with_links = LINK.replace_all(&with_images, r#"<a href="$2">$1</a>"#);

    with_links
        .replace("\r\n", "\n")
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("<p>{}</p>", p.replace('\n', "<br />")))
        .collect::<Vec<_>>()
        .join("\n")
}
