use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use warmcycle_shared::email::BulkEmailReport;
use warmcycle_shared::images::ImageTarget;
use warmcycle_shared::models::{
    DonationEvent, EventDraft, GuestbookMessage, PostcardStatus, StatusBadge, Subscriber,
};
use warmcycle_shared::postcards::{PostcardFilter, PostcardQueueEntry};
use warmcycle_shared::timeline::{
    extract_images, first_image, preview_text, Carousel, ImageRef, QuarterKey, TimelineView,
};

/// Preview length for collapsed timeline cards.
pub const PREVIEW_CHARS: usize = 80;

// Request DTOs

/// Comma-separated expand toggles carried by the client between requests.
#[derive(Deserialize, Debug, Default)]
pub struct TimelineQuery {
    #[serde(default)]
    pub expand: Option<String>,
    #[serde(default)]
    pub quarters: Option<String>,
}

fn split_list(value: &Option<String>) -> impl Iterator<Item = &str> {
    value
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

impl TimelineQuery {
    pub fn expanded_events(&self) -> impl Iterator<Item = &str> {
        split_list(&self.expand)
    }

    pub fn toggled_quarters(&self) -> impl Iterator<Item = QuarterKey> + '_ {
        split_list(&self.quarters).filter_map(QuarterKey::parse)
    }
}

#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PublishEventRequest {
    #[serde(flatten)]
    pub draft: EventDraft,
    #[serde(default)]
    pub notify_subscribers: bool,
}

#[derive(Deserialize, Debug, Default)]
pub struct DeleteEventQuery {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Deserialize, Debug, Default)]
pub struct PostcardQuery {
    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct PostcardStatusRequest {
    pub status: PostcardStatus,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct BulkEmailRequest {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadRequest {
    pub filename: String,
    pub content_base64: String,
    pub target: ImageTarget,
    #[serde(default)]
    pub text: String,
}

// Response DTOs

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetailsView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beneficiaries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_summary: Option<String>,
}

/// One rendered timeline card.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineItem {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    pub status: StatusBadge,
    pub description: String,
    pub preview: Option<String>,
    pub cover_image: Option<ImageRef>,
    pub gallery: Vec<String>,
    pub carousel: Option<Carousel>,
    pub details: Option<DetailsView>,
    pub donate_link: Option<String>,
    pub expanded: bool,
}

impl TimelineItem {
    pub fn build(event: DonationEvent, view: &TimelineView) -> Self {
        let mut gallery: Vec<String> = extract_images(&event.description)
            .into_iter()
            .map(|image| image.url)
            .collect();
        gallery.extend(event.images.iter().cloned());

        let details = event
            .details
            .as_ref()
            .map(|d| DetailsView {
                item_count: d.visible_item_count(),
                beneficiaries: d.visible_beneficiaries(),
                feedback_summary: d.feedback_summary.clone().filter(|s| !s.trim().is_empty()),
            })
            .filter(|d| {
                d.item_count.is_some() || d.beneficiaries.is_some() || d.feedback_summary.is_some()
            });

        TimelineItem {
            expanded: view.is_event_expanded(&event.id),
            donate_link: event.active_donation_link().map(String::from),
            preview: preview_text(&event.description, PREVIEW_CHARS),
            cover_image: first_image(&event.description)
                .or_else(|| event.images.first().map(|url| ImageRef {
                    alt: event.title.clone(),
                    url: url.clone(),
                })),
            carousel: Carousel::for_images(&gallery),
            gallery,
            details,
            status: event.status.badge(),
            id: event.id,
            title: event.title,
            date: event.date,
            description: event.description,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineQuarter {
    pub key: QuarterKey,
    pub year: i32,
    pub quarter: u32,
    pub expanded: bool,
    pub events: Vec<TimelineItem>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TimelineResponse {
    pub quarters: Vec<TimelineQuarter>,
    pub active_donation_link: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeResponse {
    pub subscriber: Subscriber,
    pub thank_you_note: String,
}

#[derive(Serialize, Debug)]
pub struct MessagesResponse {
    pub messages: Vec<GuestbookMessage>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Skipped,
    Sent,
    Failed,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOutcome {
    pub status: NotificationStatus,
    pub recipients: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NotificationOutcome {
    pub fn skipped() -> Self {
        NotificationOutcome {
            status: NotificationStatus::Skipped,
            recipients: 0,
            error: None,
        }
    }

    pub fn sent(report: BulkEmailReport) -> Self {
        NotificationOutcome {
            status: NotificationStatus::Sent,
            recipients: report.recipients,
            error: None,
        }
    }

    pub fn failed(error: String) -> Self {
        NotificationOutcome {
            status: NotificationStatus::Failed,
            recipients: 0,
            error: Some(error),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct PublishEventResponse {
    pub event: DonationEvent,
    pub notification: NotificationOutcome,
}

#[derive(Serialize, Debug)]
pub struct PostcardQueueResponse<'a> {
    pub filter: PostcardFilter,
    pub entries: Vec<PostcardQueueEntry<'a>>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadResponse {
    pub url: String,
    pub markdown: String,
    pub target: ImageTarget,
    pub text: String,
}
