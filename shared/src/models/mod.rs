use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod status;

pub use status::{EventStatus, StatusBadge};

/// Domain identifiers are derived from the creation time in milliseconds.
///
/// `last` holds the previously issued value; the result is always greater
/// than it and never one that `taken` reports as already in use, so two
/// records created in the same millisecond still get distinct ids.
pub fn next_timestamp_id<F>(last: &mut i64, taken: F) -> String
where
    F: Fn(&str) -> bool,
{
    let mut candidate = Utc::now().timestamp_millis().max(*last + 1);
    while taken(&candidate.to_string()) {
        candidate += 1;
    }
    *last = candidate;
    candidate.to_string()
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{0} is required when a postcard is requested")]
    MissingPostcardField(&'static str),
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn is_blank_opt(value: &Option<String>) -> bool {
    value.as_deref().map(is_blank).unwrap_or(true)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beneficiaries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_summary: Option<String>,
}

impl EventDetails {
    /// Counters are only displayed when positive.
    pub fn visible_item_count(&self) -> Option<u32> {
        self.item_count.filter(|n| *n > 0)
    }

    pub fn visible_beneficiaries(&self) -> Option<u32> {
        self.beneficiaries.filter(|n| *n > 0)
    }
}

/// One donation campaign or campaign update.
///
/// `record_id` is the key assigned by the persistence layer and is distinct
/// from the domain `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    pub status: EventStatus,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub donation_link: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<EventDetails>,
}

impl DonationEvent {
    pub fn is_collecting(&self) -> bool {
        self.status.is_collecting()
    }

    /// The donation link is only consulted while the event is collecting.
    pub fn active_donation_link(&self) -> Option<&str> {
        if !self.is_collecting() {
            return None;
        }
        self.donation_link
            .as_deref()
            .map(str::trim)
            .filter(|link| !link.is_empty())
    }
}

/// Editable fields of an event as submitted by an administrator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub status: EventStatus,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub donation_link: Option<String>,
}

impl EventDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if is_blank(&self.title) {
            return Err(ValidationError::MissingField("title"));
        }
        if is_blank(&self.description) {
            return Err(ValidationError::MissingField("description"));
        }
        Ok(())
    }

    /// Link to store for this draft; dropped unless the status is Collecting.
    pub fn stored_donation_link(&self) -> Option<String> {
        if !self.status.is_collecting() {
            return None;
        }
        self.donation_link
            .as_ref()
            .map(|link| link.trim().to_string())
            .filter(|link| !link.is_empty())
    }

    pub fn into_event(self, id: String) -> DonationEvent {
        let donation_link = self.stored_donation_link();
        DonationEvent {
            record_id: None,
            id,
            title: self.title,
            date: self.date.unwrap_or_else(today),
            status: self.status,
            description: self.description,
            donation_link,
            images: Vec::new(),
            details: Some(EventDetails {
                item_count: Some(0),
                beneficiaries: Some(0),
                feedback_summary: None,
            }),
        }
    }

    /// Full replacement of the mutable fields of `event`.
    pub fn apply_to(&self, event: &mut DonationEvent) {
        event.title = self.title.clone();
        if let Some(date) = self.date {
            event.date = date;
        }
        event.status = self.status;
        event.description = self.description.clone();
        event.donation_link = self.stored_donation_link();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostcardStatus {
    Pending,
    Sent,
    Skipped,
}

/// A person who opted into updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub wants_postcard: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcard_status: Option<PostcardStatus>,
    #[serde(
        default,
        alias = "postcardYear",
        skip_serializing_if = "Option::is_none"
    )]
    pub postcard_period: Option<String>,
}

impl Subscriber {
    /// Records without an explicit postcard status count as pending.
    pub fn effective_postcard_status(&self) -> PostcardStatus {
        self.postcard_status.unwrap_or(PostcardStatus::Pending)
    }
}

/// Signup form submission.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub wants_postcard: bool,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub postcard_period: Option<String>,
}

impl SubscriberForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if is_blank(&self.name) {
            return Err(ValidationError::MissingField("name"));
        }
        if is_blank(&self.email) {
            return Err(ValidationError::MissingField("email"));
        }
        if self.wants_postcard {
            if is_blank_opt(&self.address) {
                return Err(ValidationError::MissingPostcardField("address"));
            }
            if is_blank_opt(&self.phone) {
                return Err(ValidationError::MissingPostcardField("phone"));
            }
        }
        Ok(())
    }

    /// Builds the record to persist. Mailing details are dropped when no
    /// postcard was requested.
    pub fn into_subscriber(self) -> Subscriber {
        let wants_postcard = self.wants_postcard;
        let keep = |value: Option<String>| {
            value
                .filter(|_| wants_postcard)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Subscriber {
            record_id: None,
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            wants_postcard,
            address: keep(self.address),
            zip: keep(self.zip),
            phone: keep(self.phone),
            postcard_status: wants_postcard.then_some(PostcardStatus::Pending),
            postcard_period: keep(self.postcard_period),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageRole {
    #[default]
    Donor,
    Student,
    Volunteer,
}

/// A public guestbook comment. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestbookMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    pub id: String,
    pub author: String,
    #[serde(default)]
    pub role: MessageRole,
    pub content: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub likes: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDraft {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub role: Option<MessageRole>,
}

impl MessageDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if is_blank(&self.author) {
            return Err(ValidationError::MissingField("author"));
        }
        if is_blank(&self.content) {
            return Err(ValidationError::MissingField("content"));
        }
        Ok(())
    }

    pub fn into_message(self, id: String) -> GuestbookMessage {
        GuestbookMessage {
            record_id: None,
            id,
            author: self.author.trim().to_string(),
            role: self.role.unwrap_or_default(),
            content: self.content.trim().to_string(),
            date: today(),
            likes: 0,
        }
    }
}
