use async_trait::async_trait;
use thiserror::Error;

use crate::models::{DonationEvent, GuestbookMessage, PostcardStatus, Subscriber};

pub mod dynamo;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Invalid record: {0}")]
    Validation(String),

    #[error("Remote store error: {0}")]
    Remote(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// The `events` collection. Listing is ordered by date, newest first.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn list_events(&self) -> Result<Vec<DonationEvent>>;
    /// Persists a new event and returns it with its `record_id` assigned.
    async fn create_event(&self, event: DonationEvent) -> Result<DonationEvent>;
    async fn update_event(&self, event: &DonationEvent) -> Result<()>;
    async fn delete_event(&self, record_id: &str) -> Result<()>;
}

#[async_trait]
pub trait SubscriberStore: Send + Sync {
    async fn list_subscribers(&self) -> Result<Vec<Subscriber>>;
    async fn create_subscriber(&self, subscriber: Subscriber) -> Result<Subscriber>;
    async fn update_postcard_status(&self, record_id: &str, status: PostcardStatus)
        -> Result<()>;
}

/// The `messages` collection. Append-only; listing is newest first.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn list_messages(&self) -> Result<Vec<GuestbookMessage>>;
    async fn create_message(&self, message: GuestbookMessage) -> Result<GuestbookMessage>;
}

/// The `stats` collection.
#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Atomically adds one to the page-view counter.
    async fn increment_views(&self) -> Result<u64>;
    async fn get_views(&self) -> Result<u64>;
    async fn put_views(&self, views: u64) -> Result<()>;

    /// Atomic increment with a read-then-write fallback. The fallback can
    /// double count under concurrent viewers.
    async fn record_page_view(&self) -> Result<u64> {
        match self.increment_views().await {
            Ok(views) => Ok(views),
            Err(e) => {
                log::warn!("Atomic view increment failed, falling back: {}", e);
                let views = self.get_views().await? + 1;
                self.put_views(views).await?;
                Ok(views)
            }
        }
    }
}

/// Everything the site needs from persistence.
pub trait SiteStore: EventStore + SubscriberStore + MessageStore + StatsStore + 'static {}

impl<T> SiteStore for T where T: EventStore + SubscriberStore + MessageStore + StatsStore + 'static {}

/// Sorts by date, newest first. Stable, so equal dates keep store order.
pub fn sort_newest_first<T, F>(items: &mut [T], date_of: F)
where
    F: Fn(&T) -> chrono::NaiveDate,
{
    items.sort_by(|a, b| date_of(b).cmp(&date_of(a)));
}
