use log::{info, warn};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use warmcycle_shared::ai::TextWriter;
use warmcycle_shared::auth::AdminGate;
use warmcycle_shared::email::Mailer;
use warmcycle_shared::images::ImageBucket;
use warmcycle_shared::models::{
    next_timestamp_id, DonationEvent, EventDraft, GuestbookMessage, MessageDraft, PostcardStatus,
    Subscriber, SubscriberForm,
};
use warmcycle_shared::store::SiteStore;

use crate::error::{AppError, Result};

/// In-memory mirrors of the remote collections.
#[derive(Default)]
struct SiteCache {
    events: RwLock<Vec<DonationEvent>>,
    subscribers: RwLock<Vec<Subscriber>>,
    messages: RwLock<Vec<GuestbookMessage>>,
    last_event_id: Mutex<i64>,
    last_message_id: Mutex<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheCounts {
    pub events: usize,
    pub subscribers: usize,
    pub messages: usize,
}

/// Application state shared by every handler.
///
/// Every write goes to the store first; the mirrors are only touched once the
/// remote write has succeeded, and a failed write leaves them as they were.
/// Concurrent admins are not coordinated: the last write wins.
pub struct AppState<S: SiteStore> {
    pub store: Arc<S>,
    pub mailer: Mailer,
    pub writer: TextWriter,
    pub images: Option<ImageBucket>,
    pub gate: Arc<AdminGate>,
    cache: SiteCache,
}

impl<S: SiteStore> AppState<S> {
    pub fn new(
        store: Arc<S>,
        mailer: Mailer,
        writer: TextWriter,
        images: Option<ImageBucket>,
        gate: AdminGate,
    ) -> Self {
        AppState {
            store,
            mailer,
            writer,
            images,
            gate: Arc::new(gate),
            cache: SiteCache::default(),
        }
    }

    /// Replaces every mirror with the store's current contents.
    pub async fn load(&self) -> Result<CacheCounts> {
        let events = self.store.list_events().await?;
        let subscribers = self.store.list_subscribers().await?;
        let messages = self.store.list_messages().await?;

        let counts = CacheCounts {
            events: events.len(),
            subscribers: subscribers.len(),
            messages: messages.len(),
        };
        *self.cache.events.write().await = events;
        *self.cache.subscribers.write().await = subscribers;
        *self.cache.messages.write().await = messages;

        info!(
            "Loaded {} events, {} subscribers, {} messages",
            counts.events, counts.subscribers, counts.messages
        );
        Ok(counts)
    }

    pub async fn events(&self) -> Vec<DonationEvent> {
        self.cache.events.read().await.clone()
    }

    pub async fn subscribers(&self) -> Vec<Subscriber> {
        self.cache.subscribers.read().await.clone()
    }

    pub async fn messages(&self) -> Vec<GuestbookMessage> {
        self.cache.messages.read().await.clone()
    }

    async fn find_event(&self, id: &str) -> Result<DonationEvent> {
        self.cache
            .events
            .read()
            .await
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Event {} not found", id)))
    }

    async fn next_event_id(&self) -> String {
        let mut last = self.cache.last_event_id.lock().await;
        let events = self.cache.events.read().await;
        next_timestamp_id(&mut last, |id| events.iter().any(|e| e.id == id))
    }

    async fn next_message_id(&self) -> String {
        let mut last = self.cache.last_message_id.lock().await;
        let messages = self.cache.messages.read().await;
        next_timestamp_id(&mut last, |id| messages.iter().any(|m| m.id == id))
    }

    /// Persists a new event and puts it at the front of the list.
    pub async fn publish_event(&self, draft: EventDraft) -> Result<DonationEvent> {
        draft.validate()?;
        let id = self.next_event_id().await;
        let event = self.store.create_event(draft.into_event(id)).await?;
        self.cache.events.write().await.insert(0, event.clone());
        info!("Published event {} ({})", event.id, event.status);
        Ok(event)
    }

    /// Replaces the mutable fields of an existing event.
    pub async fn update_event(&self, id: &str, draft: EventDraft) -> Result<DonationEvent> {
        draft.validate()?;
        let mut event = self.find_event(id).await?;
        if event.status.is_regression_to(draft.status) {
            info!(
                "Event {} moves back from {} to {}",
                id, event.status, draft.status
            );
        }
        draft.apply_to(&mut event);

        if event.record_id.is_some() {
            self.store.update_event(&event).await?;
        } else {
            warn!("Event {} has no store identifier; updating locally only", id);
        }

        let mut events = self.cache.events.write().await;
        if let Some(slot) = events
            .iter_mut()
            .find(|e| e.id == id && e.record_id == event.record_id)
        {
            *slot = event.clone();
        }
        Ok(event)
    }

    /// Removes an event from the store and the mirror. Irreversible.
    pub async fn delete_event(&self, id: &str) -> Result<DonationEvent> {
        let event = self.find_event(id).await?;
        match event.record_id.as_deref() {
            Some(record_id) => self.store.delete_event(record_id).await?,
            None => warn!("Event {} has no store identifier; removing locally only", id),
        }
        let mut events = self.cache.events.write().await;
        if let Some(pos) = events
            .iter()
            .position(|e| e.id == id && e.record_id == event.record_id)
        {
            events.remove(pos);
        }
        drop(events);
        info!("Deleted event {}", id);
        Ok(event)
    }

    /// Stores a signup. The same email may subscribe more than once.
    pub async fn add_subscriber(&self, form: SubscriberForm) -> Result<Subscriber> {
        form.validate()?;
        let subscriber = self.store.create_subscriber(form.into_subscriber()).await?;
        self.cache
            .subscribers
            .write()
            .await
            .push(subscriber.clone());
        Ok(subscriber)
    }

    /// Sets the postcard status of the subscriber at `index` in the current
    /// list. Does not re-check that the subscriber still wants a postcard.
    ///
    /// The list may be reordered by a reload while the store write is in
    /// flight, so the mirror entry is located again by its store identifier.
    pub async fn update_postcard_status(
        &self,
        index: usize,
        status: PostcardStatus,
    ) -> Result<Subscriber> {
        let target = self
            .cache
            .subscribers
            .read()
            .await
            .get(index)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("No subscriber at index {}", index)))?;

        match target.record_id.as_deref() {
            Some(record_id) => self.store.update_postcard_status(record_id, status).await?,
            None => warn!(
                "Subscriber at index {} has no store identifier; updating locally only",
                index
            ),
        }

        let mut subscribers = self.cache.subscribers.write().await;
        let slot = match target.record_id.as_deref() {
            Some(record_id) => subscribers
                .iter_mut()
                .find(|s| s.record_id.as_deref() == Some(record_id)),
            None => subscribers.get_mut(index).filter(|s| **s == target),
        }
        .ok_or_else(|| {
            AppError::conflict(format!(
                "Subscriber at index {} changed while updating; reload and retry",
                index
            ))
        })?;
        slot.postcard_status = Some(status);
        Ok(slot.clone())
    }

    /// Appends a guestbook message; newest messages come first.
    pub async fn add_message(&self, draft: MessageDraft) -> Result<GuestbookMessage> {
        draft.validate()?;
        let id = self.next_message_id().await;
        let message = self.store.create_message(draft.into_message(id)).await?;
        self.cache.messages.write().await.insert(0, message.clone());
        Ok(message)
    }
}
