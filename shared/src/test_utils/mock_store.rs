use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use crate::models::{DonationEvent, GuestbookMessage, PostcardStatus, Subscriber};
use crate::store::{
    sort_newest_first, EventStore, MessageStore, Result, StatsStore, StoreError, SubscriberStore,
};

/// In-memory store for tests. Writes can be made to fail to exercise the
/// remote-failure paths.
#[derive(Default)]
pub struct MockStore {
    events: Mutex<Vec<DonationEvent>>,
    subscribers: Mutex<Vec<Subscriber>>,
    messages: Mutex<Vec<GuestbookMessage>>,
    views: AtomicU64,
    next_record: AtomicUsize,
    fail_writes: AtomicBool,
    fail_atomic_increment: AtomicBool,
    write_gate: Arc<RwLock<()>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_atomic_increment(&self, fail: bool) {
        self.fail_atomic_increment.store(fail, Ordering::SeqCst);
    }

    /// Holds every write until the returned guard is dropped. Reads are not
    /// affected.
    pub async fn pause_writes(&self) -> OwnedRwLockWriteGuard<()> {
        self.write_gate.clone().write_owned().await
    }

    /// Replaces the stored subscribers, e.g. to simulate a different scan
    /// order on the next load.
    pub fn replace_subscribers(&self, subscribers: Vec<Subscriber>) {
        *self.subscribers.lock().unwrap() = subscribers;
    }

    /// Seeds records directly, bypassing the write-failure switch.
    pub fn seed_event(&self, mut event: DonationEvent) -> DonationEvent {
        event.record_id.get_or_insert_with(|| self.next_record_id());
        self.events.lock().unwrap().push(event.clone());
        event
    }

    pub fn seed_subscriber(&self, mut subscriber: Subscriber) -> Subscriber {
        subscriber
            .record_id
            .get_or_insert_with(|| self.next_record_id());
        self.subscribers.lock().unwrap().push(subscriber.clone());
        subscriber
    }

    pub fn seed_message(&self, mut message: GuestbookMessage) -> GuestbookMessage {
        message
            .record_id
            .get_or_insert_with(|| self.next_record_id());
        self.messages.lock().unwrap().push(message.clone());
        message
    }

    pub fn events(&self) -> Vec<DonationEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn subscribers(&self) -> Vec<Subscriber> {
        self.subscribers.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<GuestbookMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn views(&self) -> u64 {
        self.views.load(Ordering::SeqCst)
    }

    fn next_record_id(&self) -> String {
        format!("rec-{}", self.next_record.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn check_write(&self) -> Result<()> {
        let _gate = self.write_gate.read().await;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Remote("simulated write failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for MockStore {
    async fn list_events(&self) -> Result<Vec<DonationEvent>> {
        let mut events = self.events();
        sort_newest_first(&mut events, |e| e.date);
        Ok(events)
    }

    async fn create_event(&self, mut event: DonationEvent) -> Result<DonationEvent> {
        self.check_write().await?;
        event.record_id.get_or_insert_with(|| self.next_record_id());
        self.events.lock().unwrap().push(event.clone());
        Ok(event)
    }

    async fn update_event(&self, event: &DonationEvent) -> Result<()> {
        self.check_write().await?;
        let mut events = self.events.lock().unwrap();
        let existing = events
            .iter_mut()
            .find(|e| e.record_id.is_some() && e.record_id == event.record_id)
            .ok_or_else(|| StoreError::NotFound(format!("event {}", event.id)))?;
        *existing = event.clone();
        Ok(())
    }

    async fn delete_event(&self, record_id: &str) -> Result<()> {
        self.check_write().await?;
        self.events
            .lock()
            .unwrap()
            .retain(|e| e.record_id.as_deref() != Some(record_id));
        Ok(())
    }
}

#[async_trait]
impl SubscriberStore for MockStore {
    async fn list_subscribers(&self) -> Result<Vec<Subscriber>> {
        Ok(self.subscribers())
    }

    async fn create_subscriber(&self, mut subscriber: Subscriber) -> Result<Subscriber> {
        self.check_write().await?;
        subscriber
            .record_id
            .get_or_insert_with(|| self.next_record_id());
        self.subscribers.lock().unwrap().push(subscriber.clone());
        Ok(subscriber)
    }

    async fn update_postcard_status(
        &self,
        record_id: &str,
        status: PostcardStatus,
    ) -> Result<()> {
        self.check_write().await?;
        let mut subscribers = self.subscribers.lock().unwrap();
        let existing = subscribers
            .iter_mut()
            .find(|s| s.record_id.as_deref() == Some(record_id))
            .ok_or_else(|| StoreError::NotFound(format!("subscriber {}", record_id)))?;
        existing.postcard_status = Some(status);
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MockStore {
    async fn list_messages(&self) -> Result<Vec<GuestbookMessage>> {
        let mut messages = self.messages();
        sort_newest_first(&mut messages, |m| m.date);
        Ok(messages)
    }

    async fn create_message(&self, mut message: GuestbookMessage) -> Result<GuestbookMessage> {
        self.check_write().await?;
        message
            .record_id
            .get_or_insert_with(|| self.next_record_id());
        self.messages.lock().unwrap().push(message.clone());
        Ok(message)
    }
}

#[async_trait]
impl StatsStore for MockStore {
    async fn increment_views(&self) -> Result<u64> {
        if self.fail_atomic_increment.load(Ordering::SeqCst) {
            return Err(StoreError::Remote("atomic increment unavailable".into()));
        }
        Ok(self.views.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn get_views(&self) -> Result<u64> {
        Ok(self.views())
    }

    async fn put_views(&self, views: u64) -> Result<()> {
        self.check_write().await?;
        self.views.store(views, Ordering::SeqCst);
        Ok(())
    }
}
