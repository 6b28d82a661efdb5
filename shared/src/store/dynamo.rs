use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::env;
use uuid::Uuid;

use super::{
    sort_newest_first, EventStore, MessageStore, Result, StatsStore, StoreError, SubscriberStore,
};
use crate::models::{DonationEvent, GuestbookMessage, PostcardStatus, Subscriber};

type Item = HashMap<String, AttributeValue>;

const RECORD_KEY: &str = "recordId";
const STATS_KEY: &str = "id";
const STATS_ROW: &str = "site";
const VIEWS_ATTR: &str = "views";

/// Table names for the four collections.
#[derive(Debug, Clone)]
pub struct TableNames {
    pub events: String,
    pub messages: String,
    pub subscribers: String,
    pub stats: String,
}

impl TableNames {
    pub fn from_env() -> Self {
        let table = |var: &str, default: &str| env::var(var).unwrap_or_else(|_| default.to_string());
        TableNames {
            events: table("EVENTS_TABLE", "events"),
            messages: table("MESSAGES_TABLE", "messages"),
            subscribers: table("SUBSCRIBERS_TABLE", "subscribers"),
            stats: table("STATS_TABLE", "stats"),
        }
    }
}

impl Default for TableNames {
    fn default() -> Self {
        TableNames {
            events: "events".into(),
            messages: "messages".into(),
            subscribers: "subscribers".into(),
            stats: "stats".into(),
        }
    }
}

/// DynamoDB implementation of every site collection.
#[derive(Clone)]
pub struct DynamoStore {
    client: Client,
    tables: TableNames,
}

impl DynamoStore {
    pub async fn new() -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;
        let tables = TableNames::from_env();
        info!("Using DynamoDB tables: {:?}", tables);
        Self::with_client_and_tables(Client::new(&config), tables)
    }

    pub fn with_client_and_tables(client: Client, tables: TableNames) -> Self {
        Self { client, tables }
    }

    async fn scan_all(&self, table: &str) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        let mut start_key: Option<Item> = None;
        loop {
            let output = self
                .client
                .scan()
                .table_name(table)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| StoreError::Remote(format!("Failed to scan {}: {}", table, e)))?;

            if let Some(page) = output.items {
                items.extend(page);
            }
            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }
        debug!("Scanned {} items from {}", items.len(), table);
        Ok(items)
    }

    async fn put_new<T: Serialize>(&self, table: &str, record: &T) -> Result<()> {
        let item: Item = serde_dynamo::to_item(record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(#key)")
            .expression_attribute_names("#key", RECORD_KEY)
            .send()
            .await
            .map_err(|e| StoreError::Remote(format!("Failed to insert into {}: {}", table, e)))?;
        Ok(())
    }
}

/// Deserializes each item on its own; malformed records are skipped rather
/// than failing the whole listing.
fn decode_valid<T: DeserializeOwned>(table: &str, items: Vec<Item>) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| {
            let key = item
                .get(RECORD_KEY)
                .and_then(|v| v.as_s().ok())
                .cloned()
                .unwrap_or_default();
            match serde_dynamo::from_item(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping malformed record {} in {}: {}", key, table, e);
                    None
                }
            }
        })
        .collect()
}

fn record_key(record_id: &Option<String>) -> Result<String> {
    record_id
        .clone()
        .ok_or_else(|| StoreError::Validation("record has no store identifier".into()))
}

fn parse_views(item: Option<&Item>) -> u64 {
    item.and_then(|attrs| attrs.get(VIEWS_ATTR))
        .and_then(|v| v.as_n().ok())
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

#[async_trait]
impl EventStore for DynamoStore {
    async fn list_events(&self) -> Result<Vec<DonationEvent>> {
        let items = self.scan_all(&self.tables.events).await?;
        let mut events: Vec<DonationEvent> = decode_valid(&self.tables.events, items);
        sort_newest_first(&mut events, |e| e.date);
        Ok(events)
    }

    async fn create_event(&self, mut event: DonationEvent) -> Result<DonationEvent> {
        event.record_id.get_or_insert_with(|| Uuid::new_v4().to_string());
        self.put_new(&self.tables.events, &event).await?;
        Ok(event)
    }

    async fn update_event(&self, event: &DonationEvent) -> Result<()> {
        let key = record_key(&event.record_id)?;
        let item: Item = serde_dynamo::to_item(event)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.client
            .put_item()
            .table_name(&self.tables.events)
            .set_item(Some(item))
            .condition_expression("attribute_exists(#key)")
            .expression_attribute_names("#key", RECORD_KEY)
            .send()
            .await
            .map_err(|e| StoreError::Remote(format!("Failed to update event {}: {}", key, e)))?;
        Ok(())
    }

    async fn delete_event(&self, record_id: &str) -> Result<()> {
        self.client
            .delete_item()
            .table_name(&self.tables.events)
            .key(RECORD_KEY, AttributeValue::S(record_id.to_string()))
            .send()
            .await
            .map_err(|e| {
                StoreError::Remote(format!("Failed to delete event {}: {}", record_id, e))
            })?;
        Ok(())
    }
}

#[async_trait]
impl SubscriberStore for DynamoStore {
    async fn list_subscribers(&self) -> Result<Vec<Subscriber>> {
        let items = self.scan_all(&self.tables.subscribers).await?;
        Ok(decode_valid(&self.tables.subscribers, items))
    }

    async fn create_subscriber(&self, mut subscriber: Subscriber) -> Result<Subscriber> {
        subscriber
            .record_id
            .get_or_insert_with(|| Uuid::new_v4().to_string());
        self.put_new(&self.tables.subscribers, &subscriber).await?;
        Ok(subscriber)
    }

    async fn update_postcard_status(
        &self,
        record_id: &str,
        status: PostcardStatus,
    ) -> Result<()> {
        let value: AttributeValue = serde_dynamo::to_attribute_value(status)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.client
            .update_item()
            .table_name(&self.tables.subscribers)
            .key(RECORD_KEY, AttributeValue::S(record_id.to_string()))
            .update_expression("SET #status = :status")
            .condition_expression("attribute_exists(#key)")
            .expression_attribute_names("#status", "postcardStatus")
            .expression_attribute_names("#key", RECORD_KEY)
            .expression_attribute_values(":status", value)
            .send()
            .await
            .map_err(|e| {
                StoreError::Remote(format!(
                    "Failed to update postcard status for {}: {}",
                    record_id, e
                ))
            })?;
        Ok(())
    }
}

#[async_trait]
impl MessageStore for DynamoStore {
    async fn list_messages(&self) -> Result<Vec<GuestbookMessage>> {
        let items = self.scan_all(&self.tables.messages).await?;
        let mut messages: Vec<GuestbookMessage> = decode_valid(&self.tables.messages, items);
        sort_newest_first(&mut messages, |m| m.date);
        Ok(messages)
    }

    async fn create_message(&self, mut message: GuestbookMessage) -> Result<GuestbookMessage> {
        message
            .record_id
            .get_or_insert_with(|| Uuid::new_v4().to_string());
        self.put_new(&self.tables.messages, &message).await?;
        Ok(message)
    }
}

#[async_trait]
impl StatsStore for DynamoStore {
    async fn increment_views(&self) -> Result<u64> {
        let output = self
            .client
            .update_item()
            .table_name(&self.tables.stats)
            .key(STATS_KEY, AttributeValue::S(STATS_ROW.to_string()))
            .update_expression("ADD #views :one")
            .expression_attribute_names("#views", VIEWS_ATTR)
            .expression_attribute_values(":one", AttributeValue::N("1".to_string()))
            .return_values(ReturnValue::UpdatedNew)
            .send()
            .await
            .map_err(|e| StoreError::Remote(format!("Failed to increment views: {}", e)))?;
        Ok(parse_views(output.attributes()))
    }

    async fn get_views(&self) -> Result<u64> {
        let output = self
            .client
            .get_item()
            .table_name(&self.tables.stats)
            .key(STATS_KEY, AttributeValue::S(STATS_ROW.to_string()))
            .send()
            .await
            .map_err(|e| StoreError::Remote(format!("Failed to read views: {}", e)))?;
        Ok(parse_views(output.item()))
    }

    async fn put_views(&self, views: u64) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.tables.stats)
            .item(STATS_KEY, AttributeValue::S(STATS_ROW.to_string()))
            .item(VIEWS_ATTR, AttributeValue::N(views.to_string()))
            .send()
            .await
            .map_err(|e| StoreError::Remote(format!("Failed to write views: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_skips_malformed_items() {
        let good: Item = serde_dynamo::to_item(serde_json::json!({
            "recordId": "r1",
            "id": "1700000000000",
            "title": "Spring books",
            "date": "2024-04-01",
            "status": "ANNOUNCED",
            "description": "",
            "images": []
        }))
        .unwrap();
        let bad: Item = serde_dynamo::to_item(serde_json::json!({
            "recordId": "r2",
            "id": "2",
            "title": "Broken",
            "date": "not a date",
            "status": "ANNOUNCED"
        }))
        .unwrap();

        let events: Vec<DonationEvent> = decode_valid("events", vec![good, bad]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].record_id.as_deref(), Some("r1"));
    }

    #[test]
    fn views_default_to_zero() {
        assert_eq!(parse_views(None), 0);
        let mut item = Item::new();
        item.insert(VIEWS_ATTR.into(), AttributeValue::N("41".into()));
        assert_eq!(parse_views(Some(&item)), 41);
    }
}
