use async_trait::async_trait;
use domain::{AttributeUpdates, ItemError, ItemId, Record};
use serde_json::Map;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::ItemStore;

/// プロセス内メモリのアイテムストア（テスト・ローカル実行用）
///
/// DynamoDB 実装と同じ意味論を持つ: put は上書き、update は既存アイテムのみ、
/// delete は冪等。
pub struct InMemoryItemStore {
    primary_key: String,
    items: RwLock<HashMap<String, Record>>,
}

impl InMemoryItemStore {
    pub fn new(primary_key: impl Into<String>) -> Self {
        Self {
            primary_key: primary_key.into(),
            items: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl ItemStore for InMemoryItemStore {
    async fn put(&self, record: &Record) -> Result<(), ItemError> {
        let key = record.key(&self.primary_key).ok_or_else(|| {
            ItemError::DynamoDb(format!(
                "ValidationException: missing key attribute {}",
                self.primary_key
            ))
        })?;

        self.items
            .write()
            .await
            .insert(key.to_string(), record.clone());
        Ok(())
    }

    async fn get(&self, id: &ItemId) -> Result<Option<Record>, ItemError> {
        Ok(self.items.read().await.get(id.as_str()).cloned())
    }

    async fn scan(&self) -> Result<Vec<Record>, ItemError> {
        Ok(self.items.read().await.values().cloned().collect())
    }

    async fn update(&self, id: &ItemId, updates: &AttributeUpdates) -> Result<Record, ItemError> {
        updates.ensure_applicable_to(&self.primary_key)?;

        let mut items = self.items.write().await;
        let existing = items
            .get(id.as_str())
            .ok_or_else(|| ItemError::NotFound(id.to_string()))?;

        let mut attributes = existing.attributes().clone();
        let mut changed = Map::new();
        for (name, value) in updates.iter() {
            attributes.insert(name.clone(), value.clone());
            changed.insert(name.clone(), value.clone());
        }
        items.insert(id.as_str().to_string(), Record::new(attributes));

        Ok(Record::new(changed))
    }

    async fn delete(&self, id: &ItemId) -> Result<(), ItemError> {
        self.items.write().await.remove(id.as_str());
        Ok(())
    }
}
