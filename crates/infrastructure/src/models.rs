use aws_sdk_dynamodb::types::AttributeValue;
use domain::{AttributeUpdates, ItemError, ItemId, Record};
use serde_dynamo::aws_sdk_dynamodb_1::{from_item, to_attribute_value, to_item};
use std::collections::HashMap;

/// DynamoDB のアイテム表現
pub type Item = HashMap<String, AttributeValue>;

/// 更新条件で主キー属性名に使うプレースホルダー
const KEY_NAME_PLACEHOLDER: &str = "#pk";

pub fn record_to_item(record: &Record) -> Result<Item, ItemError> {
    to_item(record).map_err(|e| ItemError::Serialization(e.to_string()))
}

pub fn item_to_record(item: Item) -> Result<Record, ItemError> {
    from_item(item).map_err(|e| ItemError::Serialization(e.to_string()))
}

/// 主キーのみのアイテム（Get/Update/Delete の Key）
pub fn key_item(primary_key: &str, id: &ItemId) -> Item {
    HashMap::from([(
        primary_key.to_string(),
        AttributeValue::S(id.as_str().to_string()),
    )])
}

/// UpdateItem に渡す式一式
///
/// 属性名は予約語（`name` など）と衝突しないよう必ずプレースホルダー経由で渡す。
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateExpression {
    pub expression: String,
    pub condition: String,
    pub names: HashMap<String, String>,
    pub values: HashMap<String, AttributeValue>,
}

impl UpdateExpression {
    pub fn build(primary_key: &str, updates: &AttributeUpdates) -> Result<Self, ItemError> {
        updates.ensure_applicable_to(primary_key)?;

        let mut names = HashMap::new();
        let mut values = HashMap::new();
        let mut assignments = Vec::with_capacity(updates.len());

        let mut entries: Vec<_> = updates.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        for (index, (attribute, value)) in entries.into_iter().enumerate() {
            let name_placeholder = format!("#a{index}");
            let value_placeholder = format!(":v{index}");

            let value = to_attribute_value(value)
                .map_err(|e| ItemError::Serialization(e.to_string()))?;

            assignments.push(format!("{name_placeholder} = {value_placeholder}"));
            names.insert(name_placeholder, attribute.clone());
            values.insert(value_placeholder, value);
        }

        // 既存アイテムのみ更新する
        names.insert(KEY_NAME_PLACEHOLDER.to_string(), primary_key.to_string());

        Ok(Self {
            expression: format!("SET {}", assignments.join(", ")),
            condition: format!("attribute_exists({KEY_NAME_PLACEHOLDER})"),
            names,
            values,
        })
    }
}
