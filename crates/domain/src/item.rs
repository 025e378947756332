use crate::errors::DomainError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// アイテムのパーティションキー値
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// ランダムな128bit値を32桁の16進文字列として生成
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// パスパラメータから受け取ったIDを検証
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        if raw.trim().is_empty() {
            return Err(DomainError::MissingItemId);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// テーブルの1アイテム（属性名 → JSON値）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new(attributes: Map<String, Value>) -> Self {
        Self(attributes)
    }

    /// リクエストボディをJSONオブジェクトとしてパース
    pub fn from_json_body(body: &str) -> Result<Self, DomainError> {
        parse_object(body).map(Self)
    }

    /// 主キー属性にIDを設定（既存の値は上書き）
    pub fn assign_key(&mut self, key_name: &str, id: &ItemId) {
        self.0
            .insert(key_name.to_string(), Value::String(id.as_str().to_string()));
    }

    pub fn key(&self, key_name: &str) -> Option<&str> {
        self.0.get(key_name).and_then(Value::as_str)
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.0.get(attribute)
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 部分更新で設定する属性の集合
///
/// 空でないこと、属性名が空でないこと、主キー属性を含まないことを保証する。
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeUpdates(Map<String, Value>);

impl AttributeUpdates {
    pub fn from_json_body(body: &str, key_name: &str) -> Result<Self, DomainError> {
        Self::new(parse_object(body)?, key_name)
    }

    pub fn new(attributes: Map<String, Value>, key_name: &str) -> Result<Self, DomainError> {
        if attributes.is_empty() {
            return Err(DomainError::NoAttributes);
        }
        if attributes.keys().any(|name| name.is_empty()) {
            return Err(DomainError::EmptyAttributeName);
        }
        if attributes.contains_key(key_name) {
            return Err(DomainError::KeyAttributeUpdate(key_name.to_string()));
        }
        Ok(Self(attributes))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 主キー属性が `key_name` のテーブルに適用できるか確認する
    pub fn ensure_applicable_to(&self, key_name: &str) -> Result<(), DomainError> {
        if self.is_empty() {
            return Err(DomainError::NoAttributes);
        }
        if self.0.contains_key(key_name) {
            return Err(DomainError::KeyAttributeUpdate(key_name.to_string()));
        }
        Ok(())
    }
}

fn parse_object(body: &str) -> Result<Map<String, Value>, DomainError> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(DomainError::BodyNotObject),
        Err(e) => Err(DomainError::MalformedBody(e.to_string())),
    }
}
