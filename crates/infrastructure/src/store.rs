use async_trait::async_trait;
use domain::{AttributeUpdates, ItemError, ItemId, Record};

/// 単一パーティションキーのテーブルに対する基本操作
///
/// 各操作は1アイテムのみを対象とし、ストア側でアトミックに適用される。
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// アイテムを挿入（同じキーがあれば上書き）
    async fn put(&self, record: &Record) -> Result<(), ItemError>;

    async fn get(&self, id: &ItemId) -> Result<Option<Record>, ItemError>;

    /// 全アイテムを取得（順序は不定）
    async fn scan(&self) -> Result<Vec<Record>, ItemError>;

    /// 指定属性のみ更新し、更新後の属性を返す
    ///
    /// アイテムが存在しなければ `ItemError::NotFound`。
    async fn update(&self, id: &ItemId, updates: &AttributeUpdates) -> Result<Record, ItemError>;

    /// アイテムを削除（存在しなくてもエラーにしない）
    async fn delete(&self, id: &ItemId) -> Result<(), ItemError>;
}
