use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::ReturnValue;
use domain::{AttributeUpdates, ItemError, ItemId, Record};
use shared::telemetry::trace_aws_operation;
use tracing::debug;

use crate::models::{item_to_record, key_item, record_to_item, Item, UpdateExpression};
use crate::{DynamoDbClient, ItemStore};

const SERVICE: &str = "dynamodb";

/// DynamoDB テーブルを使ったアイテムリポジトリ
#[derive(Clone)]
pub struct ItemRepository {
    db: DynamoDbClient,
    scan_page_size: Option<i32>,
}

impl ItemRepository {
    pub fn new(db: DynamoDbClient) -> Self {
        Self {
            db,
            scan_page_size: None,
        }
    }

    /// Scan 1回あたりの読み取り件数を制限する（結果は全ページ分返す）
    pub fn with_scan_page_size(mut self, page_size: i32) -> Self {
        self.scan_page_size = Some(page_size);
        self
    }

    pub fn primary_key(&self) -> &str {
        self.db.primary_key()
    }
}

fn dynamodb_error<E: std::error::Error>(error: E) -> ItemError {
    ItemError::DynamoDb(DisplayErrorContext(&error).to_string())
}

#[async_trait]
impl ItemStore for ItemRepository {
    async fn put(&self, record: &Record) -> Result<(), ItemError> {
        let table = self.db.table_name();
        let item = record_to_item(record)?;

        trace_aws_operation(
            SERVICE,
            table,
            "PutItem",
            self.db
                .client()
                .put_item()
                .table_name(table)
                .set_item(Some(item))
                .send(),
        )
        .await
        .map_err(dynamodb_error)?;

        Ok(())
    }

    async fn get(&self, id: &ItemId) -> Result<Option<Record>, ItemError> {
        let table = self.db.table_name();

        let output = trace_aws_operation(
            SERVICE,
            table,
            "GetItem",
            self.db
                .client()
                .get_item()
                .table_name(table)
                .set_key(Some(key_item(self.primary_key(), id)))
                .send(),
        )
        .await
        .map_err(dynamodb_error)?;

        output.item().cloned().map(item_to_record).transpose()
    }

    async fn scan(&self) -> Result<Vec<Record>, ItemError> {
        let table = self.db.table_name();
        let mut records = Vec::new();
        let mut start_key: Option<Item> = None;

        // LastEvaluatedKey がなくなるまでページを辿る
        loop {
            let output = trace_aws_operation(
                SERVICE,
                table,
                "Scan",
                self.db
                    .client()
                    .scan()
                    .table_name(table)
                    .set_limit(self.scan_page_size)
                    .set_exclusive_start_key(start_key.take())
                    .send(),
            )
            .await
            .map_err(dynamodb_error)?;

            for item in output.items() {
                records.push(item_to_record(item.clone())?);
            }

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => {
                    debug!(fetched = records.len(), "Scan continues with next page");
                    start_key = Some(key.clone());
                }
                _ => break,
            }
        }

        Ok(records)
    }

    async fn update(&self, id: &ItemId, updates: &AttributeUpdates) -> Result<Record, ItemError> {
        let table = self.db.table_name();
        let update = UpdateExpression::build(self.primary_key(), updates)?;

        let result = trace_aws_operation(
            SERVICE,
            table,
            "UpdateItem",
            self.db
                .client()
                .update_item()
                .table_name(table)
                .set_key(Some(key_item(self.primary_key(), id)))
                .update_expression(update.expression)
                .condition_expression(update.condition)
                .set_expression_attribute_names(Some(update.names))
                .set_expression_attribute_values(Some(update.values))
                .return_values(ReturnValue::UpdatedNew)
                .send(),
        )
        .await;

        match result {
            Ok(output) => Ok(output
                .attributes()
                .cloned()
                .map(item_to_record)
                .transpose()?
                .unwrap_or_default()),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
            {
                Err(ItemError::NotFound(id.to_string()))
            }
            Err(e) => Err(dynamodb_error(e)),
        }
    }

    async fn delete(&self, id: &ItemId) -> Result<(), ItemError> {
        let table = self.db.table_name();

        trace_aws_operation(
            SERVICE,
            table,
            "DeleteItem",
            self.db
                .client()
                .delete_item()
                .table_name(table)
                .set_key(Some(key_item(self.primary_key(), id)))
                .send(),
        )
        .await
        .map_err(dynamodb_error)?;

        Ok(())
    }
}
