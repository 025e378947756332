use domain::{AttributeUpdates, DomainError, ItemId, Record};
use infrastructure::ItemStore;
use serde_json::json;
use shared::{
    create_json_response, create_success_response, send_metrics, ApiGatewayProxyRequest,
    ApiGatewayProxyResponse, AppError, Config, CreateResponseBody, CustomMetric, ItemMetrics,
    LambdaErrorHandler, MetricsPublisher, UpdateResponse, ITEM_ID_PATH_PARAMETER,
};
use std::time::Instant;
use tracing::info;

/// ハンドラーの種類（1バイナリ = 1操作）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    GetOne,
    GetAll,
    Update,
    Delete,
}

impl Operation {
    pub fn handler_name(self) -> &'static str {
        match self {
            Operation::Create => "create-item",
            Operation::GetOne => "get-item",
            Operation::GetAll => "list-items",
            Operation::Update => "update-item",
            Operation::Delete => "delete-item",
        }
    }
}

/// 操作に応じたハンドラーを実行し、メトリクスを送信する
pub async fn handle(
    operation: Operation,
    store: &dyn ItemStore,
    metrics: &dyn MetricsPublisher,
    config: &Config,
    request: &ApiGatewayProxyRequest,
) -> ApiGatewayProxyResponse {
    let started = Instant::now();

    let response = match operation {
        Operation::Create => create_item(store, config, request).await,
        Operation::GetOne => get_item(store, request).await,
        Operation::GetAll => list_items(store, request).await,
        Operation::Update => update_item(store, config, request).await,
        Operation::Delete => delete_item(store, request).await,
    };

    let mut emitted: Vec<CustomMetric> = Vec::new();
    if response.status_code < 400 {
        emitted.extend(operation_metric(operation, &config.table_name));
    }
    emitted.push(ItemMetrics::request_duration(
        operation.handler_name(),
        response.status_code,
        started.elapsed().as_secs_f64() * 1000.0,
    ));
    send_metrics!(metrics, emitted);

    response
}

// 読み取り系は件数メトリクスを出さない
fn operation_metric(operation: Operation, table_name: &str) -> Option<CustomMetric> {
    match operation {
        Operation::Create => Some(ItemMetrics::item_created(table_name)),
        Operation::Update => Some(ItemMetrics::item_updated(table_name)),
        Operation::Delete => Some(ItemMetrics::item_deleted(table_name)),
        Operation::GetOne | Operation::GetAll => None,
    }
}

/// アイテムを作成し、生成したIDを主キー属性に設定する
pub async fn create_item(
    store: &dyn ItemStore,
    config: &Config,
    request: &ApiGatewayProxyRequest,
) -> ApiGatewayProxyResponse {
    respond(request, try_create_item(store, config, request).await)
}

/// IDを指定して1件取得
pub async fn get_item(
    store: &dyn ItemStore,
    request: &ApiGatewayProxyRequest,
) -> ApiGatewayProxyResponse {
    respond(request, try_get_item(store, request).await)
}

/// 全件取得
pub async fn list_items(
    store: &dyn ItemStore,
    request: &ApiGatewayProxyRequest,
) -> ApiGatewayProxyResponse {
    respond(request, try_list_items(store).await)
}

/// ボディに含まれる属性だけを部分更新
pub async fn update_item(
    store: &dyn ItemStore,
    config: &Config,
    request: &ApiGatewayProxyRequest,
) -> ApiGatewayProxyResponse {
    respond(request, try_update_item(store, config, request).await)
}

/// IDを指定して削除（存在しなくても成功）
pub async fn delete_item(
    store: &dyn ItemStore,
    request: &ApiGatewayProxyRequest,
) -> ApiGatewayProxyResponse {
    respond(request, try_delete_item(store, request).await)
}

async fn try_create_item(
    store: &dyn ItemStore,
    config: &Config,
    request: &ApiGatewayProxyRequest,
) -> Result<ApiGatewayProxyResponse, AppError> {
    let body = request_body(request)?;
    let mut record = Record::from_json_body(&body)?;

    let item_id = ItemId::generate();
    record.assign_key(&config.primary_key, &item_id);

    store.put(&record).await?;
    info!(item_id = %item_id, attributes = record.len(), "アイテム作成完了");

    let status = config.responses.create_status;
    match config.responses.create_body {
        CreateResponseBody::Item => create_json_response(status, &record),
        CreateResponseBody::Empty => Ok(create_success_response(status, json!({}))),
    }
}

async fn try_get_item(
    store: &dyn ItemStore,
    request: &ApiGatewayProxyRequest,
) -> Result<ApiGatewayProxyResponse, AppError> {
    let item_id = path_item_id(request)?;

    match store.get(&item_id).await? {
        Some(record) => create_json_response(200, &record),
        None => Err(AppError::NotFound(format!("no item with id {item_id}"))),
    }
}

async fn try_list_items(store: &dyn ItemStore) -> Result<ApiGatewayProxyResponse, AppError> {
    let records = store.scan().await?;
    info!(count = records.len(), "アイテム一覧取得完了");
    create_json_response(200, &records)
}

async fn try_update_item(
    store: &dyn ItemStore,
    config: &Config,
    request: &ApiGatewayProxyRequest,
) -> Result<ApiGatewayProxyResponse, AppError> {
    let body = request_body(request)?;
    let item_id = path_item_id(request)?;
    let updates = AttributeUpdates::from_json_body(&body, &config.primary_key)?;

    let changed = store.update(&item_id, &updates).await?;
    info!(item_id = %item_id, attributes = updates.len(), "アイテム更新完了");

    match config.responses.update {
        UpdateResponse::NoContent => Ok(create_success_response(204, json!({}))),
        UpdateResponse::UpdatedAttributes => create_json_response(200, &changed),
    }
}

async fn try_delete_item(
    store: &dyn ItemStore,
    request: &ApiGatewayProxyRequest,
) -> Result<ApiGatewayProxyResponse, AppError> {
    let item_id = path_item_id(request)?;

    store.delete(&item_id).await?;
    info!(item_id = %item_id, "アイテム削除完了");

    Ok(create_success_response(
        200,
        json!({ "description": "Successfully deleted." }),
    ))
}

/// 空白のみのボディはボディなしとして扱う
fn request_body(request: &ApiGatewayProxyRequest) -> Result<String, AppError> {
    request
        .body_text()?
        .filter(|body| !body.trim().is_empty())
        .ok_or_else(|| DomainError::MissingBody.into())
}

fn path_item_id(request: &ApiGatewayProxyRequest) -> Result<ItemId, AppError> {
    let raw = request
        .path_parameter(ITEM_ID_PATH_PARAMETER)
        .unwrap_or_default();
    Ok(ItemId::parse(raw)?)
}

fn respond(
    request: &ApiGatewayProxyRequest,
    result: Result<ApiGatewayProxyResponse, AppError>,
) -> ApiGatewayProxyResponse {
    result.unwrap_or_else(|error| LambdaErrorHandler::to_api_gateway_response(&error, request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use domain::ItemError;
    use infrastructure::InMemoryItemStore;
    use serde_json::Value;
    use shared::ResponseConventions;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    const PRIMARY_KEY: &str = "itemID";

    /// 常に失敗するストア
    struct FailingStore;

    #[async_trait]
    impl ItemStore for FailingStore {
        async fn put(&self, _record: &Record) -> Result<(), ItemError> {
            Err(ItemError::DynamoDb("AccessDeniedException".to_string()))
        }

        async fn get(&self, _id: &ItemId) -> Result<Option<Record>, ItemError> {
            Err(ItemError::DynamoDb("AccessDeniedException".to_string()))
        }

        async fn scan(&self) -> Result<Vec<Record>, ItemError> {
            Err(ItemError::DynamoDb("ResourceNotFoundException".to_string()))
        }

        async fn update(
            &self,
            _id: &ItemId,
            _updates: &AttributeUpdates,
        ) -> Result<Record, ItemError> {
            Err(ItemError::DynamoDb("AccessDeniedException".to_string()))
        }

        async fn delete(&self, _id: &ItemId) -> Result<(), ItemError> {
            Err(ItemError::DynamoDb("AccessDeniedException".to_string()))
        }
    }

    /// 送信されたメトリクスを記録する
    #[derive(Default)]
    struct RecordingMetrics {
        published: Mutex<Vec<CustomMetric>>,
    }

    #[async_trait]
    impl MetricsPublisher for RecordingMetrics {
        async fn publish(&self, metrics: Vec<CustomMetric>) -> Result<(), AppError> {
            self.published.lock().unwrap().extend(metrics);
            Ok(())
        }
    }

    struct UnreachableMetrics;

    #[async_trait]
    impl MetricsPublisher for UnreachableMetrics {
        async fn publish(&self, _metrics: Vec<CustomMetric>) -> Result<(), AppError> {
            Err(AppError::ExternalService("CloudWatch unreachable".to_string()))
        }
    }

    fn test_config() -> Config {
        Config {
            table_name: "items".to_string(),
            primary_key: PRIMARY_KEY.to_string(),
            environment: "test".to_string(),
            aws_region: None,
            dynamodb_endpoint: None,
            retry_max_attempts: 1,
            scan_page_size: None,
            metrics_namespace: None,
            responses: ResponseConventions::default(),
        }
    }

    fn create_test_request(id: Option<&str>, body: Option<&str>) -> ApiGatewayProxyRequest {
        ApiGatewayProxyRequest {
            path_parameters: id.map(|id| HashMap::from([("id".to_string(), id.to_string())])),
            body: body.map(str::to_string),
            ..Default::default()
        }
    }

    fn description(response: &ApiGatewayProxyResponse) -> String {
        response.json_body().unwrap()["description"]
            .as_str()
            .unwrap_or_default()
            .to_string()
    }

    async fn seed(store: &InMemoryItemStore, value: Value) {
        let record: Record = serde_json::from_value(value).unwrap();
        store.put(&record).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_item_assigns_generated_id() {
        // Arrange
        let store = InMemoryItemStore::new(PRIMARY_KEY);
        let config = test_config();
        let request = create_test_request(None, Some(r#"{"name": "foo"}"#));

        // Act
        let response = create_item(&store, &config, &request).await;

        // Assert: 201 で生成IDと元の属性が返る
        assert_eq!(response.status_code, 201);
        let body = response.json_body().unwrap();
        assert_eq!(body["name"], "foo");
        let id = body[PRIMARY_KEY].as_str().unwrap();
        assert_eq!(id.len(), 32);

        let stored = store.get(&ItemId::parse(id).unwrap()).await.unwrap();
        assert_eq!(stored.unwrap().get("name"), Some(&serde_json::json!("foo")));
    }

    #[tokio::test]
    async fn test_create_item_ids_are_unique() {
        let store = InMemoryItemStore::new(PRIMARY_KEY);
        let config = test_config();
        let request = create_test_request(None, Some(r#"{"name": "foo"}"#));

        let mut ids = HashSet::new();
        for _ in 0..50 {
            let response = create_item(&store, &config, &request).await;
            ids.insert(response.json_body().unwrap()[PRIMARY_KEY].to_string());
        }

        assert_eq!(ids.len(), 50);
        assert_eq!(store.len().await, 50);
    }

    #[tokio::test]
    async fn test_create_item_overrides_client_supplied_key() {
        let store = InMemoryItemStore::new(PRIMARY_KEY);
        let request = create_test_request(None, Some(r#"{"itemID": "mine", "name": "foo"}"#));

        let response = create_item(&store, &test_config(), &request).await;

        assert_ne!(response.json_body().unwrap()[PRIMARY_KEY], "mine");
    }

    #[tokio::test]
    async fn test_create_item_empty_response_convention() {
        let store = InMemoryItemStore::new(PRIMARY_KEY);
        let mut config = test_config();
        config.responses.create_status = 200;
        config.responses.create_body = CreateResponseBody::Empty;
        let request = create_test_request(None, Some(r#"{"name": "foo"}"#));

        let response = create_item(&store, &config, &request).await;

        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, "{}");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_create_item_rejects_missing_or_invalid_body() {
        let store = InMemoryItemStore::new(PRIMARY_KEY);
        let config = test_config();

        for body in [None, Some(""), Some("not json"), Some("[1, 2]"), Some("\"text\"")] {
            let response = create_item(&store, &config, &create_test_request(None, body)).await;

            assert_eq!(response.status_code, 400, "body: {body:?}");
            assert!(description(&response).starts_with("Bad request."));
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_create_item_store_failure() {
        let request = create_test_request(None, Some(r#"{"name": "foo"}"#));

        let response = create_item(&FailingStore, &test_config(), &request).await;

        assert_eq!(response.status_code, 500);
        assert_eq!(
            description(&response),
            "Internal server error. AccessDeniedException"
        );
    }

    #[tokio::test]
    async fn test_get_item_found() {
        let store = InMemoryItemStore::new(PRIMARY_KEY);
        seed(&store, serde_json::json!({"itemID": "abc", "name": "foo"})).await;

        let response = get_item(&store, &create_test_request(Some("abc"), None)).await;

        assert_eq!(response.status_code, 200);
        assert_eq!(
            response.json_body().unwrap(),
            serde_json::json!({"itemID": "abc", "name": "foo"})
        );
    }

    #[tokio::test]
    async fn test_get_item_not_found() {
        let store = InMemoryItemStore::new(PRIMARY_KEY);

        let response = get_item(&store, &create_test_request(Some("abc"), None)).await;

        assert_eq!(response.status_code, 404);
        assert_eq!(description(&response), "Not found. no item with id abc");
    }

    #[tokio::test]
    async fn test_handlers_reject_missing_path_id() {
        let store = InMemoryItemStore::new(PRIMARY_KEY);
        let config = test_config();
        let body = Some(r#"{"name": "bar"}"#);

        let responses = [
            get_item(&store, &create_test_request(None, None)).await,
            get_item(&store, &create_test_request(Some(""), None)).await,
            update_item(&store, &config, &create_test_request(None, body)).await,
            delete_item(&store, &create_test_request(None, None)).await,
        ];

        for response in responses {
            assert_eq!(response.status_code, 400);
            assert_eq!(
                description(&response),
                "Bad request. invalid request, you are missing the path parameter id"
            );
        }
    }

    #[tokio::test]
    async fn test_list_items() {
        let store = InMemoryItemStore::new(PRIMARY_KEY);
        seed(&store, serde_json::json!({"itemID": "a", "name": "foo"})).await;
        seed(&store, serde_json::json!({"itemID": "b", "name": "bar"})).await;

        let response = list_items(&store, &create_test_request(None, None)).await;

        assert_eq!(response.status_code, 200);
        let body = response.json_body().unwrap();
        let mut ids: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item[PRIMARY_KEY].as_str().unwrap())
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_list_items_empty_and_failure() {
        let store = InMemoryItemStore::new(PRIMARY_KEY);
        let response = list_items(&store, &create_test_request(None, None)).await;
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, "[]");

        let response = list_items(&FailingStore, &create_test_request(None, None)).await;
        assert_eq!(response.status_code, 500);
        assert!(description(&response).starts_with("Internal server error."));
    }

    #[tokio::test]
    async fn test_update_item_changes_only_given_attributes() {
        // Arrange
        let store = InMemoryItemStore::new(PRIMARY_KEY);
        seed(
            &store,
            serde_json::json!({"itemID": "abc", "name": "foo", "size": 3}),
        )
        .await;
        let request = create_test_request(Some("abc"), Some(r#"{"name": "bar"}"#));

        // Act
        let response = update_item(&store, &test_config(), &request).await;

        // Assert
        assert_eq!(response.status_code, 204);
        assert_eq!(response.body, "{}");
        let stored = store
            .get(&ItemId::parse("abc").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            serde_json::to_value(&stored).unwrap(),
            serde_json::json!({"itemID": "abc", "name": "bar", "size": 3})
        );
    }

    #[tokio::test]
    async fn test_update_item_updated_attributes_convention() {
        let store = InMemoryItemStore::new(PRIMARY_KEY);
        seed(
            &store,
            serde_json::json!({"itemID": "abc", "name": "foo", "color": "red"}),
        )
        .await;
        let mut config = test_config();
        config.responses.update = UpdateResponse::UpdatedAttributes;
        let request = create_test_request(Some("abc"), Some(r#"{"name": "bar", "size": 1}"#));

        let response = update_item(&store, &config, &request).await;

        assert_eq!(response.status_code, 200);
        assert_eq!(
            response.json_body().unwrap(),
            serde_json::json!({"name": "bar", "size": 1})
        );
        // 指定した2属性だけが変わり、それ以外は残る
        let stored = store
            .get(&ItemId::parse("abc").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            serde_json::to_value(&stored).unwrap(),
            serde_json::json!({"itemID": "abc", "name": "bar", "size": 1, "color": "red"})
        );
    }

    #[tokio::test]
    async fn test_update_item_validation() {
        let store = InMemoryItemStore::new(PRIMARY_KEY);
        seed(&store, serde_json::json!({"itemID": "abc", "name": "foo"})).await;
        let config = test_config();

        let cases = [
            (create_test_request(Some("abc"), None), "missing the parameter body"),
            (create_test_request(Some("abc"), Some("{}")), "no arguments provided"),
            (create_test_request(Some("abc"), Some("[]")), "must be a JSON object"),
            (
                create_test_request(Some("abc"), Some(r#"{"itemID": "other"}"#)),
                "cannot be updated",
            ),
        ];

        for (request, expected) in cases {
            let response = update_item(&store, &config, &request).await;
            assert_eq!(response.status_code, 400);
            let text = description(&response);
            assert!(text.starts_with("Bad request."), "{text}");
            assert!(text.contains(expected), "{text}");
        }

        // 元のアイテムは変わらない
        let stored = store
            .get(&ItemId::parse("abc").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.get("name"), Some(&serde_json::json!("foo")));
    }

    #[tokio::test]
    async fn test_update_item_missing_record() {
        let store = InMemoryItemStore::new(PRIMARY_KEY);
        let request = create_test_request(Some("abc"), Some(r#"{"name": "bar"}"#));

        let response = update_item(&store, &test_config(), &request).await;

        assert_eq!(response.status_code, 404);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_item_is_idempotent() {
        let store = InMemoryItemStore::new(PRIMARY_KEY);
        seed(&store, serde_json::json!({"itemID": "abc"})).await;
        let request = create_test_request(Some("abc"), None);

        let first = delete_item(&store, &request).await;
        let second = delete_item(&store, &request).await;

        for response in [first, second] {
            assert_eq!(response.status_code, 200);
            assert_eq!(description(&response), "Successfully deleted.");
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_item_store_failure() {
        let response = delete_item(&FailingStore, &create_test_request(Some("abc"), None)).await;
        assert_eq!(response.status_code, 500);
    }

    #[tokio::test]
    async fn test_handle_dispatches_operation() {
        let store = InMemoryItemStore::new(PRIMARY_KEY);
        let config = test_config();
        let created = handle(
            Operation::Create,
            &store,
            &RecordingMetrics::default(),
            &config,
            &create_test_request(None, Some(r#"{"name": "foo"}"#)),
        )
        .await;
        let id = created.json_body().unwrap()[PRIMARY_KEY]
            .as_str()
            .unwrap()
            .to_string();

        let fetched = handle(
            Operation::GetOne,
            &store,
            &RecordingMetrics::default(),
            &config,
            &create_test_request(Some(&id), None),
        )
        .await;

        assert_eq!(fetched.status_code, 200);
        assert_eq!(Operation::GetAll.handler_name(), "list-items");
    }

    #[tokio::test]
    async fn test_handle_publishes_operation_and_duration_metrics() {
        // Arrange
        let store = InMemoryItemStore::new(PRIMARY_KEY);
        let metrics = RecordingMetrics::default();
        let config = test_config();
        let request = create_test_request(None, Some(r#"{"name": "foo"}"#));

        // Act
        let response = handle(Operation::Create, &store, &metrics, &config, &request).await;

        // Assert
        assert_eq!(response.status_code, 201);
        let published = metrics.published.lock().unwrap();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].name, "ItemOperations");
        assert_eq!(published[0].dimension("Operation"), Some("CreateItem"));
        assert_eq!(published[0].dimension("TableName"), Some("items"));
        assert_eq!(published[1].name, "RequestDuration");
        assert_eq!(published[1].dimension("Handler"), Some("create-item"));
        assert_eq!(published[1].dimension("StatusCode"), Some("201"));
    }

    #[tokio::test]
    async fn test_handle_failed_request_publishes_duration_only() {
        let store = InMemoryItemStore::new(PRIMARY_KEY);
        let metrics = RecordingMetrics::default();
        let request = create_test_request(Some("missing"), None);

        let response = handle(Operation::Delete, &store, &metrics, &test_config(), &request).await;
        assert_eq!(response.status_code, 200);
        let response = handle(Operation::GetOne, &store, &metrics, &test_config(), &request).await;
        assert_eq!(response.status_code, 404);

        let published = metrics.published.lock().unwrap();
        let names: Vec<_> = published
            .iter()
            .map(|m| (m.name, m.dimension("Operation")))
            .collect();
        assert_eq!(
            names,
            vec![
                ("ItemOperations", Some("DeleteItem")),
                ("RequestDuration", None),
                ("RequestDuration", None),
            ]
        );
        assert_eq!(published[2].dimension("StatusCode"), Some("404"));
    }

    #[tokio::test]
    async fn test_handle_ignores_metrics_failure() {
        let store = InMemoryItemStore::new(PRIMARY_KEY);
        let request = create_test_request(None, Some(r#"{"name": "foo"}"#));

        let response = handle(
            Operation::Create,
            &store,
            &UnreachableMetrics,
            &test_config(),
            &request,
        )
        .await;

        assert_eq!(response.status_code, 201);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_error_responses_carry_cors_headers() {
        let store = InMemoryItemStore::new(PRIMARY_KEY);

        let response = get_item(&store, &create_test_request(None, None)).await;

        assert_eq!(
            response.headers.get("Access-Control-Allow-Origin"),
            Some(&"*".to_string())
        );
        assert!(response.headers.contains_key("X-Request-ID"));
    }
}
