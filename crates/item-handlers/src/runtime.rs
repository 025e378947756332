use infrastructure::{DynamoDbClient, ItemRepository, ItemStore};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use shared::{
    trace_lambda_handler, tracing::init_tracing, ApiGatewayProxyRequest, ApiGatewayProxyResponse,
    Config, DisabledMetrics, MetricsClient, MetricsPublisher,
};
use tracing::{error, info};

use crate::handlers::{handle, Operation};

/// Lambda 関数のエントリーポイント
///
/// 設定と DynamoDB クライアントはコールドスタート時に一度だけ作成し、
/// 以降の呼び出しで共有する。
pub async fn run(operation: Operation) -> Result<(), Error> {
    if let Err(e) = init_tracing() {
        eprintln!("トレーシング初期化エラー: {e}");
        // トレーシング初期化に失敗してもアプリケーションは継続
    }

    let config = Config::from_env().map_err(|e| {
        error!("設定読み込みエラー: {}", e);
        Error::from(format!("設定エラー: {e}"))
    })?;

    let db_client = DynamoDbClient::new(&config).await;
    info!(
        handler = operation.handler_name(),
        table = %db_client.table_name(),
        primary_key = %db_client.primary_key(),
        environment = %config.environment,
        "DynamoDBクライアント初期化完了"
    );

    let mut repository = ItemRepository::new(db_client);
    if let Some(page_size) = config.scan_page_size {
        repository = repository.with_scan_page_size(page_size);
    }
    let store: &dyn ItemStore = &repository;

    let metrics = metrics_publisher(&config).await;
    let metrics: &dyn MetricsPublisher = metrics.as_ref();
    let config = &config;

    lambda_runtime::run(service_fn(
        move |event: LambdaEvent<ApiGatewayProxyRequest>| async move {
            function_handler(operation, store, metrics, config, event).await
        },
    ))
    .await
}

/// CloudWatch メトリクス送信先（無効化されていれば何もしない）
async fn metrics_publisher(config: &Config) -> Box<dyn MetricsPublisher> {
    let Some(namespace) = &config.metrics_namespace else {
        info!("メトリクス送信は無効");
        return Box::new(DisabledMetrics);
    };

    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
    if let Some(region) = &config.aws_region {
        loader = loader.region(aws_sdk_cloudwatch::config::Region::new(region.clone()));
    }
    let aws_config = loader.load().await;

    Box::new(MetricsClient::new(
        aws_sdk_cloudwatch::Client::new(&aws_config),
        namespace.as_str(),
        config.environment.as_str(),
    ))
}

async fn function_handler(
    operation: Operation,
    store: &dyn ItemStore,
    metrics: &dyn MetricsPublisher,
    config: &Config,
    event: LambdaEvent<ApiGatewayProxyRequest>,
) -> Result<ApiGatewayProxyResponse, Error> {
    let (payload, context) = event.into_parts();

    trace_lambda_handler!(
        operation.handler_name(),
        payload,
        context,
        |payload: ApiGatewayProxyRequest, _context| async move {
            let response = handle(operation, store, metrics, config, &payload).await;
            info!(
                handler = operation.handler_name(),
                status = response.status_code,
                "リクエスト処理完了"
            );
            Ok::<ApiGatewayProxyResponse, Error>(response)
        }
    )
}
