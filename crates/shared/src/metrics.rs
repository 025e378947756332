use async_trait::async_trait;
use aws_sdk_cloudwatch::primitives::DateTime as AwsDateTime;
use aws_sdk_cloudwatch::types::{Dimension, MetricDatum, StandardUnit};
use aws_sdk_cloudwatch::Client as CloudWatchClient;
use std::time::SystemTime;
use tracing::debug;

use crate::errors::AppError;

// PutMetricData 1回あたりの上限
const BATCH_SIZE: usize = 20;

/// 送信するカスタムメトリクス
#[derive(Debug, Clone, PartialEq)]
pub struct CustomMetric {
    pub name: &'static str,
    pub value: f64,
    pub unit: StandardUnit,
    pub dimensions: Vec<(&'static str, String)>,
    pub timestamp: SystemTime,
}

impl CustomMetric {
    pub fn count(name: &'static str, value: f64, dimensions: Vec<(&'static str, String)>) -> Self {
        Self {
            name,
            value,
            unit: StandardUnit::Count,
            dimensions,
            timestamp: SystemTime::now(),
        }
    }

    pub fn duration_ms(
        name: &'static str,
        duration_ms: f64,
        dimensions: Vec<(&'static str, String)>,
    ) -> Self {
        Self {
            unit: StandardUnit::Milliseconds,
            ..Self::count(name, duration_ms, dimensions)
        }
    }

    pub fn dimension(&self, name: &str) -> Option<&str> {
        self.dimensions
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// アイテム操作のビジネスメトリクス
pub struct ItemMetrics;

impl ItemMetrics {
    pub fn item_created(table_name: &str) -> CustomMetric {
        Self::item_operation(table_name, "CreateItem", 1.0)
    }

    pub fn item_updated(table_name: &str) -> CustomMetric {
        Self::item_operation(table_name, "UpdateItem", 1.0)
    }

    pub fn item_deleted(table_name: &str) -> CustomMetric {
        Self::item_operation(table_name, "DeleteItem", 1.0)
    }

    pub fn request_duration(handler: &str, status_code: u16, duration_ms: f64) -> CustomMetric {
        CustomMetric::duration_ms(
            "RequestDuration",
            duration_ms,
            vec![
                ("Handler", handler.to_string()),
                ("StatusCode", status_code.to_string()),
            ],
        )
    }

    fn item_operation(table_name: &str, operation: &'static str, value: f64) -> CustomMetric {
        CustomMetric::count(
            "ItemOperations",
            value,
            vec![
                ("TableName", table_name.to_string()),
                ("Operation", operation.to_string()),
            ],
        )
    }
}

/// メトリクスの送信先
#[async_trait]
pub trait MetricsPublisher: Send + Sync {
    async fn publish(&self, metrics: Vec<CustomMetric>) -> Result<(), AppError>;
}

/// 送信しない（`METRICS_ENABLED=false`、ローカル実行用）
pub struct DisabledMetrics;

#[async_trait]
impl MetricsPublisher for DisabledMetrics {
    async fn publish(&self, metrics: Vec<CustomMetric>) -> Result<(), AppError> {
        debug!(count = metrics.len(), "メトリクス送信は無効");
        Ok(())
    }
}

/// CloudWatch カスタムメトリクス送信クライアント
#[derive(Clone)]
pub struct MetricsClient {
    client: CloudWatchClient,
    namespace: String,
    environment: String,
}

impl MetricsClient {
    pub fn new(
        client: CloudWatchClient,
        namespace: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            environment: environment.into(),
        }
    }

    fn to_datum(&self, metric: &CustomMetric) -> Result<MetricDatum, AppError> {
        let dimensions = std::iter::once(("Environment", self.environment.as_str()))
            .chain(metric.dimensions.iter().map(|(k, v)| (*k, v.as_str())))
            .map(|(name, value)| {
                Ok::<_, AppError>(Dimension::builder().name(name).value(value).build())
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MetricDatum::builder()
            .metric_name(metric.name)
            .value(metric.value)
            .unit(metric.unit.clone())
            .timestamp(AwsDateTime::from(metric.timestamp))
            .set_dimensions(Some(dimensions))
            .build())
    }
}

#[async_trait]
impl MetricsPublisher for MetricsClient {
    async fn publish(&self, metrics: Vec<CustomMetric>) -> Result<(), AppError> {
        for chunk in metrics.chunks(BATCH_SIZE) {
            let data = chunk
                .iter()
                .map(|metric| self.to_datum(metric))
                .collect::<Result<Vec<_>, _>>()?;

            self.client
                .put_metric_data()
                .namespace(&self.namespace)
                .set_metric_data(Some(data))
                .send()
                .await
                .map_err(|e| {
                    AppError::ExternalService(
                        aws_sdk_cloudwatch::error::DisplayErrorContext(&e).to_string(),
                    )
                })?;

            debug!(batch_size = chunk.len(), "メトリクス送信完了");
        }

        Ok(())
    }
}

/// メトリクスを送信し、失敗しても処理は継続する
#[macro_export]
macro_rules! send_metrics {
    ($publisher:expr, $metrics:expr) => {{
        if let Err(e) = $publisher.publish($metrics).await {
            tracing::warn!(error = %e, "メトリクス送信エラー");
        }
    }};
}
