use lambda_runtime::Context;
use std::future::Future;
use std::time::Instant;
use tracing::{error, info};

/// Lambda 関数のトレーシング情報
#[derive(Debug)]
pub struct LambdaTraceContext {
    pub function_name: String,
    pub function_version: String,
    pub request_id: String,
    pub trace_id: Option<String>,
}

impl LambdaTraceContext {
    /// Lambda Context からトレーシング情報を抽出
    pub fn from_lambda_context(context: &Context) -> Self {
        Self {
            function_name: context.env_config.function_name.clone(),
            function_version: context.env_config.version.clone(),
            request_id: context.request_id.clone(),
            trace_id: std::env::var("_X_AMZN_TRACE_ID").ok(),
        }
    }
}

/// Lambda 関数実行をトレースするマクロ
#[macro_export]
macro_rules! trace_lambda_handler {
    ($handler_name:expr, $event:expr, $context:expr, $handler_fn:expr) => {{
        use $crate::telemetry::{create_lambda_span, LambdaTraceContext};
        use tracing::Instrument;

        let trace_context = LambdaTraceContext::from_lambda_context(&$context);
        let span = create_lambda_span($handler_name, &trace_context);

        async move {
            tracing::info!(
                function_name = %trace_context.function_name,
                request_id = %trace_context.request_id,
                "Lambda function started"
            );

            let result = $handler_fn($event, $context).await;

            match &result {
                Ok(_) => tracing::info!("Lambda function completed successfully"),
                Err(e) => tracing::error!(error = %e, "Lambda function failed"),
            }

            result
        }
        .instrument(span)
        .await
    }};
}

/// Lambda 関数用のスパンを作成
pub fn create_lambda_span(handler_name: &str, trace_context: &LambdaTraceContext) -> tracing::Span {
    tracing::span!(
        tracing::Level::INFO,
        "lambda_handler",
        handler = handler_name,
        function_name = %trace_context.function_name,
        function_version = %trace_context.function_version,
        request_id = %trace_context.request_id,
        trace_id = %trace_context.trace_id.as_deref().unwrap_or("none")
    )
}

/// AWS API 呼び出しの所要時間と結果をログに残す
pub async fn trace_aws_operation<T, E, Fut>(
    service: &str,
    resource: &str,
    operation: &str,
    call: Fut,
) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let start_time = Instant::now();
    let result = call.await;
    let duration = start_time.elapsed();

    match &result {
        Ok(_) => {
            info!(
                service = service,
                resource = resource,
                operation = operation,
                duration_ms = duration.as_millis() as u64,
                "AWS operation completed successfully"
            );
        }
        Err(e) => {
            error!(
                service = service,
                resource = resource,
                operation = operation,
                duration_ms = duration.as_millis() as u64,
                error = %e,
                "AWS operation failed"
            );
        }
    }

    result
}
