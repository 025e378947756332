use std::collections::HashMap;
use uuid::Uuid;

use crate::api::{create_error_response, ApiGatewayProxyRequest, ApiGatewayProxyResponse};
use crate::errors::{AppError, ErrorSeverity};

/// Lambda関数用のエラーハンドリングユーティリティ
pub struct LambdaErrorHandler;

impl LambdaErrorHandler {
    /// AppErrorをAPI Gateway用のレスポンスに変換
    pub fn to_api_gateway_response(
        error: &AppError,
        request: &ApiGatewayProxyRequest,
    ) -> ApiGatewayProxyResponse {
        let request_id = Self::extract_request_id(request);

        let mut context = HashMap::new();
        context.insert("request_id".to_string(), request_id.clone());
        if let Some(method) = &request.http_method {
            context.insert("method".to_string(), method.clone());
        }
        if let Some(path) = &request.path {
            context.insert("path".to_string(), path.clone());
        }
        Self::log_error(error, Some(context));

        let mut response = create_error_response(error);
        response
            .headers
            .insert("X-Request-ID".to_string(), request_id);
        response
    }

    /// リクエストIDを抽出（API Gateway が付与していなければ生成）
    pub fn extract_request_id(request: &ApiGatewayProxyRequest) -> String {
        request
            .request_id()
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }

    /// エラーをログに記録
    pub fn log_error(error: &AppError, context: Option<HashMap<String, String>>) {
        let metadata = error.metadata();

        match metadata.severity {
            ErrorSeverity::Critical => {
                tracing::error!(
                    error = %error,
                    code = %metadata.code,
                    category = ?metadata.category,
                    retryable = metadata.retryable,
                    context = ?context,
                    "Critical error occurred"
                );
            }
            ErrorSeverity::Error => {
                tracing::error!(
                    error = %error,
                    code = %metadata.code,
                    category = ?metadata.category,
                    retryable = metadata.retryable,
                    context = ?context,
                    "Error occurred"
                );
            }
            ErrorSeverity::Warning => {
                tracing::warn!(
                    error = %error,
                    code = %metadata.code,
                    category = ?metadata.category,
                    context = ?context,
                    "Warning occurred"
                );
            }
            ErrorSeverity::Info => {
                tracing::info!(
                    error = %error,
                    code = %metadata.code,
                    context = ?context,
                    "Request rejected"
                );
            }
        }
    }
}
