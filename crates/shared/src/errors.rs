use domain::{DomainError, ItemError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// アプリケーション全体で使用されるエラー型
#[derive(Debug, Clone, Error)]
pub enum AppError {
    // クライアントエラー
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // インフラストラクチャエラー
    #[error("DynamoDB error: {0}")]
    DynamoDb(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // システムエラー
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// エラーの分類
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    /// クライアントエラー（4xx相当）
    Client,
    /// サーバーエラー（5xx相当）
    Server,
    /// 一時的なエラー（呼び出し側でリトライ可能）
    Transient,
}

/// エラーの重要度
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// エラーメタデータ
#[derive(Debug, Clone)]
pub struct ErrorMetadata {
    pub code: &'static str,
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub retryable: bool,
}

impl ErrorMetadata {
    const fn fixed(code: &'static str, category: ErrorCategory, severity: ErrorSeverity) -> Self {
        Self {
            code,
            category,
            severity,
            retryable: false,
        }
    }
}

impl AppError {
    /// ログ出力用のメタデータ
    ///
    /// DynamoDB のスロットリング系だけは一時的エラーとして扱う。
    pub fn metadata(&self) -> ErrorMetadata {
        use ErrorCategory::{Client, Server, Transient};

        match self {
            AppError::Validation(_) => {
                ErrorMetadata::fixed("BAD_REQUEST", Client, ErrorSeverity::Info)
            }
            AppError::NotFound(_) => {
                ErrorMetadata::fixed("ITEM_NOT_FOUND", Client, ErrorSeverity::Info)
            }
            AppError::DynamoDb(msg) if is_dynamodb_retryable(msg) => ErrorMetadata {
                retryable: true,
                ..ErrorMetadata::fixed("DYNAMODB_THROTTLED", Transient, ErrorSeverity::Warning)
            },
            AppError::DynamoDb(_) => {
                ErrorMetadata::fixed("DYNAMODB_ERROR", Server, ErrorSeverity::Error)
            }
            AppError::ExternalService(_) => {
                ErrorMetadata::fixed("ECS_RUN_TASK_FAILED", Server, ErrorSeverity::Error)
            }
            AppError::Serialization(_) => {
                ErrorMetadata::fixed("ATTRIBUTE_CONVERSION_FAILED", Server, ErrorSeverity::Error)
            }
            AppError::Configuration(_) => {
                ErrorMetadata::fixed("MISSING_CONFIGURATION", Server, ErrorSeverity::Critical)
            }
            AppError::Internal(_) => {
                ErrorMetadata::fixed("INTERNAL_ERROR", Server, ErrorSeverity::Critical)
            }
        }
    }

    /// HTTPステータスコードを取得
    pub fn http_status_code(&self) -> u16 {
        match self {
            AppError::Validation(_) => 400,
            AppError::NotFound(_) => 404,
            _ => 500,
        }
    }

    /// レスポンスボディの description
    pub fn description(&self) -> String {
        match self {
            AppError::Validation(detail) => format!("Bad request. {detail}"),
            AppError::NotFound(detail) => format!("Not found. {detail}"),
            AppError::DynamoDb(detail)
            | AppError::ExternalService(detail)
            | AppError::Serialization(detail)
            | AppError::Configuration(detail)
            | AppError::Internal(detail) => format!("Internal server error. {detail}"),
        }
    }
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<ItemError> for AppError {
    fn from(e: ItemError) -> Self {
        match e {
            ItemError::NotFound(detail) => AppError::NotFound(detail),
            ItemError::DynamoDb(detail) => AppError::DynamoDb(detail),
            ItemError::Serialization(detail) => AppError::Serialization(detail),
            ItemError::Domain(domain) => domain.into(),
        }
    }
}

/// DynamoDBエラーがリトライ可能かどうかを判定
fn is_dynamodb_retryable(error_message: &str) -> bool {
    let retryable_errors = [
        "ThrottlingException",
        "ProvisionedThroughputExceededException",
        "ServiceUnavailable",
        "InternalServerError",
        "RequestLimitExceeded",
    ];

    retryable_errors
        .iter()
        .any(|&err| error_message.contains(err))
}

/// エラーレスポンスボディ
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub description: String,
}

impl ErrorResponse {
    pub fn from_app_error(error: &AppError) -> Self {
        Self {
            description: error.description(),
        }
    }

    pub fn to_json(&self) -> Result<String, AppError> {
        serde_json::to_string(self).map_err(|e| AppError::Serialization(e.to_string()))
    }
}
