use crate::errors::AppError;
use std::env;

/// 作成成功時のレスポンスボディ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateResponseBody {
    /// 保存したアイテムをそのまま返す
    Item,
    /// `{}` を返す
    Empty,
}

/// 更新成功時のレスポンス
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateResponse {
    /// 204 と `{}`
    NoContent,
    /// 200 と更新後の属性
    UpdatedAttributes,
}

/// 成功レスポンスの形式（デプロイごとに選択）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseConventions {
    pub create_status: u16,
    pub create_body: CreateResponseBody,
    pub update: UpdateResponse,
}

impl Default for ResponseConventions {
    fn default() -> Self {
        Self {
            create_status: 201,
            create_body: CreateResponseBody::Item,
            update: UpdateResponse::NoContent,
        }
    }
}

/// CRUD ハンドラーの設定
#[derive(Debug, Clone)]
pub struct Config {
    pub table_name: String,
    pub primary_key: String,
    pub environment: String,
    pub aws_region: Option<String>,
    pub dynamodb_endpoint: Option<String>,
    pub retry_max_attempts: u32,
    /// Scan の1ページあたりの最大件数（未設定なら DynamoDB の既定）
    pub scan_page_size: Option<i32>,
    /// CloudWatch メトリクスの名前空間（`None` なら送信しない）
    pub metrics_namespace: Option<String>,
    pub responses: ResponseConventions,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の値取得関数から設定を組み立てる
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let table_name = required(&lookup, "TABLE_NAME")?;
        let primary_key = required(&lookup, "PRIMARY_KEY")?;

        let retry_max_attempts = match optional(&lookup, "DYNAMODB_MAX_ATTEMPTS") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|attempts| *attempts > 0)
                .ok_or_else(|| {
                    AppError::Configuration(format!("DYNAMODB_MAX_ATTEMPTS is invalid: {raw}"))
                })?,
            None => 3,
        };

        let scan_page_size = optional(&lookup, "DYNAMODB_SCAN_PAGE_SIZE")
            .map(|raw| {
                raw.parse::<i32>()
                    .ok()
                    .filter(|size| *size > 0)
                    .ok_or_else(|| {
                        AppError::Configuration(format!(
                            "DYNAMODB_SCAN_PAGE_SIZE is invalid: {raw}"
                        ))
                    })
            })
            .transpose()?;

        let metrics_enabled = match optional(&lookup, "METRICS_ENABLED").as_deref() {
            None | Some("true") => true,
            Some("false") => false,
            Some(raw) => {
                return Err(AppError::Configuration(format!(
                    "METRICS_ENABLED must be true or false: {raw}"
                )))
            }
        };
        let metrics_namespace = metrics_enabled.then(|| {
            optional(&lookup, "METRICS_NAMESPACE").unwrap_or_else(|| "ItemsService".to_string())
        });

        let mut responses = ResponseConventions::default();
        if let Some(raw) = optional(&lookup, "CREATE_STATUS_CODE") {
            responses.create_status = match raw.as_str() {
                "200" => 200,
                "201" => 201,
                _ => {
                    return Err(AppError::Configuration(format!(
                        "CREATE_STATUS_CODE must be 200 or 201: {raw}"
                    )))
                }
            };
        }
        if let Some(raw) = optional(&lookup, "CREATE_RESPONSE") {
            responses.create_body = match raw.as_str() {
                "item" => CreateResponseBody::Item,
                "empty" => CreateResponseBody::Empty,
                _ => {
                    return Err(AppError::Configuration(format!(
                        "CREATE_RESPONSE must be item or empty: {raw}"
                    )))
                }
            };
        }
        if let Some(raw) = optional(&lookup, "UPDATE_RESPONSE") {
            responses.update = match raw.as_str() {
                "no-content" => UpdateResponse::NoContent,
                "updated" => UpdateResponse::UpdatedAttributes,
                _ => {
                    return Err(AppError::Configuration(format!(
                        "UPDATE_RESPONSE must be no-content or updated: {raw}"
                    )))
                }
            };
        }

        Ok(Config {
            table_name,
            primary_key,
            environment: optional(&lookup, "ENVIRONMENT").unwrap_or_else(|| "dev".to_string()),
            aws_region: optional(&lookup, "AWS_REGION"),
            dynamodb_endpoint: optional(&lookup, "DYNAMODB_ENDPOINT"),
            retry_max_attempts,
            scan_page_size,
            metrics_namespace,
            responses,
        })
    }
}

/// サムネイル生成タスクの起動設定
#[derive(Debug, Clone)]
pub struct ThumbnailConfig {
    pub cluster_name: String,
    pub task_definition: String,
    pub subnets: Vec<String>,
    pub output_s3_path: String,
    pub output_s3_region: String,
    pub container_name: String,
    pub frame_position: String,
}

impl ThumbnailConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let subnets: Vec<String> = ["ECS_TASK_VPC_SUBNET_1", "ECS_TASK_VPC_SUBNET_2"]
            .iter()
            .filter_map(|name| optional(&lookup, name))
            .collect();
        if subnets.is_empty() {
            return Err(AppError::Configuration(
                "at least one of ECS_TASK_VPC_SUBNET_1 / ECS_TASK_VPC_SUBNET_2 is required"
                    .to_string(),
            ));
        }

        Ok(ThumbnailConfig {
            cluster_name: required(&lookup, "ECS_CLUSTER_NAME")?,
            task_definition: required(&lookup, "ECS_TASK_DEFINITION")?,
            subnets,
            output_s3_path: required(&lookup, "OUTPUT_S3_PATH")?,
            output_s3_region: required(&lookup, "OUTPUT_S3_AWS_REGION")?,
            container_name: optional(&lookup, "THUMBNAIL_CONTAINER_NAME")
                .unwrap_or_else(|| "ffmpeg-thumb".to_string()),
            frame_position: optional(&lookup, "THUMBNAIL_FRAME_POSITION")
                .unwrap_or_else(|| "00:02".to_string()),
        })
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String, AppError> {
    optional(lookup, name)
        .ok_or_else(|| AppError::Configuration(format!("{name} is not set")))
}

// 空文字は未設定として扱う
fn optional(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
