use crate::errors::{AppError, ErrorResponse};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

/// アイテムIDを受け取るパスパラメータ名
pub const ITEM_ID_PATH_PARAMETER: &str = "id";

/// API Gateway プロキシリクエスト構造体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayProxyRequest {
    #[serde(default)]
    pub http_method: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub path_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
    #[serde(default)]
    pub request_context: Option<RequestContext>,
}

/// リクエストコンテキスト構造体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    #[serde(default)]
    pub request_id: Option<String>,
}

impl ApiGatewayProxyRequest {
    /// テキストとしてのリクエストボディ（Base64 はデコード済み）
    ///
    /// ボディがない場合は `Ok(None)`。
    pub fn body_text(&self) -> Result<Option<String>, AppError> {
        let Some(body) = &self.body else {
            return Ok(None);
        };
        if !self.is_base64_encoded {
            return Ok(Some(body.clone()));
        }

        let bytes = STANDARD.decode(body).map_err(|e| {
            AppError::Validation(format!("invalid request, body is not valid base64: {e}"))
        })?;
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| AppError::Validation("invalid request, body is not UTF-8".to_string()))
    }

    pub fn path_parameter(&self, name: &str) -> Option<&str> {
        self.path_parameters
            .as_ref()
            .and_then(|params| params.get(name))
            .map(String::as_str)
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_context
            .as_ref()
            .and_then(|ctx| ctx.request_id.as_deref())
    }
}

/// API Gateway プロキシレスポンス構造体
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayProxyResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl ApiGatewayProxyResponse {
    /// ボディを JSON として読む（テスト・ログ用）
    pub fn json_body(&self) -> Result<Value, AppError> {
        serde_json::from_str(&self.body).map_err(|e| AppError::Serialization(e.to_string()))
    }
}

fn default_headers() -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    headers.insert("Access-Control-Allow-Origin".to_string(), "*".to_string());
    headers.insert(
        "Access-Control-Allow-Headers".to_string(),
        "Content-Type,X-Amz-Date,Authorization,X-Api-Key".to_string(),
    );
    headers.insert(
        "Access-Control-Allow-Methods".to_string(),
        "OPTIONS,GET,POST,PUT,PATCH,DELETE".to_string(),
    );
    headers
}

/// 成功レスポンスを作成
pub fn create_success_response(status_code: u16, body: Value) -> ApiGatewayProxyResponse {
    ApiGatewayProxyResponse {
        status_code,
        headers: default_headers(),
        body: body.to_string(),
    }
}

/// 任意の値をシリアライズして成功レスポンスを作成
pub fn create_json_response<T: Serialize>(
    status_code: u16,
    body: &T,
) -> Result<ApiGatewayProxyResponse, AppError> {
    let body = serde_json::to_string(body).map_err(|e| AppError::Serialization(e.to_string()))?;
    Ok(ApiGatewayProxyResponse {
        status_code,
        headers: default_headers(),
        body,
    })
}

/// エラーレスポンスを作成
pub fn create_error_response(error: &AppError) -> ApiGatewayProxyResponse {
    let body = ErrorResponse::from_app_error(error)
        .to_json()
        .unwrap_or_else(|_| json!({ "description": "Internal server error." }).to_string());

    ApiGatewayProxyResponse {
        status_code: error.http_status_code(),
        headers: default_headers(),
        body,
    }
}
