use thiserror::Error;

/// リクエスト入力の検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("invalid request, you are missing the parameter body")]
    MissingBody,

    #[error("invalid request, you are missing the path parameter id")]
    MissingItemId,

    #[error("invalid request, no arguments provided")]
    NoAttributes,

    #[error("invalid request, body is not valid JSON: {0}")]
    MalformedBody(String),

    #[error("invalid request, body must be a JSON object")]
    BodyNotObject,

    #[error("invalid request, attribute names must not be empty")]
    EmptyAttributeName,

    #[error("invalid request, the key attribute {0} cannot be updated")]
    KeyAttributeUpdate(String),
}

/// アイテムストア操作のエラー
#[derive(Debug, Clone, Error)]
pub enum ItemError {
    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("DynamoDB error: {0}")]
    DynamoDb(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}
