use aws_config::retry::RetryConfig;
use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::Client;
use shared::Config;

/// DynamoDB クライアントと対象テーブル
///
/// プロセス起動時に一度だけ作成し、各呼び出しで共有する。
#[derive(Clone)]
pub struct DynamoDbClient {
    client: Client,
    table_name: String,
    primary_key: String,
}

impl DynamoDbClient {
    pub async fn new(config: &Config) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .retry_config(RetryConfig::standard().with_max_attempts(config.retry_max_attempts));

        if let Some(region) = &config.aws_region {
            loader = loader.region(Region::new(region.clone()));
        }
        // DynamoDB Local 等への接続
        if let Some(endpoint) = &config.dynamodb_endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let aws_config = loader.load().await;
        Self::from_client(Client::new(&aws_config), config)
    }

    pub fn from_client(client: Client, config: &Config) -> Self {
        Self {
            client,
            table_name: config.table_name.clone(),
            primary_key: config.primary_key.clone(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }
}
