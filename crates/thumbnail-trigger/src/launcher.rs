use async_trait::async_trait;
use aws_sdk_ecs::error::DisplayErrorContext;
use aws_sdk_ecs::types::{
    AssignPublicIp, AwsVpcConfiguration, ContainerOverride, KeyValuePair, LaunchType,
    NetworkConfiguration, TaskOverride,
};
use shared::telemetry::trace_aws_operation;
use shared::{AppError, ThumbnailConfig};
use tracing::info;

use crate::task::ThumbnailTask;

const PLATFORM_VERSION: &str = "LATEST";

/// サムネイル生成コンテナの起動
#[async_trait]
pub trait TaskLauncher: Send + Sync {
    /// タスクを起動し、起動したタスクの ARN を返す
    async fn launch(&self, task: &ThumbnailTask) -> Result<Vec<String>, AppError>;
}

/// ECS Fargate でタスクを起動する
pub struct EcsTaskLauncher {
    client: aws_sdk_ecs::Client,
    config: ThumbnailConfig,
}

impl EcsTaskLauncher {
    pub fn new(client: aws_sdk_ecs::Client, config: ThumbnailConfig) -> Self {
        Self { client, config }
    }

    fn network_configuration(&self) -> Result<NetworkConfiguration, AppError> {
        let vpc = AwsVpcConfiguration::builder()
            .set_subnets(Some(self.config.subnets.clone()))
            .assign_public_ip(AssignPublicIp::Enabled)
            .build()
            .map_err(|e| AppError::Configuration(format!("VPC設定の作成に失敗: {e}")))?;

        Ok(NetworkConfiguration::builder()
            .awsvpc_configuration(vpc)
            .build())
    }

    fn overrides(&self, task: &ThumbnailTask) -> TaskOverride {
        let environment = task
            .container_environment(&self.config)
            .into_iter()
            .map(|(name, value)| KeyValuePair::builder().name(name).value(value).build())
            .collect();

        TaskOverride::builder()
            .container_overrides(
                ContainerOverride::builder()
                    .name(&self.config.container_name)
                    .set_environment(Some(environment))
                    .build(),
            )
            .build()
    }
}

#[async_trait]
impl TaskLauncher for EcsTaskLauncher {
    async fn launch(&self, task: &ThumbnailTask) -> Result<Vec<String>, AppError> {
        let cluster = self.config.cluster_name.as_str();

        let output = trace_aws_operation(
            "ecs",
            cluster,
            "RunTask",
            self.client
                .run_task()
                .cluster(cluster)
                .task_definition(&self.config.task_definition)
                .launch_type(LaunchType::Fargate)
                .count(1)
                .platform_version(PLATFORM_VERSION)
                .network_configuration(self.network_configuration()?)
                .overrides(self.overrides(task))
                .send(),
        )
        .await
        .map_err(|e| AppError::ExternalService(DisplayErrorContext(&e).to_string()))?;

        // API 呼び出しが成功しても failures に起動失敗が返ることがある
        if let Some(failure) = output.failures().first() {
            return Err(AppError::ExternalService(format!(
                "RunTask failed: {} (arn: {})",
                failure.reason().unwrap_or("unknown"),
                failure.arn().unwrap_or("-")
            )));
        }

        let task_arns: Vec<String> = output
            .tasks()
            .iter()
            .filter_map(|t| t.task_arn().map(str::to_string))
            .collect();

        info!(
            video_url = %task.video_url,
            thumbnail = %task.thumbnail_file,
            tasks = ?task_arns,
            "サムネイル生成タスク起動"
        );

        Ok(task_arns)
    }
}
