use aws_config::BehaviorVersion;
use aws_lambda_events::event::s3::S3Event;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde::Serialize;
use shared::{trace_lambda_handler, tracing::init_tracing, AppError, ThumbnailConfig};
use tracing::{error, info, warn};

mod launcher;
mod task;

use launcher::{EcsTaskLauncher, TaskLauncher};
use task::tasks_from_event;

/// 起動したタスクの一覧
#[derive(Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct TriggerSummary {
    launched_tasks: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    if let Err(e) = init_tracing() {
        eprintln!("トレーシング初期化エラー: {e}");
    }

    let config = ThumbnailConfig::from_env().map_err(|e| {
        error!("設定読み込みエラー: {}", e);
        Error::from(format!("設定エラー: {e}"))
    })?;

    let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let launcher = EcsTaskLauncher::new(aws_sdk_ecs::Client::new(&aws_config), config.clone());
    info!(
        cluster = %config.cluster_name,
        task_definition = %config.task_definition,
        "ECSクライアント初期化完了"
    );

    let launcher: &dyn TaskLauncher = &launcher;
    let config = &config;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<S3Event>| async move {
        function_handler(launcher, config, event).await
    }))
    .await
}

async fn function_handler(
    launcher: &dyn TaskLauncher,
    config: &ThumbnailConfig,
    event: LambdaEvent<S3Event>,
) -> Result<TriggerSummary, Error> {
    let (payload, context) = event.into_parts();

    trace_lambda_handler!(
        "thumbnail_trigger",
        payload,
        context,
        |payload: S3Event, _context| async move {
            process_event(launcher, config, &payload)
                .await
                .map_err(|e| Error::from(e.to_string()))
        }
    )
}

/// イベント内の全レコードについてタスクを起動する
///
/// 1件でも失敗すると呼び出し全体を失敗させ、S3 の非同期呼び出しのリトライに任せる。
async fn process_event(
    launcher: &dyn TaskLauncher,
    config: &ThumbnailConfig,
    event: &S3Event,
) -> Result<TriggerSummary, AppError> {
    let tasks = tasks_from_event(event, &config.frame_position)?;
    if tasks.is_empty() {
        warn!("S3イベントにレコードがありません");
    }

    let mut summary = TriggerSummary::default();
    for task in &tasks {
        summary.launched_tasks.extend(launcher.launch(task).await?);
    }

    Ok(summary)
}
