use aws_lambda_events::event::s3::S3Event;
use shared::{AppError, ThumbnailConfig};

/// 1本の動画に対するサムネイル生成タスク
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailTask {
    pub video_url: String,
    pub thumbnail_file: String,
    pub frame_position: String,
}

impl ThumbnailTask {
    pub fn for_object(bucket: &str, key: &str, frame_position: &str) -> Self {
        Self {
            video_url: format!("https://s3.amazonaws.com/{bucket}/{key}"),
            thumbnail_file: thumbnail_file_name(key),
            frame_position: frame_position.to_string(),
        }
    }

    /// コンテナに渡す環境変数
    pub fn container_environment(&self, config: &ThumbnailConfig) -> Vec<(&'static str, String)> {
        vec![
            ("INPUT_VIDEO_FILE_URL", self.video_url.clone()),
            ("OUTPUT_THUMBS_FILE_NAME", self.thumbnail_file.clone()),
            ("POSITION_TIME_DURATION", self.frame_position.clone()),
            ("OUTPUT_S3_PATH", config.output_s3_path.clone()),
            ("AWS_REGION", config.output_s3_region.clone()),
        ]
    }
}

/// オブジェクトキーの拡張子を `.png` に置き換える
///
/// 拡張子は最後のパス要素の最後の `.` 以降。先頭のドットは拡張子とみなさない。
pub fn thumbnail_file_name(key: &str) -> String {
    let name_start = key.rfind('/').map_or(0, |slash| slash + 1);
    let name = &key[name_start..];
    let leading_dots = name.len() - name.trim_start_matches('.').len();

    let stem = match name[leading_dots..].rfind('.') {
        Some(dot) => &key[..name_start + leading_dots + dot],
        None => key,
    };
    format!("{stem}.png")
}

/// S3 イベントの各レコードからタスクを組み立てる
pub fn tasks_from_event(
    event: &S3Event,
    frame_position: &str,
) -> Result<Vec<ThumbnailTask>, AppError> {
    event
        .records
        .iter()
        .map(|record| {
            let bucket = record.s3.bucket.name.as_deref().ok_or_else(|| {
                AppError::Validation("S3 event record has no bucket name".to_string())
            })?;
            let key = record.s3.object.key.as_deref().ok_or_else(|| {
                AppError::Validation("S3 event record has no object key".to_string())
            })?;
            Ok(ThumbnailTask::for_object(bucket, key, frame_position))
        })
        .collect()
}
