use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// トレーシングサブスクライバーを初期化
///
/// JSON 形式で標準出力に書き出し、CloudWatch Logs にそのまま取り込ませる。
/// `RUST_LOG` 未設定時は info レベル。
pub fn init_tracing() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .without_time() // タイムスタンプは CloudWatch が付与する
                .json(),
        )
        .with(filter)
        .try_init()?;

    Ok(())
}
