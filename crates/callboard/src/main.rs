use anyhow::{Context, Result};
use clap::Parser;
use server::app::ApplicationServer;
use std::sync::Arc;
use tracing::info;
use utils::{AppConfig, EnvLoader, Logger};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // 根据 CARGO_ENV 加载对应的环境配置文件
    EnvLoader::load_env_file().ok();

    let config = Arc::new(AppConfig::parse());

    // 日志guard在main存活期间持有，确保缓冲日志落盘
    let _guard = Logger::new(config.cargo_env);

    info!(
        "🧭 callboard starting (env: {:?}, port: {})",
        config.cargo_env, config.app_port
    );

    ApplicationServer::serve(config)
        .await
        .context("🔴 Failed to start server")?;

    Ok(())
}
