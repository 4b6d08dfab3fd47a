use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::CargoEnv;

/// 日志初始化。开发环境输出到stdout，生产环境按天滚动写入文件。
/// 返回的guard必须在main中持有，否则缓冲日志会丢失。
pub struct Logger;

impl Logger {
    pub fn new(cargo_env: CargoEnv) -> WorkerGuard {
        let (non_blocking, guard) = match cargo_env {
            CargoEnv::Development => tracing_appender::non_blocking(std::io::stdout()),
            CargoEnv::Production => {
                let mut log_directory = Self::log_directory();
                if let Err(e) = std::fs::create_dir_all(&log_directory) {
                    eprintln!("⚠️ 无法创建日志目录 {:?}: {}，回退到 ./logs", log_directory, e);
                    log_directory = PathBuf::from("logs");
                    std::fs::create_dir_all(&log_directory).ok();
                }
                let file_logger = tracing_appender::rolling::daily(&log_directory, "log");
                tracing_appender::non_blocking(file_logger)
            }
        };

        // 根过滤级别由RUST_LOG控制
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("{}=debug,tower_http=debug", env!("CARGO_PKG_NAME")).into());

        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking)
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(false),
            )
            .init();

        guard
    }

    fn log_directory() -> PathBuf {
        if let Ok(dir) = std::env::var("LOG_DIR") {
            return PathBuf::from(dir);
        }
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("logs")
    }
}
