use crate::{router::AppRouter, services::Services};
use anyhow::Context;
use axum::serve;
use database::DatabaseHandle;
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::{info, warn};
use utils::AppConfig;

pub struct ApplicationServer;

impl ApplicationServer {
    pub async fn serve(config: Arc<AppConfig>) -> anyhow::Result<()> {
        // 注意：日志初始化已经在主程序(callboard/src/main.rs)中完成

        let address = format!("{}:{}", config.app_host, config.app_port);
        let tcp_listener = tokio::net::TcpListener::bind(address)
            .await
            .context("🔴 Failed to bind TCP listener")?;

        let local_addr = tcp_listener.local_addr().context("🔴 Failed to get local address")?;

        let services = Services::new(config.clone());

        // 数据库延迟建连：这里只做一次预热尝试，失败不阻止启动，
        // 后续请求会走上游/本地文件回退链
        if DatabaseHandle::is_configured(&config) {
            match services.db.get_or_connect(&config).await {
                Ok(db) => {
                    info!("🧱 mongodb warmed up");
                    db.init_repository_indexes().await.ok();
                }
                Err(e) => warn!("⚠️ mongodb warmup failed, falling back on demand: {}", e),
            }
        } else {
            warn!("⚠️ no mongodb connection string configured");
        }

        let router = AppRouter::new(services);

        info!("🟢 server:callboard has launched on {local_addr} 🚀");

        serve(tcp_listener, router.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(Self::shutdown_signal())
            .await
            .context("🔴 Failed to start server")?;

        Ok(())
    }

    async fn shutdown_signal() {
        let ctrl_c = async {
            signal::ctrl_c().await.expect("🔴 Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("🔴 Failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }

        tracing::warn!("❌ Signal received, starting graceful shutdown...");
    }
}
