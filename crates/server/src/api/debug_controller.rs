use crate::services::Services;
use axum::{
    routing::{get, Router},
    Extension, Json,
};
use database::DatabaseHandle;
use serde_json::json;
use std::time::Instant;
use utils::CargoEnv;

/// 诊断接口。只暴露配置状态（哪些变量命中、开关布尔值），
/// 绝不回显连接串、token或密钥本身。非生产用途。
pub struct DebugController;

impl DebugController {
    pub fn app() -> Router {
        Router::new().route("/", get(env_status)).route("/mongo", get(mongo_status))
    }
}

/// 环境/配置状态
#[utoipa::path(
    get,
    path = "/api/rnd/debug",
    tag = "diagnostics",
    responses(
        (status = 200, description = "配置命中情况")
    )
)]
pub async fn env_status(Extension(services): Extension<Services>) -> Json<serde_json::Value> {
    let config = &services.config;
    Json(json!({
        "cargo_env": match config.cargo_env {
            CargoEnv::Development => "development",
            CargoEnv::Production => "production",
        },
        "mongo": {
            "configured": DatabaseHandle::is_configured(config),
            "env_var": config.mongo_uri_source().map(|(name, _)| name),
            "db": config.mongo_db,
            "collections": {
                "token_calls": config.token_calls_collection,
                "users": config.users_collection,
                "monthly_tokens": config.monthly_tokens_collection,
            },
        },
        "upstream": {
            "configured": config.upstream_api_url.is_some(),
            "url": config.upstream_api_url,
            "has_token": config.upstream_api_token.is_some(),
        },
        "local_fallback_enabled": config.local_fallback_enabled(),
        "dashboard_window_hours": config.dashboard_window_hours,
        "stripe_configured": config.stripe_secret_key.is_some(),
        "providers": services.resolver.provider_names(),
    }))
}

/// Mongo连通性检查：建连 + ping + 各集合计数
#[utoipa::path(
    get,
    path = "/api/rnd/debug/mongo",
    tag = "diagnostics",
    responses(
        (status = 200, description = "连通性结果（成功或失败原因）")
    )
)]
pub async fn mongo_status(Extension(services): Extension<Services>) -> Json<serde_json::Value> {
    if !DatabaseHandle::is_configured(&services.config) {
        return Json(json!({ "ok": false, "reason": "no connection string configured" }));
    }

    let started = Instant::now();
    let result = async {
        let db = services.db.get_or_connect(&services.config).await?;
        db.ping().await?;
        let calls = db.token_call_repository.count_all().await?;
        let users = db.user_repository.count_all().await?;
        Ok::<_, utils::AppError>((calls, users))
    }
    .await;

    match result {
        Ok((calls, users)) => Json(json!({
            "ok": true,
            "elapsed_ms": started.elapsed().as_millis() as u64,
            "counts": { "token_calls": calls, "users": users },
        })),
        Err(e) => Json(json!({
            "ok": false,
            "elapsed_ms": started.elapsed().as_millis() as u64,
            "reason": e.to_string(),
        })),
    }
}
