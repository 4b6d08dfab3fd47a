use crate::{
    dtos::auth_dto::{LoginDto, LoginResponse},
    extractors::ValidationExtractor,
    middleware::{NAME_COOKIE, SESSION_COOKIE},
    services::Services,
};
use axum::{
    response::Redirect,
    routing::{post, Router},
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;
use tracing::info;
use utils::AppResult;

/// 会话cookie有效期
const SESSION_TTL: Duration = Duration::days(7);

/// 认证控制器
pub struct AuthController;

impl AuthController {
    pub fn app() -> Router {
        Router::new().route("/login", post(login))
    }
}

/// 管理员登录
///
/// 校验环境配置的管理员凭证，成功后写入会话cookie与展示名cookie
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "authentication",
    request_body = LoginDto,
    responses(
        (status = 200, description = "登录成功，已设置会话cookie", body = LoginResponse),
        (status = 400, description = "请求体格式错误"),
        (status = 401, description = "凭证不匹配"),
        (status = 503, description = "管理员凭证未配置")
    )
)]
pub async fn login(
    Extension(services): Extension<Services>,
    jar: CookieJar,
    ValidationExtractor(req): ValidationExtractor<LoginDto>,
) -> AppResult<(CookieJar, Json<LoginResponse>)> {
    let issue = services.auth.verify(&req.email, &req.password)?;

    let session = Cookie::build((SESSION_COOKIE, issue.session_token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(SESSION_TTL)
        .build();
    let name = Cookie::build((NAME_COOKIE, issue.display_name.clone()))
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(SESSION_TTL)
        .build();

    info!("🔑 admin login ok ({})", issue.display_name);

    Ok((
        jar.add(session).add(name),
        Json(LoginResponse {
            ok: true,
            name: issue.display_name,
        }),
    ))
}

/// 退出登录：清除会话cookie并跳回登录页
#[utoipa::path(
    get,
    path = "/logout",
    tag = "authentication",
    responses(
        (status = 302, description = "已清除会话，跳转到 /login")
    )
)]
pub async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    let mut removal = Cookie::from(SESSION_COOKIE);
    removal.set_path("/");
    (jar.remove(removal), Redirect::to("/login"))
}
