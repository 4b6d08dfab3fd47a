use clap::Parser;

#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq)]
#[clap(rename_all = "lowercase")]
pub enum CargoEnv {
    Development,
    Production,
}

/// Mongo连接串环境变量，按优先级依次检查
pub const MONGO_URI_ENV_VARS: [&str; 3] = ["MONGODB_URI", "MONGO_URI", "DATABASE_URL"];

/// 环境配置加载器
pub struct EnvLoader;

impl EnvLoader {
    /// 根据 CARGO_ENV 加载对应的环境配置文件
    pub fn load_env_file() -> Result<(), Box<dyn std::error::Error>> {
        // 1. 获取环境变量 CARGO_ENV
        let cargo_env = std::env::var("CARGO_ENV").unwrap_or_else(|_| "development".to_string());

        // 2. 构建配置文件路径
        let env_file = match cargo_env.as_str() {
            "production" | "Production" | "prod" => ".env.production",
            "development" | "Development" | "dev" => ".env.development",
            "test" | "Test" => ".env.test",
            _ => {
                println!("⚠️  未知的 CARGO_ENV: {}，使用默认的 .env.development", cargo_env);
                ".env.development"
            }
        };

        // 3. 检查文件是否存在，不存在则回退到默认的 .env
        if !std::path::Path::new(env_file).exists() {
            if std::path::Path::new(".env").exists() {
                dotenvy::from_filename(".env")?;
                println!("✅ 已加载默认配置文件: .env");
            }
            return Ok(());
        }

        // 4. 加载指定的环境配置文件
        dotenvy::from_filename(env_file)?;
        println!("✅ 已加载环境配置文件: {} (CARGO_ENV={})", env_file, cargo_env);

        Ok(())
    }
}

#[derive(clap::Parser, Clone, Debug)]
pub struct AppConfig {
    #[clap(long, env, value_enum, default_value = "development")]
    pub cargo_env: CargoEnv,

    #[clap(long, env, default_value = "0.0.0.0")]
    pub app_host: String,

    #[clap(long, env, default_value = "8000")]
    pub app_port: u16,

    /// 数据库名称
    #[clap(long, env, default_value = "callboard")]
    pub mongo_db: String,

    /// 集合名称覆盖
    #[clap(long, env, default_value = "token_calls")]
    pub token_calls_collection: String,

    #[clap(long, env, default_value = "users")]
    pub users_collection: String,

    #[clap(long, env, default_value = "group_monthly_tokens")]
    pub monthly_tokens_collection: String,

    /// 上游API（数据库不可用时的回退数据源）
    #[clap(long, env)]
    pub upstream_api_url: Option<String>,

    #[clap(long, env)]
    pub upstream_api_token: Option<String>,

    #[clap(long, env, default_value = "/api/stats")]
    pub upstream_stats_path: String,

    #[clap(long, env, default_value = "/api/token-calls")]
    pub upstream_calls_path: String,

    #[clap(long, env, default_value = "/api/users")]
    pub upstream_users_path: String,

    /// 管理员凭证，必须显式配置，缺失时登录接口直接拒绝
    #[clap(long, env)]
    pub admin_email: Option<String>,

    #[clap(long, env)]
    pub admin_password: Option<String>,

    /// 非生产环境下是否允许本地静态文件回退
    #[clap(long, env, default_value = "false")]
    pub enable_local_fallback: bool,

    #[clap(long, env, default_value = "data")]
    pub local_data_dir: String,

    /// 看板时间窗口（小时）
    #[clap(long, env, default_value = "24")]
    pub dashboard_window_hours: i64,

    #[clap(long, env)]
    pub stripe_secret_key: Option<String>,

    #[clap(long, env, default_value = "info")]
    pub rust_log: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        EnvLoader::load_env_file().ok();
        AppConfig::parse()
    }
}

impl AppConfig {
    /// 解析Mongo连接串。三个变量名按固定优先级检查，返回首个非空值。
    pub fn mongo_uri(&self) -> Option<String> {
        self.mongo_uri_source().map(|(_, uri)| uri)
    }

    /// 同上，附带命中的变量名（调试接口展示用，不返回值本身之外的信息）
    pub fn mongo_uri_source(&self) -> Option<(&'static str, String)> {
        for name in MONGO_URI_ENV_VARS {
            if let Ok(value) = std::env::var(name) {
                if !value.trim().is_empty() {
                    return Some((name, value));
                }
            }
        }
        None
    }

    pub fn is_production(&self) -> bool {
        self.cargo_env == CargoEnv::Production
    }

    /// 本地文件回退仅在非生产环境且显式开启时可用
    pub fn local_fallback_enabled(&self) -> bool {
        self.enable_local_fallback && !self.is_production()
    }

    /// 手动创建配置实例（用于测试）
    pub fn new_for_test() -> Self {
        Self {
            cargo_env: CargoEnv::Development,
            app_host: "0.0.0.0".to_string(),
            app_port: 8765,
            mongo_db: std::env::var("MONGO_DB").unwrap_or_else(|_| "callboard_test".to_string()),
            token_calls_collection: "token_calls".to_string(),
            users_collection: "users".to_string(),
            monthly_tokens_collection: "group_monthly_tokens".to_string(),
            upstream_api_url: None,
            upstream_api_token: None,
            upstream_stats_path: "/api/stats".to_string(),
            upstream_calls_path: "/api/token-calls".to_string(),
            upstream_users_path: "/api/users".to_string(),
            admin_email: None,
            admin_password: None,
            enable_local_fallback: false,
            local_data_dir: "data".to_string(),
            dashboard_window_hours: 24,
            stripe_secret_key: None,
            rust_log: "info".to_string(),
        }
    }
}
