////////////////////////////////////////////////////////////////////////
//
// Services: 业务服务聚合，Extension注入到所有controller
//
//////////////////////////////////////////////////////////////////////

pub mod auth_service;
pub mod payment_service;
pub mod providers;
pub mod stats_service;
pub mod stream_service;

use auth_service::{DynAuthService, EnvAuthService};
use database::DatabaseHandle;
use payment_service::PaymentService;
use providers::{LocalFileProvider, SourceResolver, UpstreamClient};
use stats_service::{DynStatsService, StatsService};
use std::sync::Arc;
use stream_service::StreamService;
use tracing::info;
use utils::AppConfig;

#[derive(Clone)]
pub struct Services {
    pub config: Arc<AppConfig>,
    pub db: Arc<DatabaseHandle>,
    pub resolver: Arc<SourceResolver>,
    pub stats: DynStatsService,
    pub stream: Arc<StreamService>,
    pub auth: DynAuthService,
    pub payment: Arc<PaymentService>,
}

impl Services {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let db = Arc::new(DatabaseHandle::new());
        let resolver = Arc::new(SourceResolver::from_config(&config, db.clone()));

        let upstream = UpstreamClient::from_config(&config).map(Arc::new);
        let local = config
            .local_fallback_enabled()
            .then(|| Arc::new(LocalFileProvider::new(config.local_data_dir.clone())));

        let stats =
            Arc::new(StatsService::new(config.clone(), db.clone(), upstream, local)) as DynStatsService;
        let stream = Arc::new(StreamService::new(resolver.clone()));
        let auth = Arc::new(EnvAuthService::new(config.clone())) as DynAuthService;
        let payment = Arc::new(PaymentService::new(&config));

        info!("🧠 services initialized (providers: {:?})", resolver.provider_names());

        Self {
            config,
            db,
            resolver,
            stats,
            stream,
            auth,
            payment,
        }
    }
}
