use std::sync::Arc;

use config::Config;
use redis::Client as RedisClient;
use sqlx::PgPool;

use auth::{DevelopmentIdentityProvider, TokenCodec};

pub mod assignment;
pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod router;
pub mod routes;
pub mod utils;

pub use router::build_router;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub codec: TokenCodec,
    /// 只在 `DEV_IDENTITY_FALLBACK` 开启时存在
    pub dev_identity: Option<DevelopmentIdentityProvider>,
    pub redis: Option<Arc<RedisClient>>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config, redis: Option<RedisClient>) -> Self {
        let dev_identity = config.dev_identity_fallback.then(|| {
            tracing::warn!("Development identity fallback is enabled, do not use in production");
            DevelopmentIdentityProvider::default()
        });

        Self {
            codec: TokenCodec::from_config(&config),
            dev_identity,
            redis: redis.map(Arc::new),
            pool,
            config,
        }
    }
}
