pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod models;
pub mod redis_client;
pub mod services;
pub mod store;

use std::sync::Arc;
use tracing::info;

use services::{RatingAggregator, ReservationEngine, ScreeningManager};
use store::PgStore;

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub redis: redis_client::RedisClient,
    pub cache: cache::CacheService,
    pub config: config::Config,
    pub reservations: ReservationEngine<PgStore>,
    pub screenings: ScreeningManager<PgStore>,
    pub ratings: RatingAggregator<PgStore>,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::connect(&config.database).await?;
        db.migrate().await?;

        let redis = redis_client::RedisClient::connect(&config.redis).await?;

        let cache = cache::CacheService::new(
            redis.clone(),
            config.redis.seats_ttl_seconds,
            config.rating.top_cache_ttl_seconds,
        );
        cache.reset().await;

        let store = Arc::new(PgStore::new(db.clone()));
        let state = Arc::new(Self {
            reservations: ReservationEngine::new(store.clone()),
            screenings: ScreeningManager::new(store.clone(), config.booking.slot_grid.clone()),
            ratings: RatingAggregator::new(store, config.rating.clone()),
            db,
            redis,
            cache,
            config,
        });

        info!(
            "Application state ready: {} screening slots, prior coefficient {}",
            state.config.booking.slot_grid.len(),
            state.config.rating.prior_coefficient
        );
        Ok(state)
    }
}
