use chrono::NaiveTime;
use serde::Deserialize;
use std::env;

/// Коэффициент априорного веса: m = 0.55 × число пользователей
pub const DEFAULT_PRIOR_COEFFICIENT: f64 = 0.55;

/// Стандартная сетка сеансов на день
pub const DEFAULT_SLOT_GRID: &str = "11:00,14:00,17:00,20:00,23:00";

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub booking: BookingConfig,
    pub rating: RatingConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: String,
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub acquire_timeout_seconds: u64,
}

// Настройки Redis
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub seats_ttl_seconds: u64,
}

// Настройки сеансов
#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    pub slot_grid: Vec<NaiveTime>,
}

// Настройки рейтинга
#[derive(Debug, Clone, Deserialize)]
pub struct RatingConfig {
    pub prior_coefficient: f64,
    pub top_cache_ttl_seconds: u64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            slot_grid: parse_slot_grid(DEFAULT_SLOT_GRID).unwrap_or_default(),
        }
    }
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            prior_coefficient: DEFAULT_PRIOR_COEFFICIENT,
            top_cache_ttl_seconds: 300,
        }
    }
}

/// Разбирает список "HH:MM" через запятую, сохраняя порядок
pub fn parse_slot_grid(raw: &str) -> Result<Vec<NaiveTime>, chrono::ParseError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| NaiveTime::parse_from_str(s, "%H:%M"))
        .collect()
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .expect("PORT must be a valid number"),
                environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "cinema_booking=debug,tower_http=debug".to_string()),
                log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
                pool_size: env::var("DB_POOL_SIZE")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .expect("DB_POOL_SIZE must be a valid number"),
                acquire_timeout_seconds: env::var("DB_ACQUIRE_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .expect("DB_ACQUIRE_TIMEOUT_SECONDS must be a valid number"),
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").expect("REDIS_URL must be set"),
                seats_ttl_seconds: env::var("SEATS_CACHE_TTL_SECONDS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .expect("SEATS_CACHE_TTL_SECONDS must be a valid number"),
            },
            booking: BookingConfig {
                slot_grid: parse_slot_grid(
                    &env::var("SCREENING_SLOTS").unwrap_or_else(|_| DEFAULT_SLOT_GRID.to_string()),
                )
                .expect("SCREENING_SLOTS must be a comma separated list of HH:MM"),
            },
            rating: RatingConfig {
                prior_coefficient: env::var("RATING_PRIOR_COEFFICIENT")
                    .unwrap_or_else(|_| DEFAULT_PRIOR_COEFFICIENT.to_string())
                    .parse()
                    .expect("RATING_PRIOR_COEFFICIENT must be a valid number"),
                top_cache_ttl_seconds: env::var("TOP_MOVIES_CACHE_TTL_SECONDS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()
                    .expect("TOP_MOVIES_CACHE_TTL_SECONDS must be a valid number"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grid_has_five_slots_in_order() {
        let grid = BookingConfig::default().slot_grid;
        let rendered: Vec<String> = grid.iter().map(|t| t.format("%H:%M").to_string()).collect();
        assert_eq!(rendered, vec!["11:00", "14:00", "17:00", "20:00", "23:00"]);
    }

    #[test]
    fn slot_grid_rejects_garbage() {
        assert!(parse_slot_grid("11:00, noon").is_err());
    }
}
