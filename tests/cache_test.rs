//! Reserved-seat cache against a real Redis.
//!
//! Docker must be running: the container is started with testcontainers.

use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::redis::{Redis, REDIS_PORT};

use cinema_booking::cache::CacheService;
use cinema_booking::config::RedisConfig;
use cinema_booking::models::ReservedSeat;
use cinema_booking::redis_client::RedisClient;

async fn setup_cache() -> (ContainerAsync<Redis>, CacheService) {
    let container = Redis::default()
        .start()
        .await
        .expect("Failed to start redis container");
    let port = container
        .get_host_port_ipv4(REDIS_PORT)
        .await
        .expect("Failed to get redis port");

    let config = RedisConfig {
        url: format!("redis://127.0.0.1:{port}"),
        seats_ttl_seconds: 60,
    };

    let mut retries = 0;
    loop {
        if let Ok(redis) = RedisClient::connect(&config).await {
            if redis.ping().await {
                return (container, CacheService::new(redis, config.seats_ttl_seconds, 60));
            }
        }
        assert!(retries < 30, "Failed to connect to redis after 30 retries");
        retries += 1;
        tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
    }
}

fn seat(screening_id: i64, hall_seat_id: i64) -> ReservedSeat {
    ReservedSeat {
        reservation_id: hall_seat_id,
        screening_id,
        hall_seat_id,
        row_number: 1,
        seat_number: hall_seat_id as i32,
        user_id: 1,
    }
}

#[tokio::test]
async fn cached_seats_are_served_until_invalidated() {
    let (_container, cache) = setup_cache().await;

    let generation = cache.reserved_seats_generation(3).await.expect("redis is up");
    assert_eq!(generation, 0);
    assert_eq!(cache.get_reserved_seats(3, generation).await, None);

    cache.save_reserved_seats(3, generation, &[seat(3, 1)]).await;
    assert_eq!(cache.get_reserved_seats(3, generation).await, Some(vec![seat(3, 1)]));

    cache.invalidate_reserved_seats(3).await;
    let next = cache.reserved_seats_generation(3).await.expect("redis is up");
    assert_eq!(next, 1);
    assert_eq!(cache.get_reserved_seats(3, next).await, None);
}

/// Читатель загрузил места до брони, а сохранил после её инвалидации
#[tokio::test]
async fn list_read_before_booking_is_not_served_after_it() {
    let (_container, cache) = setup_cache().await;

    let reader_generation = cache.reserved_seats_generation(5).await.expect("redis is up");
    let stale = vec![seat(5, 1)];

    // Бронь места 2 коммитится и сбрасывает кеш
    cache.invalidate_reserved_seats(5).await;

    cache.save_reserved_seats(5, reader_generation, &stale).await;

    let current = cache.reserved_seats_generation(5).await.expect("redis is up");
    assert_ne!(current, reader_generation);
    assert_eq!(cache.get_reserved_seats(5, current).await, None);
}

#[tokio::test]
async fn reset_drops_every_screening() {
    let (_container, cache) = setup_cache().await;

    for screening_id in [1, 2] {
        cache.save_reserved_seats(screening_id, 0, &[seat(screening_id, 4)]).await;
    }
    cache.invalidate_reserved_seats(2).await;

    cache.reset().await;

    assert_eq!(cache.reserved_seats_generation(2).await, Some(0));
    assert_eq!(cache.get_reserved_seats(1, 0).await, None);
    assert_eq!(cache.get_reserved_seats(2, 0).await, None);
}
