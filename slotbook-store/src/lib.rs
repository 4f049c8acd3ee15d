pub mod app_config;
pub mod database;
pub mod redis_repo;
pub mod venue_repo;
pub mod slot_repo;
pub mod booking_repo;

pub use app_config::Config;
pub use database::DbClient;
pub use redis_repo::RedisClient;
pub use venue_repo::PgVenueRepository;
pub use slot_repo::PgSlotRepository;
pub use booking_repo::PgBookingRepository;
