use std::sync::Arc;
use tokio::sync::broadcast;
use slotbook_core::{IdentityProvider, PaymentGateway};
use slotbook_order::{
    BookingManager, BookingRepository, InMemoryStore, PaymentSettlement, SettlementPolicy, SlotRepository,
    VenueRepository,
};
use slotbook_store::app_config::BookingConfig;
use slotbook_store::RedisClient;
use crate::middleware::auth::JwtIdentityProvider;

const EVENT_BUFFER: usize = 100;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
    pub allow_dev_tokens: bool,
}

#[derive(Clone)]
pub struct AppState {
    pub manager: BookingManager,
    pub settlement: PaymentSettlement,
    pub identity: Arc<dyn IdentityProvider>,
    /// Rate limiting is off without redis
    pub redis: Option<Arc<RedisClient>>,
    pub auth: AuthConfig,
    pub booking: BookingConfig,
}

/// Storage handles for the three repositories
pub struct Repositories {
    pub venues: Arc<dyn VenueRepository>,
    pub slots: Arc<dyn SlotRepository>,
    pub bookings: Arc<dyn BookingRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self { venues: store.clone(), slots: store.clone(), bookings: store }
    }
}

impl AppState {
    pub fn new(
        repos: Repositories,
        gateway: Arc<dyn PaymentGateway>,
        policy: SettlementPolicy,
        auth: AuthConfig,
        booking: BookingConfig,
        redis: Option<Arc<RedisClient>>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let manager = BookingManager::new(repos.venues, repos.slots.clone(), repos.bookings.clone(), events.clone());
        let settlement = PaymentSettlement::new(repos.bookings, repos.slots, gateway, policy, events);
        let identity = Arc::new(JwtIdentityProvider::new(&auth.secret));

        Self { manager, settlement, identity, redis, auth, booking }
    }
}
